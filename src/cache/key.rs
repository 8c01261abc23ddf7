//! Cache key resolution.

use super::policy::{CacheKey, CachePolicy};
use crate::context::Context;

/// Resolve the key declared by `policy` for the request in `ctx`.
///
/// A deferred key is evaluated here, against this request. `None` means the
/// route declared no key (or has no policy at all) and the caller should fall
/// back to the request path; see [`effective_key`].
pub fn resolve_key(policy: Option<&CachePolicy>, ctx: &Context) -> Option<String> {
    match policy?.key()? {
        CacheKey::Deferred(compute) => Some(compute(ctx)),
        CacheKey::Static(name) => Some(name.clone()),
    }
}

/// The key a request is loaded from and captured under.
///
/// Call this once per request and reuse the result for both the load and the
/// store step, so a deferred key is evaluated only once.
pub fn effective_key(policy: Option<&CachePolicy>, ctx: &Context) -> String {
    resolve_key(policy, ctx).unwrap_or_else(|| ctx.request().path().to_owned())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::Request;
    use crate::context::Parameters;

    fn ctx(target: &str) -> Context {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        Context::new(Request::parse(raw.as_bytes()).unwrap())
    }

    fn ctx_with_id(target: &str, id: &str) -> Context {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let mut params = Parameters::new();
        params.insert("id", id);
        Context::with_params(Request::parse(raw.as_bytes()).unwrap(), params)
    }

    fn policy_with(key: CacheKey) -> CachePolicy {
        let mut policy = CachePolicy::default();
        policy.set_key(key, "/test").unwrap();
        policy
    }

    #[test]
    fn no_policy_resolves_to_nothing() {
        assert_eq!(resolve_key(None, &ctx("/a")), None);
        assert_eq!(effective_key(None, &ctx("/a?x=1")), "/a");
    }

    #[test]
    fn policy_without_key_falls_back_to_path() {
        let policy = CachePolicy::default();
        assert_eq!(resolve_key(Some(&policy), &ctx("/posts")), None);
        assert_eq!(effective_key(Some(&policy), &ctx("/posts")), "/posts");
    }

    #[test]
    fn static_key_ignores_request() {
        let policy = policy_with(CacheKey::Static("my_name".into()));
        for target in ["/a", "/b?page=3", "/"] {
            assert_eq!(effective_key(Some(&policy), &ctx(target)), "my_name");
        }
    }

    #[test]
    fn deferred_key_reads_request_parameters() {
        let policy = policy_with(CacheKey::Deferred(Arc::new(|ctx: &Context| {
            format!(
                "post:{}:{}",
                ctx.param("id").unwrap_or("-"),
                ctx.param("lang").unwrap_or("en")
            )
        })));

        let a = effective_key(Some(&policy), &ctx_with_id("/posts/7?lang=fr", "7"));
        let b = effective_key(Some(&policy), &ctx_with_id("/posts/7?lang=fr", "7"));
        assert_eq!(a, "post:7:fr");
        assert_eq!(a, b);

        let other = effective_key(Some(&policy), &ctx_with_id("/posts/8", "8"));
        assert_eq!(other, "post:8:en");
    }

    #[test]
    fn deferred_key_is_evaluated_once_per_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let policy = policy_with(CacheKey::Deferred(Arc::new(move |_ctx: &Context| {
            counter.fetch_add(1, Ordering::SeqCst);
            "k".to_owned()
        })));

        effective_key(Some(&policy), &ctx("/"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
