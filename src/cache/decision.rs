//! The load step: consult the store before the route runs.

use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::effective_key;
use super::policy::EffectivePolicy;
use super::state::RequestCacheState;
use super::store::{CacheEntry, Store};
use crate::context::Context;
use crate::{Response, StatusCode};

/// What the pipeline should do after the load step.
#[derive(Debug)]
pub enum Flow {
    /// Run the route as usual.
    Continue,
    /// Answer with this response and skip the route.
    Respond(Response),
}

/// Look the request up in the store.
///
/// Resolves the request's key (evaluating a deferred key exactly once),
/// records it in `state`, and queries `store`. A hit becomes
/// [`Flow::Respond`] with the replayed entry; a miss, or a store that fails
/// to answer, becomes [`Flow::Continue`].
///
/// Callers must only get here for requests [`resolve_policy`] accepted.
///
/// [`resolve_policy`]: super::resolve_policy
pub async fn try_load(
    store: &dyn Store,
    policy: &EffectivePolicy<'_>,
    ctx: &Context,
    state: &mut RequestCacheState,
) -> Flow {
    let key = effective_key(Some(policy.route), ctx);
    state.begin(key.clone(), policy.expires);
    let key = key.as_str();

    let started = Instant::now();
    let lookup = store.get(key).await;
    let elapsed = started.elapsed();

    match lookup {
        Ok(Some(entry)) => {
            debug!(key, ?elapsed, "cache hit");
            state.record_hit();
            Flow::Respond(replay(entry))
        }
        Ok(None) => {
            debug!(key, ?elapsed, "cache miss");
            state.record_miss();
            Flow::Continue
        }
        Err(e) => {
            warn!(key, ?elapsed, error = %e, "cache lookup failed, serving uncached");
            state.record_miss();
            Flow::Continue
        }
    }
}

/// Build the response for a cache hit.
///
/// Always `200 OK`, whatever status the captured response originally had.
pub fn replay(entry: CacheEntry) -> Response {
    Response::new(StatusCode::Ok)
        .content_type(entry.content_type)
        .body(entry.body)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::Request;
    use crate::cache::state::CacheState;
    use crate::cache::store::{MemoryStore, SetOptions};
    use crate::cache::{CacheKey, PolicyRegistry, StoreError, resolve_policy};
    use crate::http::Method;

    struct Unavailable;

    #[async_trait]
    impl Store for Unavailable {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn set(&self, _: &str, _: CacheEntry, _: SetOptions) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn ctx(target: &str) -> Context {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        Context::new(Request::parse(raw.as_bytes()).unwrap())
    }

    fn memory() -> MemoryStore {
        MemoryStore::new(NonZeroUsize::new(8).unwrap())
    }

    #[tokio::test]
    async fn miss_continues_and_records_path_key() {
        let store = memory();
        let route = PolicyRegistry::new().declare_route(true.into()).unwrap();
        let policy = resolve_policy(true, &Method::Get, Some(&route)).unwrap();
        let mut state = RequestCacheState::new();

        let flow = try_load(&store, &policy, &ctx("/news?page=1"), &mut state).await;

        assert!(matches!(flow, Flow::Continue));
        assert_eq!(state.state(), CacheState::MissRecorded);
        assert_eq!(state.key(), Some("/news"));
    }

    #[tokio::test]
    async fn hit_replays_as_200_with_stored_content_type() {
        let store = memory();
        store
            .set(
                "home",
                CacheEntry {
                    body: "<h1>hi</h1>".into(),
                    content_type: "text/html".into(),
                },
                SetOptions::default(),
            )
            .await
            .unwrap();

        let mut route = PolicyRegistry::new().declare_route(true.into()).unwrap();
        route.set_key(CacheKey::Static("home".into()), "/").unwrap();
        let policy = resolve_policy(true, &Method::Get, Some(&route)).unwrap();
        let mut state = RequestCacheState::new();

        let Flow::Respond(response) = try_load(&store, &policy, &ctx("/"), &mut state).await
        else {
            panic!("expected a cache hit");
        };

        assert!(state.cache_hit());
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.content_type_value(), Some("text/html"));
        assert_eq!(response.text(), Some("<h1>hi</h1>"));
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_miss() {
        let route = PolicyRegistry::new().declare_route(true.into()).unwrap();
        let policy = resolve_policy(true, &Method::Get, Some(&route)).unwrap();
        let mut state = RequestCacheState::new();

        let flow = try_load(&Unavailable, &policy, &ctx("/"), &mut state).await;

        assert!(matches!(flow, Flow::Continue));
        assert_eq!(state.state(), CacheState::MissRecorded);
    }
}
