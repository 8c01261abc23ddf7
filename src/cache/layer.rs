//! [`ResponseCache`] — the cache as a middleware in the request pipeline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::capture::try_store;
use super::decision::{Flow, try_load};
use super::policy::{CachePolicy, resolve_policy};
use super::state::{CacheState, RequestCacheState};
use super::store::{CacheEntry, MemoryStore, SetOptions, Store};
use super::{CacheSettings, StoreError};
use crate::Response;
use crate::context::Context;
use crate::middleware::{Middleware, Next};

/// The cache policy of the route a request matched.
///
/// Placed into the request's extensions by the router before the middleware
/// chain runs.
#[derive(Debug, Clone)]
pub struct RoutePolicy(pub Arc<CachePolicy>);

/// Response caching middleware.
///
/// For each request it resolves the matched route's policy against the
/// global settings and the request method. Requests that qualify are looked
/// up in the store: a hit is answered directly, a miss runs the rest of the
/// chain and captures the response on the way out. All other requests pass
/// straight through.
///
/// Cheap to clone; clones share the store.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use routecache::{Response, Router, StatusCode};
/// use routecache::cache::{CacheOptions, CacheSettings, ResponseCache};
/// use routecache::context::Context;
///
/// let mut router = Router::new().with_cache(ResponseCache::in_memory(CacheSettings::default()));
/// router.set_default_expiry(Duration::from_secs(60));
/// router
///     .get("/news", |_ctx: Context| async { Response::new(StatusCode::Ok).body("today") })
///     .cache(CacheOptions::new().expires(Duration::from_secs(5)));
/// ```
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn Store>,
    settings: Arc<CacheSettings>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn Store>, settings: CacheSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }

    /// A cache backed by a [`MemoryStore`] sized from `settings`.
    pub fn in_memory(settings: CacheSettings) -> Self {
        let store = Arc::new(MemoryStore::from_settings(&settings));
        Self::new(store, settings)
    }

    /// The underlying store handle.
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Remove a stored entry, typically after the data behind it changed.
    ///
    /// # Errors
    ///
    /// Whatever the store reports; unlike the request path, invalidation does
    /// not hide store failures from its caller.
    pub async fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await?;
        debug!(key, "cache entry invalidated");
        Ok(())
    }

    /// Return the text stored under `key`, or compute, store and return it.
    ///
    /// With caching disabled `compute` always runs and nothing is stored.
    /// Store failures fall back to computing.
    pub async fn fetch_fragment<F, Fut>(
        &self,
        key: &str,
        expires: Option<Duration>,
        compute: F,
    ) -> String
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        if !self.settings.enabled {
            return compute().await;
        }

        match self.store.get(key).await {
            Ok(Some(entry)) => {
                debug!(key, "fragment hit");
                return entry.body;
            }
            Ok(None) => debug!(key, "fragment miss"),
            Err(e) => warn!(key, error = %e, "fragment lookup failed"),
        }

        let body = compute().await;
        let entry = CacheEntry {
            body: body.clone(),
            content_type: self.settings.default_content_type.clone(),
        };
        if let Err(e) = self.store.set(key, entry, SetOptions { expires }).await {
            warn!(key, error = %e, "failed to store fragment");
        }
        body
    }

    async fn serve(&self, mut ctx: Context, next: Next) -> Response {
        let route = ctx.extensions().get::<RoutePolicy>().map(|p| Arc::clone(&p.0));
        let Some(policy) = resolve_policy(
            self.settings.enabled,
            ctx.request().method(),
            route.as_deref(),
        ) else {
            ctx.extensions_mut().insert(CacheState::Fresh);
            return next.run(ctx).await;
        };

        let mut state = RequestCacheState::new();
        if let Flow::Respond(response) = try_load(&*self.store, &policy, &ctx, &mut state).await {
            return response;
        }

        ctx.extensions_mut().insert(state.state());
        let response = next.run(ctx).await;
        try_store(
            &*self.store,
            &state,
            &response,
            &self.settings.default_content_type,
        )
        .await;
        response
    }
}

impl Middleware for ResponseCache {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let cache = self.clone();
        Box::pin(async move { cache.serve(ctx, next).await })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cache(settings: CacheSettings) -> ResponseCache {
        ResponseCache::in_memory(settings)
    }

    #[tokio::test]
    async fn fragment_is_computed_once() {
        let cache = cache(CacheSettings::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let body = cache
                .fetch_fragment("sidebar", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "<nav/>".to_owned()
                })
                .await;
            assert_eq!(body, "<nav/>");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fragment_bypasses_store_when_disabled() {
        let cache = cache(CacheSettings::disabled());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .fetch_fragment("sidebar", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    String::new()
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.store().get("sidebar").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let cache = cache(CacheSettings::default());
        cache
            .fetch_fragment("k", None, || async { "old".to_owned() })
            .await;
        cache.invalidate("k").await.unwrap();
        let body = cache
            .fetch_fragment("k", None, || async { "new".to_owned() })
            .await;
        assert_eq!(body, "new");
    }
}
