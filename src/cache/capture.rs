//! The store step: persist a freshly generated response.

use tracing::{debug, warn};

use super::state::{CacheState, RequestCacheState};
use super::store::{CacheEntry, SetOptions, Store};
use crate::Response;

/// Store `response` under the key the load step resolved.
///
/// Only runs for requests whose state is [`CacheState::MissRecorded`]; the
/// key and expiry come from `state`, so load and store can never disagree.
/// Responses without a text body are skipped silently. A store failure is
/// logged and dropped, never reported to the client.
///
/// Returns `true` if the entry was written.
pub async fn try_store(
    store: &dyn Store,
    state: &RequestCacheState,
    response: &Response,
    default_content_type: &str,
) -> bool {
    if state.state() != CacheState::MissRecorded {
        return false;
    }
    let Some(key) = state.key() else {
        return false;
    };
    let Some(body) = response.text() else {
        debug!(key, "response body is not text, not captured");
        return false;
    };

    let entry = CacheEntry {
        body: body.to_owned(),
        content_type: response
            .content_type_value()
            .unwrap_or(default_content_type)
            .to_owned(),
    };
    let options = SetOptions {
        expires: state.effective_expiry(),
    };

    match store.set(key, entry, options).await {
        Ok(()) => {
            debug!(key, expires = ?options.expires, "response captured");
            true
        }
        Err(e) => {
            warn!(key, error = %e, "failed to capture response");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::StatusCode;
    use crate::cache::StoreError;
    use crate::cache::store::MemoryStore;

    #[derive(Default)]
    struct Recording {
        writes: Mutex<Vec<(String, CacheEntry, SetOptions)>>,
    }

    #[async_trait]
    impl Store for Recording {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, StoreError> {
            Ok(None)
        }

        async fn set(
            &self,
            key: &str,
            entry: CacheEntry,
            options: SetOptions,
        ) -> Result<(), StoreError> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_owned(), entry, options));
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl Store for Rejecting {
        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, StoreError> {
            Ok(None)
        }

        async fn set(&self, key: &str, _: CacheEntry, _: SetOptions) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                key: key.to_owned(),
                reason: "full".into(),
            })
        }

        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn missed(key: &str, expiry: Option<Duration>) -> RequestCacheState {
        let mut state = RequestCacheState::new();
        state.begin(key.to_owned(), expiry);
        state.record_miss();
        state
    }

    #[tokio::test]
    async fn text_response_is_stored_with_expiry() {
        let store = Recording::default();
        let state = missed("/feed", Some(Duration::from_secs(5)));
        let response = Response::new(StatusCode::Ok)
            .content_type("application/xml")
            .body("<rss/>");

        assert!(try_store(&store, &state, &response, "text/plain").await);

        let writes = store.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (key, entry, options) = &writes[0];
        assert_eq!(key, "/feed");
        assert_eq!(entry.body, "<rss/>");
        assert_eq!(entry.content_type, "application/xml");
        assert_eq!(options.expires, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn missing_content_type_uses_default() {
        let store = Recording::default();
        let state = missed("/", None);
        let response = Response::new(StatusCode::Ok).body("plain");

        assert!(try_store(&store, &state, &response, "text/plain; charset=utf-8").await);
        let writes = store.writes.lock().unwrap();
        assert_eq!(writes[0].1.content_type, "text/plain; charset=utf-8");
        assert_eq!(writes[0].2.expires, None);
    }

    #[tokio::test]
    async fn binary_body_is_skipped() {
        let store = MemoryStore::new(NonZeroUsize::new(4).unwrap());
        let state = missed("/logo", None);
        let response = Response::new(StatusCode::Ok).body_bytes(vec![0x89, 0x50, 0x4e, 0x47]);

        assert!(!try_store(&store, &state, &response, "text/plain").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn nothing_is_stored_unless_a_miss_was_recorded() {
        let store = Recording::default();
        let response = Response::new(StatusCode::Ok).body("x");

        assert!(!try_store(&store, &RequestCacheState::new(), &response, "text/plain").await);

        let mut hit = RequestCacheState::new();
        hit.begin("/".into(), None);
        hit.record_hit();
        assert!(!try_store(&store, &hit, &response, "text/plain").await);

        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let state = missed("/", None);
        let response = Response::new(StatusCode::Ok).body("x");
        assert!(!try_store(&Rejecting, &state, &response, "text/plain").await);
    }
}
