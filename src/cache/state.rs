//! Per-request cache state.
//!
//! ```text
//! Fresh ──begin──▶ Attempted ──record_hit──▶ Hit
//!                      │
//!                      └──record_miss──▶ MissRecorded
//! ```
//!
//! A [`RequestCacheState`] is created by the cache middleware when a request
//! enters it and is owned by that request's future. It is dropped when the
//! future completes, is cancelled, or unwinds from a panicking handler, so
//! nothing carries over into the next request.

use std::time::Duration;

/// Where a request stands with respect to the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState {
    /// Caching has not been attempted.
    #[default]
    Fresh,
    /// A policy applied and the store is being consulted.
    Attempted,
    /// The response was served from the store.
    Hit,
    /// The store had nothing; the route runs and its output may be captured.
    MissRecorded,
}

impl CacheState {
    pub fn caching_attempted(self) -> bool {
        !matches!(self, Self::Fresh)
    }

    pub fn cache_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

#[derive(Debug, Default)]
pub struct RequestCacheState {
    state: CacheState,
    key: Option<String>,
    effective_expiry: Option<Duration>,
}

impl RequestCacheState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn caching_attempted(&self) -> bool {
        self.state.caching_attempted()
    }

    pub fn cache_hit(&self) -> bool {
        self.state.cache_hit()
    }

    /// The key resolved for this request, once caching was attempted.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn effective_expiry(&self) -> Option<Duration> {
        self.effective_expiry
    }

    pub(crate) fn begin(&mut self, key: String, expiry: Option<Duration>) {
        debug_assert_eq!(self.state, CacheState::Fresh);
        self.state = CacheState::Attempted;
        self.key = Some(key);
        self.effective_expiry = expiry;
    }

    pub(crate) fn record_hit(&mut self) {
        debug_assert_eq!(self.state, CacheState::Attempted);
        self.state = CacheState::Hit;
    }

    pub(crate) fn record_miss(&mut self) {
        debug_assert_eq!(self.state, CacheState::Attempted);
        self.state = CacheState::MissRecorded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fresh() {
        let state = RequestCacheState::new();
        assert_eq!(state.state(), CacheState::Fresh);
        assert!(!state.caching_attempted());
        assert!(!state.cache_hit());
        assert_eq!(state.key(), None);
    }

    #[test]
    fn hit_implies_attempted() {
        let mut state = RequestCacheState::new();
        state.begin("/a".into(), Some(Duration::from_secs(5)));
        assert!(state.caching_attempted());
        assert!(!state.cache_hit());

        state.record_hit();
        assert!(state.cache_hit());
        assert!(state.caching_attempted());
        assert_eq!(state.key(), Some("/a"));
        assert_eq!(state.effective_expiry(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn miss_keeps_attempt_without_hit() {
        let mut state = RequestCacheState::new();
        state.begin("/a".into(), None);
        state.record_miss();
        assert_eq!(state.state(), CacheState::MissRecorded);
        assert!(state.caching_attempted());
        assert!(!state.cache_hit());
    }
}
