use thiserror::Error;

/// A route's cache declaration is contradictory.
///
/// Raised while routes are being declared, so a misconfigured router never
/// serves a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("route {route} declares both a static and a deferred cache key")]
    ConflictingKeys { route: String },
}

/// Failures reported by a [`Store`](super::Store) adapter.
///
/// The request path never surfaces these: a failed lookup is a miss and a
/// failed write is dropped after logging.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache store rejected entry for {key}: {reason}")]
    Rejected { key: String, reason: String },
}
