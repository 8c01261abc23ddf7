//! Response caching — decides per request whether a stored response may be
//! served, under which key responses live, and how long they stay valid.
//!
//! The pieces, leaf first:
//!
//! - [`policy`] — declaration-time [`CachePolicy`] values, the scope-level
//!   [`PolicyRegistry`], and [`resolve_policy`], which folds the global
//!   switch, scope default and route declaration into one decision.
//! - [`key`] — resolves a route's static or deferred key, falling back to the
//!   request path.
//! - [`decision`] — the load step; a hit short-circuits with [`Flow::Respond`].
//! - [`capture`] — the store step after a miss; only text bodies are kept.
//! - [`state`] — the per-request [`RequestCacheState`] machine.
//! - [`store`] — the [`Store`] boundary and the in-process [`MemoryStore`].
//!
//! [`ResponseCache`] wires these into the middleware chain. Install it with
//! [`Router::with_cache`](crate::Router::with_cache) and declare caching on
//! routes through [`RouteBuilder`](crate::router::RouteBuilder).
//!
//! Cache failures never fail a request: a store that cannot be read is a
//! miss, and a store that cannot be written is skipped.

pub mod capture;
pub mod decision;
mod error;
pub mod key;
mod layer;
pub mod policy;
mod settings;
pub mod state;
pub mod store;

pub use decision::Flow;
pub use error::{ConfigError, StoreError};
pub use layer::{ResponseCache, RoutePolicy};
pub use policy::{
    CacheCondition, CacheKey, CacheOptions, CachePolicy, EffectivePolicy, KeyFn,
    PolicyRegistry, resolve_policy,
};
pub use settings::CacheSettings;
pub use state::{CacheState, RequestCacheState};
pub use store::{CacheEntry, MemoryStore, SetOptions, Store};
