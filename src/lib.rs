//! # routecache
//!
//! Per-route HTTP response caching: decide for each request whether a stored
//! response may be replayed, which key it lives under, and how long it stays
//! valid.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use routecache::{Request, Response, Router, StatusCode};
//! use routecache::cache::{CacheSettings, ResponseCache, Store};
//! use routecache::context::Context;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new().with_cache(ResponseCache::in_memory(CacheSettings::default()));
//!     router.set_default_expiry(Duration::from_secs(60));
//!     router
//!         .get("/articles/:id", |ctx: Context| async move {
//!             let id = ctx.param("id").unwrap_or_default().to_owned();
//!             Response::new(StatusCode::Ok).content_type("text/html").body(id)
//!         })
//!         .cache(true)
//!         .cache_key_with(|ctx| format!("article:{}", ctx.param("id").unwrap_or_default()))?;
//!
//!     let request = Request::parse(b"GET /articles/7 HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
//!     let first = router.route(request).await;
//!     assert_eq!(first.text(), Some("7"));
//!
//!     let stored = router.cache_store().unwrap().get("article:7").await?;
//!     assert_eq!(stored.unwrap().body, "7");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Body, Headers, Method, Request, Response, StatusCode};
pub use router::Router;
