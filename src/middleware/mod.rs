//! Middleware pipeline — ordered layers around a route handler.
//!
//! Each middleware receives the request [`Context`] and a [`Next`] cursor.
//! It may pass the request on, answer it directly (as the response cache
//! does on a hit), or inspect the downstream response before returning it
//! (as the response cache does to capture a miss).
//!
//! The router builds one chain per request: the registered middleware in
//! installation order, followed by the matched route's handler.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{Response, StatusCode, context::Context};

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// Consumed by [`run`](Self::run), so each layer can forward at most once.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    // Position of the layer the next `run` call invokes.
    index: usize,
}

impl Next {
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next layer in the chain and returns its response.
    ///
    /// An exhausted chain answers `500 Internal Server Error`; the router
    /// always terminates its chains with the route handler, so this only
    /// happens for hand-built chains.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline"),
        }
    }
}

/// The core trait for all middleware.
///
/// Implementations must be `Send + Sync` because one instance serves every
/// request, and must return a `Send` future so it can be awaited on a
/// multi-threaded runtime.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}
