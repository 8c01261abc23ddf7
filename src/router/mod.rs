//! Request routing and cache declarations.
//!
//! [`Router`] dispatches requests by method and path to handler functions.
//! Three pattern styles are supported:
//!
//! | Pattern              | Example match              | Captured params                 |
//! |----------------------|----------------------------|---------------------------------|
//! | `/users`             | `/users`                   | *(none)*                        |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                     |
//! | `/files/*`           | `/files/docs/readme.txt`   | `wildcard → "/docs/readme.txt"` |
//!
//! Trailing slashes are normalized on both patterns and incoming paths.
//! Routes are matched in registration order; the first match wins.
//!
//! Every registration returns a [`RouteBuilder`] through which the route
//! declares its caching: whether it is cacheable, its expiry and its key.
//! The router itself is the declaration scope: [`Router::set_default_expiry`]
//! sets the expiry inherited by routes registered after it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    CacheCondition, CacheKey, CachePolicy, ConfigError, PolicyRegistry, ResponseCache,
    RoutePolicy, Store,
};
use crate::context::{Context, Parameters};
use crate::middleware::{Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler that turns a [`Context`] into a [`Response`].
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Implemented for every `Fn(Context) -> impl Future<Output = Response>` that
/// is `Send + Sync + 'static`.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Parameterized { segments: Vec<Segment> },
    // Any path starting with the prefix, e.g. `/files/*`.
    Wildcard(String),
}

fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

impl Pattern {
    // Classified in order: `/*` suffix → wildcard, any `:` → parameterized,
    // otherwise exact.
    fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if let Some(prefix) = pattern.strip_suffix("/*") {
            return Pattern::Wildcard(prefix.to_string());
        }

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_string()),
                    None => Segment::Static(s.to_string()),
                })
                .collect();
            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_string())
    }

    fn matches(&self, path: &str) -> Option<Parameters> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(Parameters::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = Parameters::new();
                for (segment, actual) in segments.iter().zip(path_segments) {
                    match segment {
                        Segment::Static(expected) if expected != actual => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => params.insert(name.as_str(), actual),
                    }
                }
                Some(params)
            }
            Pattern::Wildcard(prefix) => path.strip_prefix(prefix.as_str()).map(|suffix| {
                let mut params = Parameters::new();
                params.insert("wildcard", suffix);
                params
            }),
        }
    }
}

struct Route {
    method: Method,
    path: String,
    pattern: Pattern,
    handler: Handler,
    policy: Arc<CachePolicy>,
}

impl Route {
    fn matches(&self, method: &Method, path: &str) -> Option<Parameters> {
        if &self.method == method {
            self.pattern.matches(path)
        } else {
            None
        }
    }

    fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Cache declarations for a freshly registered route.
///
/// Declarations may come in any order; the route's own expiry always takes
/// precedence over the router's default. A route is only cached once
/// [`cache`](Self::cache) enables it. A rejected key declaration withdraws
/// the route from the router.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use routecache::{Response, Router, StatusCode};
/// use routecache::context::Context;
///
/// # fn main() -> Result<(), routecache::cache::ConfigError> {
/// let mut router = Router::new();
/// router
///     .get("/posts/:id", |_ctx: Context| async { Response::new(StatusCode::Ok).body("post") })
///     .cache(true)
///     .expires(Duration::from_secs(30))
///     .cache_key_with(|ctx| format!("post:{}", ctx.param("id").unwrap_or_default()))?;
/// # Ok(())
/// # }
/// ```
pub struct RouteBuilder<'r> {
    routes: &'r mut Vec<Route>,
    index: usize,
    registry: &'r PolicyRegistry,
}

impl RouteBuilder<'_> {
    /// Declare the route cacheable under `condition`.
    ///
    /// Accepts a `bool`, a [`CacheOptions`](crate::cache::CacheOptions) with
    /// an inline expiry and further conditions, or `()`, which requests
    /// nothing (use [`Router::cache_store`] to reach the store instead).
    pub fn cache(mut self, condition: impl Into<CacheCondition>) -> Self {
        if let Some(declared) = self.registry.declare_route(condition.into()) {
            self.policy_mut().absorb(declared);
        }
        self
    }

    /// Expire this route's entries after `expires`, overriding the default.
    pub fn expires(mut self, expires: Duration) -> Self {
        self.policy_mut().set_expires(expires);
        self
    }

    /// Store every request to this route under one fixed key.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConflictingKeys`] if the route already has a deferred
    /// key. The route is removed and never serves requests.
    pub fn cache_key(mut self, name: impl Into<String>) -> Result<Self, ConfigError> {
        self.set_key(CacheKey::Static(name.into()))?;
        Ok(self)
    }

    /// Compute the key from each request, once per request.
    ///
    /// `compute` must be deterministic in the request data it reads, or
    /// identical requests will never share an entry.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConflictingKeys`] if the route already has a static
    /// key. The route is removed and never serves requests.
    pub fn cache_key_with<F>(mut self, compute: F) -> Result<Self, ConfigError>
    where
        F: Fn(&Context) -> String + Send + Sync + 'static,
    {
        self.set_key(CacheKey::Deferred(Arc::new(compute)))?;
        Ok(self)
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.routes[self.index].policy
    }

    fn set_key(&mut self, key: CacheKey) -> Result<(), ConfigError> {
        let label = self.routes[self.index].label();
        let outcome = self.policy_mut().set_key(key, &label);
        if outcome.is_err() {
            self.routes.remove(self.index);
        }
        outcome
    }

    fn policy_mut(&mut self) -> &mut CachePolicy {
        Arc::make_mut(&mut self.routes[self.index].policy)
    }
}

/// HTTP request router with per-route cache declarations.
///
/// # Examples
///
/// ```rust,no_run
/// use routecache::{Response, Router, StatusCode};
/// use routecache::cache::{CacheSettings, ResponseCache};
/// use routecache::context::Context;
///
/// let mut router = Router::new().with_cache(ResponseCache::in_memory(CacheSettings::default()));
///
/// router.get("/ping", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// router
///     .get("/users/:id", |ctx: Context| async move {
///         let id = ctx.param("id").unwrap_or("unknown").to_owned();
///         Response::new(StatusCode::Ok).body(id)
///     })
///     .cache(true);
/// ```
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<MiddlewareHandler>,
    registry: PolicyRegistry,
    cache: Option<ResponseCache>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middlewares: Vec::new(),
            registry: PolicyRegistry::new(),
            cache: None,
        }
    }

    /// Install `cache` as the next middleware layer.
    ///
    /// Without it, cache declarations on routes are recorded but inert.
    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.middlewares
            .push(from_middleware(Arc::new(cache.clone())));
        self.cache = Some(cache);
        self
    }

    /// Append a middleware layer. Layers run in installation order.
    pub fn layer<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
    }

    /// The installed cache's store, for application-driven reads and
    /// invalidation.
    pub fn cache_store(&self) -> Option<Arc<dyn Store>> {
        self.cache.as_ref().map(ResponseCache::store)
    }

    /// Set the expiry inherited by routes registered after this call.
    pub fn set_default_expiry(&mut self, expires: Duration) {
        self.registry.set_default_expiry(expires);
    }

    pub fn get(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Get, path, handler)
    }

    pub fn head(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Head, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Post, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Put, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Delete, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Patch, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: impl IntoHandler) -> RouteBuilder<'_> {
        self.add_route(Method::Options, path, handler)
    }

    fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl IntoHandler,
    ) -> RouteBuilder<'_> {
        let handler: Handler = Arc::new(move |ctx: Context| handler.call(ctx));
        let index = self.routes.len();
        self.routes.push(Route {
            method,
            path: path.to_owned(),
            pattern: Pattern::parse(path),
            handler,
            policy: Arc::new(self.registry.new_policy()),
        });
        RouteBuilder {
            routes: &mut self.routes,
            index,
            registry: &self.registry,
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` through the middleware chain to the first matching
    /// route, or answer `404 Not Found`.
    ///
    /// The matched route's [`RoutePolicy`] is placed in the context's
    /// extensions before the chain runs.
    pub async fn route(&self, request: Request) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            route
                .matches(request.method(), request.path())
                .map(|params| (route, params))
        });
        let Some((route, params)) = matched else {
            return Response::new(StatusCode::NotFound);
        };

        let mut ctx = Context::with_params(request, params);
        ctx.extensions_mut()
            .insert(RoutePolicy(Arc::clone(&route.policy)));

        let handler = Arc::clone(&route.handler);
        let mut chain = self.middlewares.clone();
        chain.push(Arc::new(
            move |ctx: Context, _next: Next| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                handler(ctx)
            },
        ));
        Next::new(chain).run(ctx).await
    }
}
