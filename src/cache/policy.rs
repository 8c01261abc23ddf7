//! Declaration-time cache policies and their request-time resolution.
//!
//! Three layers decide whether a request is cached and for how long:
//!
//! 1. the global switch in [`CacheSettings`](super::CacheSettings),
//! 2. the scope default recorded by [`PolicyRegistry::set_default_expiry`],
//! 3. the route's own declaration.
//!
//! The route layer always wins over the scope default, whichever was written
//! first, because [`CachePolicy::expires_after`] reads the route's value
//! before falling back. [`resolve_policy`] folds the layers together for one
//! request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ConfigError;
use crate::Method;
use crate::context::Context;

/// A cache key computed from the request being served.
pub type KeyFn = Arc<dyn Fn(&Context) -> String + Send + Sync + 'static>;

/// How a route names its cache slot.
#[derive(Clone)]
pub enum CacheKey {
    /// A fixed name shared by every request to the route.
    Static(String),
    /// Evaluated once per request with that request's [`Context`].
    Deferred(KeyFn),
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(name) => f.debug_tuple("Static").field(name).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// The caching declaration attached to one route.
///
/// Built while the router is being assembled and read-only once requests are
/// served.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    enabled: bool,
    expires: Option<Duration>,
    scope_expiry: Option<Duration>,
    key: Option<CacheKey>,
}

impl CachePolicy {
    /// A disabled policy inheriting `scope_expiry` from its enclosing scope.
    pub fn inheriting(scope_expiry: Option<Duration>) -> Self {
        Self {
            scope_expiry,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The route's own expiry if it set one, otherwise the scope default.
    pub fn expires_after(&self) -> Option<Duration> {
        self.expires.or(self.scope_expiry)
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub fn set_expires(&mut self, expires: Duration) {
        self.expires = Some(expires);
    }

    /// Record the route's cache key.
    ///
    /// Replacing a key with another of the same kind is allowed; mixing a
    /// static and a deferred key on one route is not.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConflictingKeys`] when `key` and the existing key differ
    /// in kind.
    pub fn set_key(&mut self, key: CacheKey, route: &str) -> Result<(), ConfigError> {
        match (&self.key, &key) {
            (Some(CacheKey::Static(_)), CacheKey::Deferred(_))
            | (Some(CacheKey::Deferred(_)), CacheKey::Static(_)) => {
                Err(ConfigError::ConflictingKeys {
                    route: route.to_owned(),
                })
            }
            _ => {
                self.key = Some(key);
                Ok(())
            }
        }
    }

    // Fold a `cache(..)` declaration into the route's existing policy. The
    // key is left alone; an inline expiry is a route-level write.
    pub(crate) fn absorb(&mut self, declared: CachePolicy) {
        self.enabled = declared.enabled;
        if declared.expires.is_some() {
            self.expires = declared.expires;
        }
    }
}

/// Inline options for [`PolicyRegistry::declare_route`].
///
/// Caching is enabled only when every [`when`](Self::when) condition holds;
/// with no conditions it is enabled unconditionally.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    conditions: Vec<bool>,
    expires: Option<Duration>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn when(mut self, condition: bool) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn expires(mut self, expires: Duration) -> Self {
        self.expires = Some(expires);
        self
    }
}

/// What a route passed when declaring itself cacheable.
#[derive(Debug, Clone, Default)]
pub enum CacheCondition {
    /// Nothing: caching is not requested. Callers use this form to reach the
    /// store handle instead.
    #[default]
    Unspecified,
    Flag(bool),
    Options(CacheOptions),
}

impl From<()> for CacheCondition {
    fn from(_: ()) -> Self {
        Self::Unspecified
    }
}

impl From<bool> for CacheCondition {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<CacheOptions> for CacheCondition {
    fn from(options: CacheOptions) -> Self {
        Self::Options(options)
    }
}

/// Scope-level (controller) cache defaults.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    default_expiry: Option<Duration>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiry inherited by every route declared from now on.
    ///
    /// Routes that set their own expiry keep it.
    pub fn set_default_expiry(&mut self, expires: Duration) {
        self.default_expiry = Some(expires);
    }

    pub fn default_expiry(&self) -> Option<Duration> {
        self.default_expiry
    }

    /// A fresh, disabled policy carrying the current scope default.
    pub fn new_policy(&self) -> CachePolicy {
        CachePolicy::inheriting(self.default_expiry)
    }

    /// Turn a route's cache condition into a policy.
    ///
    /// Returns `None` for [`CacheCondition::Unspecified`]; otherwise a policy
    /// that is enabled iff the condition holds, with any inline expiry
    /// overriding the scope default.
    pub fn declare_route(&self, condition: CacheCondition) -> Option<CachePolicy> {
        let mut policy = self.new_policy();
        match condition {
            CacheCondition::Unspecified => return None,
            CacheCondition::Flag(flag) => policy.enabled = flag,
            CacheCondition::Options(options) => {
                policy.enabled = options.conditions.iter().all(|c| *c);
                policy.expires = options.expires;
            }
        }
        Some(policy)
    }
}

/// The policy governing one particular request.
#[derive(Debug, Clone, Copy)]
pub struct EffectivePolicy<'p> {
    pub expires: Option<Duration>,
    pub route: &'p CachePolicy,
}

/// Decide whether a request is cacheable and under which route policy.
///
/// Returns `None`, meaning the request is served as if caching were never
/// declared, when the global switch is off, the method is not `GET`/`HEAD`, the route
/// has no policy, or its policy is disabled.
pub fn resolve_policy<'p>(
    caching_enabled: bool,
    method: &Method,
    route: Option<&'p CachePolicy>,
) -> Option<EffectivePolicy<'p>> {
    if !caching_enabled || !method.is_cacheable() {
        return None;
    }
    let route = route.filter(|policy| policy.is_enabled())?;
    Some(EffectivePolicy {
        expires: route.expires_after(),
        route,
    })
}
