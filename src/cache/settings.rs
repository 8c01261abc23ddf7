//! Global cache settings.
//!
//! `CacheSettings` derives `Deserialize` so applications can load it from
//! whatever configuration source they already use:
//!
//! ```
//! use routecache::cache::CacheSettings;
//!
//! let settings: CacheSettings =
//!     serde_json::from_str(r#"{ "enabled": false, "store_capacity": 64 }"#).unwrap();
//! assert!(!settings.enabled);
//! assert_eq!(settings.store_capacity, 64);
//! assert_eq!(settings.default_content_type, "text/plain; charset=utf-8");
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const DEFAULT_STORE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Global switch. When `false`, no request consults or writes the store,
    /// whatever its route declares.
    pub enabled: bool,
    /// Content type recorded for captured responses that did not set one.
    pub default_content_type: String,
    /// Maximum number of entries held by [`MemoryStore`](super::MemoryStore).
    pub store_capacity: usize,
    /// Retention applied by [`MemoryStore`](super::MemoryStore) to entries
    /// written without an expiry. `None` keeps them until evicted.
    pub store_default_expiry_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            store_capacity: DEFAULT_STORE_CAPACITY,
            store_default_expiry_secs: None,
        }
    }
}

impl CacheSettings {
    /// Default settings with the global switch turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns the store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn store_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.store_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn store_default_expiry(&self) -> Option<Duration> {
        self.store_default_expiry_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let settings = CacheSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.default_content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(settings.store_capacity, DEFAULT_STORE_CAPACITY);
        assert_eq!(settings.store_default_expiry(), None);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let settings = CacheSettings {
            store_capacity: 0,
            ..CacheSettings::default()
        };
        assert_eq!(settings.store_capacity_non_zero().get(), 1);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{ "store_default_expiry_secs": 30 }"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.store_default_expiry(), Some(Duration::from_secs(30)));
    }
}
