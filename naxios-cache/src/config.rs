//! Cache backend configuration.

use std::time::Duration;

use naxios_core::DEFAULT_CACHE_EXPIRATION_SECS;

/// Configuration shared by every cache backend.
///
/// Fixed at construction; per-call expirations only affect their own entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Expiration applied when a write carries no override.
    pub default_expiration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiration: Duration::from_secs(DEFAULT_CACHE_EXPIRATION_SECS),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default expiration.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.default_expiration = expiration;
        self
    }

    /// Expiration for one write.
    pub fn expiration_for(&self, custom: Option<Duration>) -> Duration {
        custom.unwrap_or(self.default_expiration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_one_minute() {
        assert_eq!(CacheConfig::default().default_expiration, Duration::from_secs(60));
    }

    #[test]
    fn test_override_applies_only_when_given() {
        let config = CacheConfig::new().with_expiration(Duration::from_secs(5));
        assert_eq!(config.expiration_for(None), Duration::from_secs(5));
        assert_eq!(
            config.expiration_for(Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }
}
