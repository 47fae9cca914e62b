//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for entries written without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds, 0 disables the sweep
    pub cleanup_interval: u64,
    /// When false, reads always go to the data source and nothing is cached
    pub cache_enabled: bool,
    /// Collapse concurrent misses on the same key into one producer call
    pub collapse_concurrent: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60, 0 = off)
    /// - `CACHE_ENABLED` - Set to `false` to bypass the cache (default: true)
    /// - `COLLAPSE_CONCURRENT` - Set to `false` to let concurrent misses
    ///   each call the data source (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            cache_enabled: flag_var("CACHE_ENABLED"),
            collapse_concurrent: flag_var("COLLAPSE_CONCURRENT"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            server_port: 3000,
            cleanup_interval: 60,
            cache_enabled: true,
            collapse_concurrent: true,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

// Anything other than an explicit "false" keeps the feature on.
fn flag_var(name: &str) -> bool {
    env::var(name)
        .map(|v| !v.trim().eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.cache_enabled);
        assert!(config.collapse_concurrent);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("DEFAULT_TTL");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("CACHE_ENABLED");
        env::remove_var("COLLAPSE_CONCURRENT");

        let config = Config::from_env();
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.cache_enabled);
        assert!(config.collapse_concurrent);
    }

    #[test]
    fn test_flag_var_only_false_disables() {
        env::set_var("TALENT_CACHE_TEST_FLAG", "FALSE");
        assert!(!flag_var("TALENT_CACHE_TEST_FLAG"));

        env::set_var("TALENT_CACHE_TEST_FLAG", "0");
        assert!(flag_var("TALENT_CACHE_TEST_FLAG"));

        env::remove_var("TALENT_CACHE_TEST_FLAG");
        assert!(flag_var("TALENT_CACHE_TEST_FLAG"));
    }
}
