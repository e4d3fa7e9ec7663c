//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for an [`App`](crate::App).
//!
//! ## Environment Variables
//!
//! ### `CUPROUTE_PATH_PREFIX`
//!
//! Path prefix every route of the application is registered under, e.g. `/api`.
//! Must be empty or start with `/`, and can not be `/` itself.
//!
//! Default: empty
//!
//! ### `CUPROUTE_LOG_HTTP_ERRORS`
//!
//! When `true`, handled HTTP conditions (not found, bad request, redirects) are
//! logged at `info` instead of `debug`. Unclassified failures are always logged
//! at `error`.
//!
//! Default: `false`
//!
//! ## Usage
//!
//! ```rust
//! use cuproute::runtime_config::RuntimeConfig;
//! use cuproute::App;
//!
//! let config = RuntimeConfig::from_env();
//! let app = App::from_config(&config)?;
//! # let _ = app;
//! # Ok::<(), cuproute::RouteError>(())
//! ```

use std::env;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Prefix for every route of the application (default: empty)
    pub path_prefix: String,
    /// Log handled HTTP conditions at `info` (default: false)
    pub log_http_errors: bool,
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let path_prefix = env::var("CUPROUTE_PATH_PREFIX").unwrap_or_default();
        let log_http_errors = match env::var("CUPROUTE_LOG_HTTP_ERRORS") {
            Ok(val) => matches!(val.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
            Err(_) => false,
        };
        RuntimeConfig {
            path_prefix,
            log_http_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unprefixed_and_quiet() {
        let config = RuntimeConfig::default();
        assert!(config.path_prefix.is_empty());
        assert!(!config.log_http_errors);
    }
}
