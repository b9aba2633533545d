//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the dispatch path.
//!
//! ## Environment Variables
//!
//! ### `OPSR_SLOW_ROUTE_US`
//!
//! Route resolution slower than this many microseconds is logged at `warn`
//! ("Slow route matching detected") instead of `debug`. Templated routes are
//! scanned in registration order, so a table with many templates under the
//! same method is what usually trips this.
//!
//! Default: `1000` (1 ms)
//!
//! ### `OPSR_REQUEST_ID_HEADER`
//!
//! Header that carries the request id. An incoming value that parses as a
//! ULID is reused, anything else is replaced by a fresh id. The id is echoed
//! back in the same header on the response.
//!
//! Default: `x-request-id`
//!
//! ## Usage
//!
//! ```rust
//! use opsrouter::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Slow route threshold: {:?}", config.slow_route_threshold);
//! ```

use std::env;
use std::time::Duration;

/// Default slow-route threshold in microseconds.
pub const DEFAULT_SLOW_ROUTE_US: u64 = 1_000;

/// Default request id header name.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`] and hand it to the
/// [`Dispatcher`](crate::dispatcher::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Resolution time above which a route match is logged as slow.
    pub slow_route_threshold: Duration,
    /// Lower-cased name of the request id header.
    pub request_id_header: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            slow_route_threshold: Duration::from_micros(DEFAULT_SLOW_ROUTE_US),
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let slow_route_us = env::var("OPSR_SLOW_ROUTE_US")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SLOW_ROUTE_US);

        let request_id_header = env::var("OPSR_REQUEST_ID_HEADER")
            .ok()
            .map(|val| val.trim().to_ascii_lowercase())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_REQUEST_ID_HEADER.to_string());

        RuntimeConfig {
            slow_route_threshold: Duration::from_micros(slow_route_us),
            request_id_header,
        }
    }
}
