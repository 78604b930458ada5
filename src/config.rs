//! Configuration Module
//!
//! Handles loading the demo server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::middleware::{CacheOptions, StaticOptions, DEFAULT_MAX_AGE};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory static files are served from
    pub static_root: PathBuf,
    /// HTTP server port
    pub server_port: u16,
    /// Max-age advertised in `Cache-Control`, in seconds
    pub cache_max_age: u64,
    /// Whether directories without an index are listed
    pub list_dir: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STATIC_ROOT` - Directory to serve (default: public)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_AGE` - Cache lifetime in seconds (default: 604800)
    /// - `LIST_DIR` - Enable directory listings (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            static_root: env::var("STATIC_ROOT")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.static_root),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cache_max_age: env::var("CACHE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_age),
            list_dir: env::var("LIST_DIR")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.list_dir),
        }
    }

    /// Cache middleware options for this configuration.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new().max_age_secs(self.cache_max_age)
    }

    /// Static middleware options for this configuration.
    pub fn static_options(&self) -> StaticOptions {
        StaticOptions::new().list_dir(self.list_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("public"),
            server_port: 3000,
            cache_max_age: DEFAULT_MAX_AGE.as_secs(),
            list_dir: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
