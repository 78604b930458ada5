//! Station - HTTP static file serving and caching middleware
//!
//! Provides tower layers that serve files from a directory before falling
//! through to a wrapped service, and that set client-side caching headers.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;

pub use config::Config;
pub use error::StationError;
pub use middleware::{
    cache, not_found, serve, static_files, Cache, CacheLayer, CacheOptions, Static, StaticLayer,
    StaticOptions, DEFAULT_MAX_AGE,
};
