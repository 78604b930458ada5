//! Middleware Module
//!
//! Tower layers for client-side cache headers and static file serving.
//!
//! # Composition
//! ```ignore
//! let app = ServiceBuilder::new()
//!     .layer(cache(CacheOptions::default()))
//!     .layer(static_files("public", StaticOptions::default()))
//!     .service(router);
//! ```

mod cache;
mod http_date;
mod listing;
mod resolve;
mod static_files;


// Re-export public types
pub use cache::{cache, cache_control_value, Cache, CacheLayer, CacheOptions, DEFAULT_MAX_AGE};
pub use http_date::{format_http_date, format_system_time};
pub use listing::{render_listing, ListingEntry};
pub use resolve::{join_request_path, resolve, ResolvedFile};
pub use static_files::{
    not_found, serve, static_files, NotFoundService, Static, StaticLayer, StaticOptions,
    INDEX_FILE,
};
