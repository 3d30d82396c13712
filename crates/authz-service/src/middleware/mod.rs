//! Middleware for the authorizer.
//!
//! # Components
//!
//! - `http_metrics` - Request/response metrics for every route

pub mod http_metrics;

pub use http_metrics::http_metrics_middleware;
