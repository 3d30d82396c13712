//! Common utilities and types shared across the broker authorizer crates.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (header inspection, size limits, iat checks)
pub mod jwt;

/// Module for strict query-string parsing
pub mod query;
