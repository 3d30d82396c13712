//! Broker Authorizer Service Library
//!
//! Decides whether a device or the scheduler service may connect to the
//! message broker, and with which resource scope.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/authorizer.rs
//!                                      |-> request.rs     (credential extraction)
//!                                      |-> auth/*.rs      (key store, token validation)
//!                                      |-> principal.rs   (principal resolution)
//!                                      `-> policy/*.rs    (resource scope)
//! ```
//!
//! # Modules
//!
//! - `auth` - Signing keys, trust source and token validation
//! - `config` - Service configuration from environment
//! - `decision` - Allow/deny outcome and its broker response
//! - `errors` - Deny reasons
//! - `handlers` - HTTP request handlers
//! - `models` - Broker wire models
//! - `policy` - Typed resource patterns and per-principal scopes
//! - `principal` - Principal resolution
//! - `request` - Credential extraction
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod decision;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod principal;
pub mod request;
pub mod routes;
pub mod services;
