//! Service layer for the authorizer.
//!
//! # Components
//!
//! - `authorizer` - Connection authorization pipeline

pub mod authorizer;

pub use authorizer::AuthorizerService;
