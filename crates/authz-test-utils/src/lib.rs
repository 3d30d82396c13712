//! # Authorizer Test Utilities
//!
//! Shared test utilities for the broker authorizer.
//!
//! This crate provides:
//! - Fixed RSA signing keys and JWKS documents (`TestSigningKey`, `jwks_document`)
//! - Token claim builders (`TokenClaims`)
//! - Trust-source mocks on `wiremock` (`jwks_mock`)
//! - Server test harness (`TestAuthzServer` for E2E tests)
//!
//! Helpers that unit tests inside `authz-service` use return plain values
//! (`String`, `serde_json::Value`) so they work on both sides of the
//! dev-dependency.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authz_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let key = TestSigningKey::primary("k1");
//!     let jwks = MockServer::start().await;
//!     jwks_mock(&[&key]).mount(&jwks).await;
//!
//!     let server = TestAuthzServer::spawn(&jwks_url(&jwks)).await?;
//!     let token = key.sign(&TokenClaims::device("d1").to_json());
//!     // POST an MQTT event carrying `token` to server.authorize_url()
//!     Ok(())
//! }
//! ```

pub mod jwks;
pub mod keys;
pub mod server_harness;
pub mod tokens;

// Re-export commonly used items
pub use jwks::*;
pub use keys::*;
pub use server_harness::*;
pub use tokens::*;
