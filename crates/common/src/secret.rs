//! Secret types for protecting sensitive values from accidental logging.
//!
//! Bearer tokens pass through several layers (request extraction, the
//! validator, error paths) and every one of them logs. Wrapping the token in
//! [`SecretString`] means a derived `Debug` on any carrier struct prints
//! `[REDACTED]` instead of the credential.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Credentials {
//!     client_id: String,
//!     token: SecretString,
//! }
//!
//! let creds = Credentials {
//!     client_id: "d1".to_string(),
//!     token: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! // Safe: token is redacted
//! println!("{:?}", creds);
//!
//! // Access must be explicit
//! let raw: &str = creds.token.expose_secret();
//! assert!(raw.starts_with("eyJ"));
//! ```

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretString};
