//! Token authentication: signing keys, the key store, claims and validation.

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod signing_key;
