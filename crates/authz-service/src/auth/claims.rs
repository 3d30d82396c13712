//! Token claims structure.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `typ` value for device access tokens.
pub const TOKEN_TYPE_DEVICE: &str = "device";

/// `typ` value for application access tokens.
pub const TOKEN_TYPE_APP: &str = "app";

/// Audience claim: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Kind of principal a token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Issued to an enrolled device; `sub` is the device ID.
    Device,
    /// Issued to a registered application; `sub` is the app ID.
    App,
}

impl TokenType {
    /// Map a `typ` claim value. Unknown values yield `None`.
    pub fn from_claim(value: &str) -> Option<Self> {
        match value {
            TOKEN_TYPE_DEVICE => Some(TokenType::Device),
            TOKEN_TYPE_APP => Some(TokenType::App),
            _ => None,
        }
    }
}

/// Claims of a verified access token.
///
/// Only produced by the token validator after signature verification.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: device ID or app ID. Redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Issuer.
    #[serde(default)]
    pub iss: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Raw token type (`typ`); see [`Claims::token_type`].
    #[serde(default)]
    pub typ: String,

    /// Tenant the device belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// Device management service responsible for the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("jti", &self.jti)
            .field("typ", &self.typ)
            .field("tid", &self.tid)
            .field("ms", &self.ms)
            .finish()
    }
}

impl Claims {
    /// Typed token type, or `None` for an unrecognised `typ`.
    pub fn token_type(&self) -> Option<TokenType> {
        TokenType::from_claim(&self.typ)
    }
}
