//! Signing keys parsed from trust-source JWK entries.
//!
//! RSA components are base64url-encoded big-endian unsigned integers
//! (RFC 7518 Section 6.3). Some issuers pad them with trailing `=`, which is
//! stripped before decoding.

use crate::errors::AuthzError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::jwt::decode_base64url_trailing_padding;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;

/// `kty` discriminator for RSA keys.
pub const RSA_KEY_TYPE: &str = "RSA";

/// Largest exponent accepted: the platform's signed integer maximum.
const MAX_EXPONENT: u64 = isize::MAX as u64;

/// JSON Web Key entry from the trust source.
///
/// Only the members the authorizer reads are modelled; others are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type discriminator ("RSA", "EC", "OKP", ...).
    #[serde(default)]
    pub kty: String,

    /// Key ID used to select the key for a token.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Signature algorithm family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
}

/// A verified-shape public signing key. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    kid: String,
    family: KeyFamily,
    /// Big-endian modulus with leading zero bytes removed.
    modulus: Vec<u8>,
    exponent: u64,
}

impl SigningKey {
    /// Parse an RSA JWK entry.
    ///
    /// # Errors
    ///
    /// - `MalformedSigningKey` - missing kid/n/e, bad base64url, or a zero value
    /// - `ExponentOverflow` - exponent larger than the platform integer maximum
    pub fn from_rsa_jwk(jwk: &Jwk) -> Result<Self, AuthzError> {
        let kid = jwk
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| malformed("<none>", "missing kid"))?;

        let n = jwk
            .n
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| malformed(kid, "missing modulus"))?;
        let e = jwk
            .e
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| malformed(kid, "missing exponent"))?;

        let exponent_bytes = decode_base64url_trailing_padding(e)
            .map_err(|err| malformed(kid, &format!("exponent is not base64url: {err}")))?;
        let modulus_bytes = decode_base64url_trailing_padding(n)
            .map_err(|err| malformed(kid, &format!("modulus is not base64url: {err}")))?;

        let exponent = decode_exponent(kid, &exponent_bytes)?;
        let modulus = strip_leading_zeros(&modulus_bytes).to_vec();
        if modulus.is_empty() {
            return Err(malformed(kid, "modulus is zero"));
        }

        Ok(Self {
            kid: kid.to_string(),
            family: KeyFamily::Rsa,
            modulus,
            exponent,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    /// Big-endian modulus bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Modulus re-encoded as unpadded base64url.
    pub fn modulus_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.modulus)
    }

    /// Exponent re-encoded as unpadded base64url of its minimal big-endian form.
    pub fn exponent_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.exponent_bytes())
    }

    /// Key material for signature verification.
    pub fn decoding_key(&self) -> DecodingKey {
        match self.family {
            KeyFamily::Rsa => {
                DecodingKey::from_rsa_raw_components(&self.modulus, &self.exponent_bytes())
            }
        }
    }

    fn exponent_bytes(&self) -> Vec<u8> {
        strip_leading_zeros(&self.exponent.to_be_bytes()).to_vec()
    }
}

/// Big-endian decode with checked accumulation: never wraps.
fn decode_exponent(kid: &str, bytes: &[u8]) -> Result<u64, AuthzError> {
    let mut value: u64 = 0;
    for byte in bytes {
        value = value
            .checked_mul(256)
            .and_then(|v| v.checked_add(u64::from(*byte)))
            .ok_or_else(|| AuthzError::ExponentOverflow(kid.to_string()))?;
    }

    if value > MAX_EXPONENT {
        return Err(AuthzError::ExponentOverflow(kid.to_string()));
    }
    if value == 0 {
        return Err(malformed(kid, "exponent is zero"));
    }

    Ok(value)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes.get(first..).unwrap_or_default()
}

fn malformed(kid: &str, reason: &str) -> AuthzError {
    AuthzError::MalformedSigningKey {
        kid: kid.to_string(),
        reason: reason.to_string(),
    }
}
