//! Pre-verification token handling.
//!
//! Everything here runs before a signature check, so it only reads what is
//! needed to choose a key and never trusts it. A token over
//! [`MAX_JWT_SIZE_BYTES`] is refused without being split or decoded.
//!
//! ```rust,ignore
//! use common::jwt::{inspect_header, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let header = inspect_header(token)?;
//! let key = keys.get(header.kid.as_deref().ok_or(MyError::NoKid)?);
//! // ...verify the signature with `key`, then:
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a compact token's length.
///
/// Device tokens signed with RS256 sit around a kilobyte.
pub const MAX_JWT_SIZE_BYTES: usize = 8 * 1024;

/// How far in the future `iat` may be before a token is refused.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Largest skew an operator may configure.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(10 * 60);

/// Why a token was refused before or around verification.
///
/// Every variant renders the same text so callers cannot echo the cause to a
/// client by accident. Log the variant instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Not three segments, bad base64url, or a header that is not a JSON object.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

/// Header members read ahead of verification.
///
/// A member that is missing, empty, or not a string comes back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnverifiedHeader {
    pub kid: Option<String>,
    pub alg: Option<String>,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    kid: Value,
    #[serde(default)]
    alg: Value,
}

fn string_member(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Read `kid` and `alg` from a compact token's header.
///
/// The payload and signature segments are only counted, never decoded.
///
/// # Errors
///
/// `TokenTooLarge` for oversized input, otherwise `MalformedToken`.
pub fn inspect_header(token: &str) -> Result<UnverifiedHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            len = token.len(),
            limit = MAX_JWT_SIZE_BYTES,
            "Refusing oversized token"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let segments = token.split('.').count();
    let (Some(encoded_header), 3) = (token.split('.').next(), segments) else {
        tracing::debug!(target: "common.jwt", segments, "Token is not a compact JWS");
        return Err(JwtValidationError::MalformedToken);
    };

    let raw: RawHeader = URL_SAFE_NO_PAD
        .decode(encoded_header)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
        .map_err(|error| {
            tracing::debug!(target: "common.jwt", %error, "Unreadable token header");
            JwtValidationError::MalformedToken
        })?;

    Ok(UnverifiedHeader {
        kid: string_member(raw.kid),
        alg: string_member(raw.alg),
    })
}

/// Refuse an `iat` later than now plus `clock_skew`.
///
/// # Errors
///
/// `IatTooFarInFuture` when the claim is past the allowed window.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())
}

pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let latest = now.saturating_add(skew);

    if iat > latest {
        tracing::debug!(target: "common.jwt", iat, now, latest, "Token issued in the future");
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode a base64url JWK member, accepting trailing `=` padding.
///
/// Some issuers pad `n` and `e` even though JWK integers are unpadded. Only
/// trailing padding is dropped; `=` anywhere else still fails.
///
/// # Errors
///
/// The underlying `base64::DecodeError` for anything that is not base64url.
pub fn decode_base64url_trailing_padding(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn with_header(header: &str) -> String {
        format!("{}.e30.c2ln", URL_SAFE_NO_PAD.encode(header))
    }

    #[test]
    fn test_header_members_read() {
        let header =
            inspect_header(&with_header(r#"{"alg":"RS256","typ":"JWT","kid":"dsts-key-01"}"#))
                .unwrap();

        assert_eq!(header.kid.as_deref(), Some("dsts-key-01"));
        assert_eq!(header.alg.as_deref(), Some("RS256"));
    }

    #[test]
    fn test_unusable_members_become_none() {
        for raw in [
            r#"{"typ":"JWT"}"#,
            r#"{"kid":null,"alg":null}"#,
            r#"{"kid":"","alg":""}"#,
            r#"{"kid":12345,"alg":["RS256"]}"#,
        ] {
            let header = inspect_header(&with_header(raw)).unwrap();
            assert_eq!(header, UnverifiedHeader::default(), "header {raw}");
        }
    }

    #[test]
    fn test_malformed_tokens_refused() {
        let not_json = with_header("kid");
        for token in [
            "",
            "no-dots",
            "two.segments",
            "a.b.c.d",
            "!!!.e30.c2ln",
            not_json.as_str(),
        ] {
            assert_eq!(
                inspect_header(token),
                Err(JwtValidationError::MalformedToken),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let head = URL_SAFE_NO_PAD.encode(r#"{"kid":"edge"}"#);
        let filler = MAX_JWT_SIZE_BYTES - head.len() - 3;
        let token = format!("{head}.{}.x", "p".repeat(filler));
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        assert_eq!(inspect_header(&token).unwrap().kid.as_deref(), Some("edge"));

        let token = format!("{token}x");
        assert_eq!(
            inspect_header(&token),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_iat_window() {
        let now = 1_700_000_000_i64;

        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
        assert!(validate_iat_at(now + 301, Duration::ZERO, now + 301).is_ok());
    }

    #[test]
    fn test_iat_against_wall_clock() {
        let now = chrono::Utc::now().timestamp();

        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
        assert!(validate_iat(now + 86_400, DEFAULT_CLOCK_SKEW).is_err());
    }

    #[test]
    fn test_iat_near_i64_max() {
        assert!(validate_iat_at(i64::MAX, MAX_CLOCK_SKEW, i64::MAX - 1).is_ok());
    }

    #[test]
    fn test_padding_tolerated_only_at_end() {
        assert_eq!(
            decode_base64url_trailing_padding("AQAB").unwrap(),
            [0x01, 0x00, 0x01]
        );
        assert_eq!(decode_base64url_trailing_padding("AQA=").unwrap(), [0x01, 0x00]);
        assert_eq!(decode_base64url_trailing_padding("AQ==").unwrap(), [0x01]);

        assert!(decode_base64url_trailing_padding("AQ==AQAB").is_err());
        assert!(decode_base64url_trailing_padding("ab+/").is_err());
    }

    #[test]
    fn test_padded_modulus_matches_unpadded() {
        let bytes: Vec<u8> = (0u8..200).collect();
        let padded = base64::engine::general_purpose::URL_SAFE.encode(&bytes);
        assert!(padded.ends_with('='));

        assert_eq!(decode_base64url_trailing_padding(&padded).unwrap(), bytes);
    }
}
