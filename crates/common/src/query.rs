//! Strict `application/x-www-form-urlencoded` query parsing.
//!
//! Credentials arrive inside query-encoded strings (the HTTP query string and
//! the MQTT username), so a malformed encoding must be rejected instead of
//! being decoded lossily:
//! - `;` is not accepted as a pair separator
//! - `%` must be followed by two hex digits
//! - the decoded bytes must be valid UTF-8
//!
//! `+` decodes to a space and empty segments (`a=1&&b=2`) are skipped.

use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use thiserror::Error;

/// Errors produced while parsing a query string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A `;` appeared in a key or value.
    #[error("invalid semicolon separator in query")]
    SemicolonSeparator,

    /// A `%` escape was truncated or not hexadecimal.
    #[error("invalid percent escape: {0}")]
    InvalidEscape(String),

    /// Decoded text is not valid UTF-8.
    #[error("query component is not valid UTF-8")]
    InvalidUtf8,
}

/// Ordered key/value pairs parsed from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] encountered; nothing is returned for a
    /// partially valid string.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let mut pairs = Vec::new();

        for segment in raw.split('&') {
            if segment.is_empty() {
                continue;
            }
            if segment.contains(';') {
                return Err(QueryError::SemicolonSeparator);
            }

            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            pairs.push((unescape(key)?, unescape(value)?));
        }

        Ok(Self { pairs })
    }

    /// First value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of parsed pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pairs were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Reject a component whose `%` is not followed by two hex digits.
///
/// `percent_decode_str` passes such sequences through untouched.
fn check_escapes(component: &str) -> Result<(), QueryError> {
    let bytes = component.as_bytes();
    for (at, _) in component.match_indices('%') {
        let digits = bytes.get(at + 1..at + 3);
        if !digits.is_some_and(|d| d.iter().all(u8::is_ascii_hexdigit)) {
            return Err(QueryError::InvalidEscape(component.to_string()));
        }
    }
    Ok(())
}

fn unescape(component: &str) -> Result<String, QueryError> {
    check_escapes(component)?;

    // `+` first so that an escaped `%2B` survives as a literal plus
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| QueryError::InvalidUtf8)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_pairs() {
        let params = QueryParams::parse("device_token=abc.def.ghi&client_id=d1").unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("device_token"), Some("abc.def.ghi"));
        assert_eq!(params.get("client_id"), Some("d1"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_parse_decodes_percent_and_plus() {
        let params = QueryParams::parse("name=hello+world&path=%2Fv1%2F%40cloud").unwrap();

        assert_eq!(params.get("name"), Some("hello world"));
        assert_eq!(params.get("path"), Some("/v1/@cloud"));
    }

    #[test]
    fn test_parse_first_value_wins() {
        let params = QueryParams::parse("client_id=first&client_id=second").unwrap();
        assert_eq!(params.get("client_id"), Some("first"));
    }

    #[test]
    fn test_parse_key_without_value() {
        let params = QueryParams::parse("flag&device_token=").unwrap();

        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get("device_token"), Some(""));
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let params = QueryParams::parse("&a=1&&b=2&").unwrap();

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("b"), Some("2"));
    }

    #[test]
    fn test_parse_empty_string() {
        let params = QueryParams::parse("").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_value_keeps_extra_equals() {
        let params = QueryParams::parse("device_token=abc==").unwrap();
        assert_eq!(params.get("device_token"), Some("abc=="));
    }

    #[test]
    fn test_parse_rejects_semicolon() {
        assert_eq!(
            QueryParams::parse("a=1;b=2"),
            Err(QueryError::SemicolonSeparator)
        );
    }

    #[test]
    fn test_parse_rejects_bad_escape() {
        assert!(matches!(
            QueryParams::parse("a=%zz"),
            Err(QueryError::InvalidEscape(_))
        ));
        assert!(matches!(
            QueryParams::parse("a=%4"),
            Err(QueryError::InvalidEscape(_))
        ));
        assert!(matches!(
            QueryParams::parse("a=100%"),
            Err(QueryError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_parse_escaped_plus_is_literal() {
        let params = QueryParams::parse("device_token=a%2Bb+c&x=%25").unwrap();

        assert_eq!(params.get("device_token"), Some("a+b c"));
        assert_eq!(params.get("x"), Some("%"));
    }

    #[test]
    fn test_parse_rejects_escape_split_by_percent() {
        assert!(matches!(
            QueryParams::parse("a=%%41"),
            Err(QueryError::InvalidEscape(_))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_utf8() {
        assert_eq!(QueryParams::parse("a=%ff%fe"), Err(QueryError::InvalidUtf8));
    }
}
