//! Authorizer error types.
//!
//! Every variant is a reason to deny a connection. None of them ever reaches
//! the broker beyond the boolean outcome: the decision endpoint always answers
//! with a deny decision and the detail is logged server-side.

use thiserror::Error;

/// Reasons an authorization decision can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("No invocation context available")]
    NoRequestContext,

    #[error("No credential found in the request")]
    MissingCredential,

    #[error("Authorization header is not a bearer credential")]
    MalformedAuthorizationHeader,

    #[error("Malformed query string: {0}")]
    MalformedQueryString(String),

    #[error("Token header has no key identifier")]
    MissingKeyId,

    #[error("The access token is invalid or expired")]
    InvalidSignatureOrShape,

    #[error("Token header has no signing algorithm")]
    MissingAlgorithm,

    #[error("Token issuer is not trusted")]
    InvalidIssuer,

    #[error("Requested client ID does not match the token subject")]
    SubjectClientMismatch,

    #[error("Token subject is not an authorized application")]
    UnauthorizedApp,

    #[error("Requested client ID is not prefixed by the application ID")]
    ClientIdPrefixMismatch,

    #[error("Unknown token type: {0}")]
    UnknownTokenType(String),

    #[error("No signing key for key identifier {0}")]
    KeyNotFound(String),

    #[error("Trust source fetch failed: {0}")]
    KeyFetchFailure(String),

    #[error("Signing key {0} has an exponent that overflows the platform integer")]
    ExponentOverflow(String),

    #[error("Signing key {kid} is malformed: {reason}")]
    MalformedSigningKey { kid: String, reason: String },
}

impl AuthzError {
    /// Bounded label for logs and the `reason` metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthzError::NoRequestContext => "no_request_context",
            AuthzError::MissingCredential => "missing_credential",
            AuthzError::MalformedAuthorizationHeader => "malformed_authorization_header",
            AuthzError::MalformedQueryString(_) => "malformed_query_string",
            AuthzError::MissingKeyId => "missing_key_id",
            AuthzError::InvalidSignatureOrShape => "invalid_token",
            AuthzError::MissingAlgorithm => "missing_algorithm",
            AuthzError::InvalidIssuer => "invalid_issuer",
            AuthzError::SubjectClientMismatch => "subject_client_mismatch",
            AuthzError::UnauthorizedApp => "unauthorized_app",
            AuthzError::ClientIdPrefixMismatch => "client_id_prefix_mismatch",
            AuthzError::UnknownTokenType(_) => "unknown_token_type",
            AuthzError::KeyNotFound(_) => "key_not_found",
            AuthzError::KeyFetchFailure(_) => "key_fetch_failure",
            AuthzError::ExponentOverflow(_) => "exponent_overflow",
            AuthzError::MalformedSigningKey { .. } => "malformed_signing_key",
        }
    }

    /// True for failures resolving the signing key rather than judging the token.
    pub fn is_key_resolution(&self) -> bool {
        matches!(
            self,
            AuthzError::KeyNotFound(_)
                | AuthzError::KeyFetchFailure(_)
                | AuthzError::ExponentOverflow(_)
                | AuthzError::MalformedSigningKey { .. }
        )
    }
}
