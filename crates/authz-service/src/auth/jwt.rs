//! Access-token validation.
//!
//! Tokens pass an ordered pipeline; each stage has its own rejection reason:
//!
//! 1. `KeyId` - the header must name a signing key (`MissingKeyId`)
//! 2. `Signature` - the key is resolved through the [`KeyStore`] and the RSA
//!    signature, `exp`, `nbf` and `iat` are checked (`InvalidSignatureOrShape`,
//!    or the key-resolution error)
//! 3. `Algorithm` - the header must declare an algorithm (`MissingAlgorithm`)
//! 4. `Issuer` - `iss` must start with the trusted issuer (`InvalidIssuer`)
//!
//! Oversized tokens are refused before the header is decoded. Only RSA
//! algorithms (RS and PS families) verify. `exp` is required and `nbf` is
//! honoured when present, both without leeway.

use crate::auth::claims::Claims;
use crate::auth::jwks::KeyStore;
use crate::auth::signing_key::SigningKey;
use crate::errors::AuthzError;
use common::jwt::{inspect_header, validate_iat, UnverifiedHeader};
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// RSA signature algorithms accepted for RSA keys.
const RSA_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Stage of the validation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    KeyId,
    Signature,
    Algorithm,
    Issuer,
}

impl ValidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStage::KeyId => "key_id",
            ValidationStage::Signature => "signature",
            ValidationStage::Algorithm => "algorithm",
            ValidationStage::Issuer => "issuer",
        }
    }
}

/// Validates bearer tokens against keys from the [`KeyStore`].
pub struct TokenValidator {
    key_store: Arc<KeyStore>,

    /// Required issuer prefix.
    issuer: String,

    /// Clock skew tolerance for iat validation.
    clock_skew: Duration,
}

impl TokenValidator {
    /// Create a new token validator.
    ///
    /// # Arguments
    ///
    /// * `key_store` - Store used to resolve signing keys
    /// * `issuer` - Trusted issuer prefix
    /// * `clock_skew` - Clock skew tolerance for iat validation
    pub fn new(key_store: Arc<KeyStore>, issuer: String, clock_skew: Duration) -> Self {
        Self {
            key_store,
            issuer,
            clock_skew,
        }
    }

    /// Validate a token and return its claims.
    ///
    /// No claim is returned unless every stage passes.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason of the first failing stage.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthzError> {
        // Size check and header decode; a token without a readable header is malformed
        let header = inspect_header(token).map_err(|e| {
            tracing::debug!(target: "authz.jwt", error = ?e, "Token header inspection failed");
            AuthzError::InvalidSignatureOrShape
        })?;

        let kid = check_key_id(&header).map_err(|e| rejected(ValidationStage::KeyId, e))?;

        let key = self
            .key_store
            .resolve(kid)
            .await
            .map_err(|e| rejected(ValidationStage::Signature, e))?;
        let claims = verify_signature(token, &key, self.clock_skew)
            .map_err(|e| rejected(ValidationStage::Signature, e))?;

        check_algorithm(&header).map_err(|e| rejected(ValidationStage::Algorithm, e))?;
        check_issuer(&claims, &self.issuer).map_err(|e| rejected(ValidationStage::Issuer, e))?;

        tracing::debug!(target: "authz.jwt", "Token validated successfully");
        Ok(claims)
    }
}

fn rejected(stage: ValidationStage, error: AuthzError) -> AuthzError {
    tracing::debug!(
        target: "authz.jwt",
        stage = stage.as_str(),
        reason = error.reason(),
        "Token rejected"
    );
    error
}

/// Stage 1: the header must carry a key identifier.
pub fn check_key_id(header: &UnverifiedHeader) -> Result<&str, AuthzError> {
    header.kid.as_deref().ok_or(AuthzError::MissingKeyId)
}

/// Stage 2: verify the RSA signature and the time claims.
pub fn verify_signature(
    token: &str,
    key: &SigningKey,
    clock_skew: Duration,
) -> Result<Claims, AuthzError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.algorithms = RSA_ALGORITHMS.to_vec();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;
    // Audience is not part of the authorization decision
    validation.validate_aud = false;

    let token_data = decode::<Claims>(token, &key.decoding_key(), &validation).map_err(|e| {
        tracing::debug!(target: "authz.jwt", kid = %key.kid(), error = %e, "Token verification failed");
        AuthzError::InvalidSignatureOrShape
    })?;

    if let Some(iat) = token_data.claims.iat {
        validate_iat(iat, clock_skew).map_err(|e| {
            tracing::debug!(target: "authz.jwt", error = ?e, "Token iat validation failed");
            AuthzError::InvalidSignatureOrShape
        })?;
    }

    Ok(token_data.claims)
}

/// Stage 3: the header must declare a signing algorithm.
pub fn check_algorithm(header: &UnverifiedHeader) -> Result<(), AuthzError> {
    match header.alg {
        Some(_) => Ok(()),
        None => Err(AuthzError::MissingAlgorithm),
    }
}

/// Stage 4: the issuer must start with the trusted issuer name.
pub fn check_issuer(claims: &Claims, issuer: &str) -> Result<(), AuthzError> {
    if claims.iss.starts_with(issuer) {
        Ok(())
    } else {
        Err(AuthzError::InvalidIssuer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::TrustSource;
    use crate::auth::signing_key::JwkSet;
    use async_trait::async_trait;
    use authz_test_utils::{jwks_document, token_with_raw_header, TestSigningKey, TokenClaims};
    use common::jwt::MAX_JWT_SIZE_BYTES;

    const ISSUER: &str = "HP Device Token Service";

    struct FixedSource(serde_json::Value);

    #[async_trait]
    impl TrustSource for FixedSource {
        async fn fetch(&self) -> Result<JwkSet, AuthzError> {
            Ok(serde_json::from_value(self.0.clone()).unwrap())
        }
    }

    fn validator_for(keys: &[&TestSigningKey]) -> TokenValidator {
        let store = KeyStore::new(Arc::new(FixedSource(jwks_document(keys))));
        TokenValidator::new(Arc::new(store), ISSUER.to_string(), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_valid_device_token() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign(&TokenClaims::device("d1").to_json());

        let claims = validator.validate(&token).await.unwrap();

        assert_eq!(claims.sub, "d1");
        assert_eq!(claims.typ, "device");
    }

    #[tokio::test]
    async fn test_key_from_padded_jwk_verifies() {
        let key = TestSigningKey::primary("k1");
        let store = KeyStore::new(Arc::new(FixedSource(serde_json::json!({
            "keys": [key.padded_jwk()]
        }))));
        let validator =
            TokenValidator::new(Arc::new(store), ISSUER.to_string(), Duration::from_secs(300));
        let token = key.sign(&TokenClaims::device("d1").to_json());

        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_pss_and_larger_digests_accepted() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);

        for alg in [Algorithm::RS384, Algorithm::RS512, Algorithm::PS256] {
            let token = key.sign_with(alg, &TokenClaims::device("d1").to_json());
            assert!(validator.validate(&token).await.is_ok(), "{alg:?}");
        }
    }

    #[tokio::test]
    async fn test_missing_kid_rejected_before_key_lookup() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign_without_kid(&TokenClaims::device("d1").to_json());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::MissingKeyId
        );
    }

    #[tokio::test]
    async fn test_signature_from_other_key_rejected() {
        let trusted = TestSigningKey::primary("k1");
        let attacker = TestSigningKey::secondary("k1");
        let validator = validator_for(&[&trusted]);
        let token = attacker.sign(&TokenClaims::device("d1").to_json());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_resolution_error() {
        let trusted = TestSigningKey::primary("k1");
        let other = TestSigningKey::secondary("k2");
        let validator = validator_for(&[&trusted]);
        let token = other.sign(&TokenClaims::device("d1").to_json());

        let err = validator.validate(&token).await.unwrap_err();
        assert_eq!(err, AuthzError::KeyNotFound("k2".to_string()));
        assert!(err.is_key_resolution());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign(&TokenClaims::device("d1").expired().to_json());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_token_without_exp_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let mut claims = TokenClaims::device("d1").to_json();
        claims.as_object_mut().unwrap().remove("exp");
        let token = key.sign(&claims);

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_not_yet_valid_token_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign(&TokenClaims::device("d1").not_before_in_future().to_json());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_future_iat_beyond_skew_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign(&TokenClaims::device("d1").issued_in_future(3600).to_json());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_future_iat_within_skew_accepted() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = key.sign(&TokenClaims::device("d1").issued_in_future(60).to_json());

        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_audience_does_not_affect_validation() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let claims = TokenClaims::device("d1")
            .with_audience(serde_json::json!(["broker"]))
            .to_json();

        assert!(validator.validate(&key.sign(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn test_issuer_prefix_match() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);

        let suffixed = TokenClaims::device("d1").with_issuer(&format!("{ISSUER} (prod)"));
        assert!(validator.validate(&key.sign(&suffixed.to_json())).await.is_ok());

        let foreign = TokenClaims::device("d1").with_issuer("Some Other Service");
        assert_eq!(
            validator
                .validate(&key.sign(&foreign.to_json()))
                .await
                .unwrap_err(),
            AuthzError::InvalidIssuer
        );

        let prefix_only = TokenClaims::device("d1").with_issuer("HP Device");
        assert_eq!(
            validator
                .validate(&key.sign(&prefix_only.to_json()))
                .await
                .unwrap_err(),
            AuthzError::InvalidIssuer
        );
    }

    #[tokio::test]
    async fn test_alg_none_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = token_with_raw_header(
            &serde_json::json!({"alg": "none", "kid": "k1", "typ": "JWT"}),
            &TokenClaims::device("d1").to_json(),
        );

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_hmac_algorithm_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = token_with_raw_header(
            &serde_json::json!({"alg": "HS256", "kid": "k1", "typ": "JWT"}),
            &TokenClaims::device("d1").to_json(),
        );

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_oversized_token_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthzError::InvalidSignatureOrShape
        );
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let key = TestSigningKey::primary("k1");
        let validator = validator_for(&[&key]);

        for token in ["", "not-a-jwt", "a.b", "!!!.payload.sig"] {
            assert_eq!(
                validator.validate(token).await.unwrap_err(),
                AuthzError::InvalidSignatureOrShape,
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_check_key_id_stage() {
        let header = UnverifiedHeader {
            kid: Some("k1".to_string()),
            alg: Some("RS256".to_string()),
        };
        assert_eq!(check_key_id(&header).unwrap(), "k1");
        assert_eq!(
            check_key_id(&UnverifiedHeader::default()),
            Err(AuthzError::MissingKeyId)
        );
    }

    #[test]
    fn test_check_algorithm_stage() {
        let with_alg = UnverifiedHeader {
            kid: Some("k1".to_string()),
            alg: Some("RS256".to_string()),
        };
        let without_alg = UnverifiedHeader {
            kid: Some("k1".to_string()),
            alg: None,
        };

        assert!(check_algorithm(&with_alg).is_ok());
        assert_eq!(
            check_algorithm(&without_alg),
            Err(AuthzError::MissingAlgorithm)
        );
    }

    #[test]
    fn test_check_issuer_stage() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "d1",
            "iss": "HP Device Token Service",
            "exp": 2_000_000_000,
            "typ": "device",
        }))
        .unwrap();

        assert!(check_issuer(&claims, ISSUER).is_ok());
        assert_eq!(
            check_issuer(&claims, "HP Device Token Service v2"),
            Err(AuthzError::InvalidIssuer)
        );
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(ValidationStage::KeyId.as_str(), "key_id");
        assert_eq!(ValidationStage::Signature.as_str(), "signature");
        assert_eq!(ValidationStage::Algorithm.as_str(), "algorithm");
        assert_eq!(ValidationStage::Issuer.as_str(), "issuer");
    }
}
