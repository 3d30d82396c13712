//! Authorization decision service.
//!
//! Runs one connection attempt through the full pipeline:
//!
//! 1. Resolve the region and account from the invocation context
//! 2. Extract the bearer token and requested client ID
//! 3. Validate the token (signature, algorithm, issuer)
//! 4. Resolve the principal from claims and client ID
//! 5. Build the principal's resource scope
//!
//! Any failure yields a deny. Failures are logged with their cause on the
//! `authz.decision` target and never leak to the broker.

use crate::auth::jwks::KeyStore;
use crate::auth::jwt::TokenValidator;
use crate::config::Config;
use crate::decision::{Decision, SessionTtl};
use crate::errors::AuthzError;
use crate::models::{AuthorizerRequest, AuthorizerResponse};
use crate::observability::metrics::record_decision;
use crate::policy::{ArnContext, PolicyBuilder};
use crate::principal::PrincipalResolver;
use crate::request::extract_credentials;
use common::secret::ExposeSecret;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Decides whether a connection may proceed and with which scope.
pub struct AuthorizerService {
    validator: TokenValidator,
    resolver: PrincipalResolver,
    policy_builder: PolicyBuilder,
    allow_ttl: SessionTtl,
    /// Used when the request carries no invoked-function ARN.
    fallback_function_arn: Option<String>,
}

impl AuthorizerService {
    pub fn new(config: &Config, key_store: Arc<KeyStore>) -> Self {
        let clock_skew = Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs());

        Self {
            validator: TokenValidator::new(key_store, config.token_issuer.clone(), clock_skew),
            resolver: PrincipalResolver::new(config.scheduler_app_id.clone()),
            policy_builder: PolicyBuilder::new(config.shared_subscription_group.clone()),
            allow_ttl: SessionTtl::new(
                config.refresh_after_seconds,
                config.disconnect_after_seconds,
            ),
            fallback_function_arn: config.invoked_function_arn.clone(),
        }
    }

    /// Decide one connection attempt. Never fails: errors become a deny.
    #[instrument(
        skip_all,
        name = "authz.decision.authorize",
        fields(connection_id = request.connection_id().unwrap_or_default())
    )]
    pub async fn authorize(
        &self,
        request: &AuthorizerRequest,
        invoked_function_arn: Option<&str>,
    ) -> Decision {
        let start = Instant::now();

        match self.evaluate(request, invoked_function_arn).await {
            Ok(decision) => {
                record_decision(decision.outcome(), "none", start.elapsed());
                decision
            }
            Err(e) => {
                tracing::warn!(
                    target: "authz.decision",
                    reason = e.reason(),
                    error = %e,
                    "Connection denied"
                );
                record_decision("deny", e.reason(), start.elapsed());
                Decision::Deny
            }
        }
    }

    /// [`authorize`](Self::authorize) rendered as the broker response.
    pub async fn respond(
        &self,
        request: &AuthorizerRequest,
        invoked_function_arn: Option<&str>,
    ) -> AuthorizerResponse {
        self.authorize(request, invoked_function_arn).await.into()
    }

    async fn evaluate(
        &self,
        request: &AuthorizerRequest,
        invoked_function_arn: Option<&str>,
    ) -> Result<Decision, AuthzError> {
        let context = self.invocation_context(invoked_function_arn)?;
        let credentials = extract_credentials(request)?;
        let claims = self
            .validator
            .validate(credentials.token.expose_secret())
            .await?;
        let principal = self.resolver.resolve(&claims, &credentials.client_id)?;
        let scope = self.policy_builder.build(&principal, &context);

        tracing::info!(
            target: "authz.decision",
            principal_kind = principal.kind(),
            credential_source = credentials.source.as_str(),
            region = context.region(),
            "Connection allowed"
        );

        Ok(Decision::allow(&principal, scope, self.allow_ttl))
    }

    /// Region and account for the policy, from the request's invoked ARN or
    /// the configured fallback.
    pub fn invocation_context(
        &self,
        invoked_function_arn: Option<&str>,
    ) -> Result<ArnContext, AuthzError> {
        let arn = invoked_function_arn
            .filter(|arn| !arn.is_empty())
            .or(self.fallback_function_arn.as_deref())
            .ok_or(AuthzError::NoRequestContext)?;

        ArnContext::from_function_arn(arn)
    }
}
