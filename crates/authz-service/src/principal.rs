//! Principal resolution.
//!
//! Turns verified claims plus the client ID a connection asks for into the
//! identity the connection is granted. This is the authorization boundary: a
//! valid signature alone never permits a connection.

use crate::auth::claims::{Claims, TokenType};
use crate::errors::AuthzError;

/// Identity a connection is authorized as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A device; `id` is the token subject and the connection's client ID.
    Device { id: String },
    /// The scheduler service; `client_id` is the full requested client ID.
    Service { client_id: String },
}

impl Principal {
    /// Identifier the connection's policy is scoped to.
    pub fn identity(&self) -> &str {
        match self {
            Principal::Device { id } => id,
            Principal::Service { client_id } => client_id,
        }
    }

    /// Principal ID reported to the broker: the identity without hyphens.
    pub fn principal_id(&self) -> String {
        self.identity().replace('-', "")
    }

    /// Bounded label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Principal::Device { .. } => "device",
            Principal::Service { .. } => "service",
        }
    }
}

/// Maps verified claims to a [`Principal`].
#[derive(Debug, Clone)]
pub struct PrincipalResolver {
    /// The one application allowed to hold service-wide privileges.
    scheduler_app_id: String,
}

impl PrincipalResolver {
    pub fn new(scheduler_app_id: String) -> Self {
        Self { scheduler_app_id }
    }

    /// Resolve the principal for a connection.
    ///
    /// # Errors
    ///
    /// - `SubjectClientMismatch` - device token whose subject is not the
    ///   requested client ID
    /// - `UnauthorizedApp` - app token not issued to the scheduler
    /// - `ClientIdPrefixMismatch` - scheduler token with a client ID that does
    ///   not start with the app ID
    /// - `UnknownTokenType` - any other `typ`
    pub fn resolve(
        &self,
        claims: &Claims,
        requested_client_id: &str,
    ) -> Result<Principal, AuthzError> {
        match claims.token_type() {
            Some(TokenType::Device) => {
                // An empty subject must not match an absent client ID
                if claims.sub.is_empty() || claims.sub != requested_client_id {
                    tracing::warn!(
                        target: "authz.principal",
                        "Client ID does not match the device ID of the device token"
                    );
                    return Err(AuthzError::SubjectClientMismatch);
                }

                Ok(Principal::Device {
                    id: claims.sub.clone(),
                })
            }
            Some(TokenType::App) => {
                if claims.sub != self.scheduler_app_id {
                    tracing::warn!(
                        target: "authz.principal",
                        "App token was not issued to the scheduler"
                    );
                    return Err(AuthzError::UnauthorizedApp);
                }

                // Replicas append a suffix so each gets a unique client ID
                if !requested_client_id.starts_with(&claims.sub) {
                    tracing::warn!(
                        target: "authz.principal",
                        "Client ID does not start with the app ID of the app token"
                    );
                    return Err(AuthzError::ClientIdPrefixMismatch);
                }

                Ok(Principal::Service {
                    client_id: requested_client_id.to_string(),
                })
            }
            None => {
                tracing::warn!(
                    target: "authz.principal",
                    token_type = %claims.typ,
                    "Unknown token type"
                );
                Err(AuthzError::UnknownTokenType(claims.typ.clone()))
            }
        }
    }
}
