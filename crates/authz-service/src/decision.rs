//! Authorization decisions and their wire form.

use crate::models::{
    AuthorizerResponse, PolicyDocument, PolicyStatement, EFFECT_ALLOW, POLICY_VERSION,
};
use crate::policy::ResourceScope;
use crate::principal::Principal;

/// Refresh/disconnect interval returned with every deny.
pub const DENY_TTL_SECONDS: u32 = 300;

/// How long the broker may keep a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    pub refresh_after_seconds: u32,
    pub disconnect_after_seconds: u32,
}

impl SessionTtl {
    pub const DENY: SessionTtl = SessionTtl {
        refresh_after_seconds: DENY_TTL_SECONDS,
        disconnect_after_seconds: DENY_TTL_SECONDS,
    };

    pub fn new(refresh_after_seconds: u32, disconnect_after_seconds: u32) -> Self {
        Self {
            refresh_after_seconds,
            disconnect_after_seconds,
        }
    }
}

/// Outcome of one authorization.
///
/// A deny carries no principal and no scope, whatever the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow {
        principal_id: String,
        scope: ResourceScope,
        ttl: SessionTtl,
    },
    Deny,
}

impl Decision {
    pub fn allow(principal: &Principal, scope: ResourceScope, ttl: SessionTtl) -> Self {
        Decision::Allow {
            principal_id: principal.principal_id(),
            scope,
            ttl,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn outcome(&self) -> &'static str {
        if self.is_allow() {
            "allow"
        } else {
            "deny"
        }
    }

    pub fn ttl(&self) -> SessionTtl {
        match self {
            Decision::Allow { ttl, .. } => *ttl,
            Decision::Deny => SessionTtl::DENY,
        }
    }
}

impl From<Decision> for AuthorizerResponse {
    fn from(decision: Decision) -> Self {
        let ttl = decision.ttl();
        match decision {
            Decision::Allow {
                principal_id,
                scope,
                ..
            } => AuthorizerResponse {
                is_authenticated: true,
                principal_id,
                policy_documents: vec![PolicyDocument {
                    version: POLICY_VERSION.to_string(),
                    statement: scope
                        .statements()
                        .iter()
                        .map(|s| PolicyStatement {
                            action: vec![s.action.as_str().to_string()],
                            effect: EFFECT_ALLOW.to_string(),
                            resource: s.resources.clone(),
                        })
                        .collect(),
                }],
                refresh_after_in_seconds: ttl.refresh_after_seconds,
                disconnect_after_in_seconds: ttl.disconnect_after_seconds,
            },
            Decision::Deny => AuthorizerResponse {
                is_authenticated: false,
                principal_id: String::new(),
                policy_documents: Vec::new(),
                refresh_after_in_seconds: ttl.refresh_after_seconds,
                disconnect_after_in_seconds: ttl.disconnect_after_seconds,
            },
        }
    }
}
