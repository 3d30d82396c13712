//! Authorizer wire models.
//!
//! The request mirrors the broker's custom-authorizer event; the response is
//! the policy answer the broker expects. Both use camelCase JSON, policy
//! documents use the IAM PascalCase layout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Transport name for HTTP connections.
pub const PROTOCOL_HTTP: &str = "http";

/// Transport name for MQTT connections.
pub const PROTOCOL_MQTT: &str = "mqtt";

/// IAM policy language version.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only effect the authorizer ever grants.
pub const EFFECT_ALLOW: &str = "Allow";

// ============================================================================
// Request
// ============================================================================

/// Connection attempt delivered by the broker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    /// Transports the client used (e.g. `["tls", "mqtt"]`).
    #[serde(default)]
    pub protocols: Vec<String>,

    #[serde(default)]
    pub protocol_data: Option<ProtocolData>,

    #[serde(default)]
    pub connection_metadata: Option<ConnectionMetadata>,

    /// Set when the broker verified a token signature itself; informational.
    #[serde(default)]
    pub signature_verified: bool,
}

impl AuthorizerRequest {
    /// True if the transport list names `protocol`.
    pub fn has_protocol(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }

    pub fn http(&self) -> Option<&HttpContext> {
        self.protocol_data.as_ref().and_then(|d| d.http.as_ref())
    }

    pub fn mqtt(&self) -> Option<&MqttContext> {
        self.protocol_data.as_ref().and_then(|d| d.mqtt.as_ref())
    }

    /// Broker connection ID, if present, for log correlation.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_metadata.as_ref().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolData {
    #[serde(default)]
    pub tls: Option<TlsContext>,

    #[serde(default)]
    pub http: Option<HttpContext>,

    #[serde(default)]
    pub mqtt: Option<MqttContext>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsContext {
    #[serde(default)]
    pub server_name: String,
}

/// HTTP request metadata. Header values are redacted in Debug output.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpContext {
    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub query_string: String,
}

impl HttpContext {
    /// Header value by case-insensitive name.
    ///
    /// An exact-case key wins. Among other case variants the lowest key in
    /// byte order is used, so the choice never depends on map iteration order.
    pub fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.headers.get(name) {
            return Some(value.as_str());
        }

        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("HttpContext")
            .field("headers", &names)
            .field("query_string", &self.query_string)
            .finish()
    }
}

/// MQTT CONNECT metadata. The username carries the token and is redacted.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttContext {
    #[serde(default)]
    pub username: String,

    /// Base64-encoded password; not used for authorization.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub client_id: String,
}

impl fmt::Debug for MqttContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttContext")
            .field("username", &"[REDACTED]")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    #[serde(default)]
    pub id: String,
}

// ============================================================================
// Response
// ============================================================================

/// Policy answer returned to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub is_authenticated: bool,

    /// Principal ID; empty on deny.
    pub principal_id: String,

    /// Policy documents; empty on deny.
    pub policy_documents: Vec<PolicyDocument>,

    pub refresh_after_in_seconds: u32,

    pub disconnect_after_in_seconds: u32,
}

/// IAM-style policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: Vec<String>,
    pub effect: String,
    pub resource: Vec<String>,
}

/// Health check response.
///
/// Returned by the `/v1/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status ("healthy").
    pub status: String,

    /// Whether a trust-source refresh has succeeded.
    pub keys_loaded: bool,

    /// Number of signing keys held.
    pub key_count: usize,
}
