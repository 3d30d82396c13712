//! Credential extraction from the broker's connection event.
//!
//! HTTP connections present `Authorization: Bearer <token>`, with the client
//! ID in the `client_id` query parameter. MQTT connections put a query string
//! in the username, with the token in `device_token`; the client ID is the
//! MQTT client ID. HTTP wins when both carry a token.

use crate::errors::AuthzError;
use crate::models::{AuthorizerRequest, HttpContext, MqttContext, PROTOCOL_HTTP, PROTOCOL_MQTT};
use common::query::QueryParams;
use common::secret::SecretString;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Case-sensitive scheme prefix of the Authorization header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Query parameter holding the token in an MQTT username.
pub const PARAM_DEVICE_TOKEN: &str = "device_token";

/// Query parameter holding the client ID on HTTP connections.
pub const PARAM_CLIENT_ID: &str = "client_id";

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    HttpAuthorization,
    MqttUsername,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::HttpAuthorization => "http_authorization",
            CredentialSource::MqttUsername => "mqtt_username",
        }
    }
}

/// Token and requested client ID for one connection.
#[derive(Debug)]
pub struct ConnectionCredentials {
    pub token: SecretString,
    /// Requested client ID; empty if the connection named none.
    pub client_id: String,
    pub source: CredentialSource,
}

/// Pull the bearer token and requested client ID out of a connection event.
///
/// # Errors
///
/// - `MalformedAuthorizationHeader` - Authorization header without the
///   `Bearer ` prefix; the token is never looked at
/// - `MalformedQueryString` - unparseable HTTP query string or MQTT username
/// - `MissingCredential` - empty MQTT username, or no token anywhere
pub fn extract_credentials(
    request: &AuthorizerRequest,
) -> Result<ConnectionCredentials, AuthzError> {
    if request.has_protocol(PROTOCOL_HTTP) {
        if let Some(http) = request.http() {
            if let Some(credentials) = from_http(http)? {
                return Ok(credentials);
            }
        }
    }

    if request.has_protocol(PROTOCOL_MQTT) {
        if let Some(mqtt) = request.mqtt() {
            if let Some(credentials) = from_mqtt(mqtt)? {
                return Ok(credentials);
            }
        }
    }

    tracing::warn!(
        target: "authz.request",
        "Access token was not specified in HTTP header or MQTT context"
    );
    Err(AuthzError::MissingCredential)
}

fn from_http(http: &HttpContext) -> Result<Option<ConnectionCredentials>, AuthzError> {
    let Some(header) = http.header(AUTHORIZATION_HEADER) else {
        return Ok(None);
    };

    let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        tracing::warn!(target: "authz.request", "No bearer token in Authorization header");
        AuthzError::MalformedAuthorizationHeader
    })?;

    let client_id = if http.query_string.is_empty() {
        String::new()
    } else {
        let params = QueryParams::parse(&http.query_string).map_err(|e| {
            tracing::warn!(target: "authz.request", error = %e, "Failed to parse HTTP query string");
            AuthzError::MalformedQueryString(e.to_string())
        })?;
        params.get(PARAM_CLIENT_ID).unwrap_or_default().to_string()
    };

    Ok(non_empty(token, client_id, CredentialSource::HttpAuthorization))
}

fn from_mqtt(mqtt: &MqttContext) -> Result<Option<ConnectionCredentials>, AuthzError> {
    if mqtt.username.is_empty() {
        tracing::warn!(target: "authz.request", "MQTT username was not specified");
        return Err(AuthzError::MissingCredential);
    }

    let params = QueryParams::parse(&mqtt.username).map_err(|e| {
        tracing::warn!(target: "authz.request", error = %e, "Failed to parse MQTT username");
        AuthzError::MalformedQueryString(e.to_string())
    })?;

    let token = params.get(PARAM_DEVICE_TOKEN).unwrap_or_default();

    Ok(non_empty(
        token,
        mqtt.client_id.clone(),
        CredentialSource::MqttUsername,
    ))
}

fn non_empty(
    token: &str,
    client_id: String,
    source: CredentialSource,
) -> Option<ConnectionCredentials> {
    if token.is_empty() {
        return None;
    }

    Some(ConnectionCredentials {
        token: SecretString::from(token),
        client_id,
        source,
    })
}
