//! Token claim builders.

use chrono::Utc;
use serde_json::{json, Map, Value};

/// Issuer the authorizer trusts by default.
pub const TEST_ISSUER: &str = "HP Device Token Service";

/// Application ID of the scheduler in the default configuration.
pub const SCHEDULER_APP_ID: &str = "bebc5cbf-acc0-431f-8c4e-c582dc2489e2";

/// Claims for a test token. Valid for one hour from now unless changed.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    sub: String,
    iss: String,
    typ: String,
    iat: i64,
    exp: i64,
    nbf: Option<i64>,
    aud: Option<Value>,
}

impl TokenClaims {
    fn new(sub: &str, typ: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: sub.to_string(),
            iss: TEST_ISSUER.to_string(),
            typ: typ.to_string(),
            iat: now,
            exp: now + 3600,
            nbf: None,
            aud: None,
        }
    }

    /// Device token for `sub`.
    pub fn device(sub: &str) -> Self {
        Self::new(sub, "device")
    }

    /// Application token for `sub`.
    pub fn app(sub: &str) -> Self {
        Self::new(sub, "app")
    }

    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    pub fn with_token_type(mut self, typ: &str) -> Self {
        self.typ = typ.to_string();
        self
    }

    pub fn with_audience(mut self, aud: Value) -> Self {
        self.aud = Some(aud);
        self
    }

    /// Issued two hours ago, expired one hour ago.
    pub fn expired(mut self) -> Self {
        let now = Utc::now().timestamp();
        self.iat = now - 7200;
        self.exp = now - 3600;
        self
    }

    /// Not valid for another hour.
    pub fn not_before_in_future(mut self) -> Self {
        self.nbf = Some(Utc::now().timestamp() + 3600);
        self
    }

    /// `iat` set `seconds` into the future.
    pub fn issued_in_future(mut self, seconds: i64) -> Self {
        self.iat = Utc::now().timestamp() + seconds;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("typ".to_string(), json!(self.typ));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("exp".to_string(), json!(self.exp));
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        if let Some(aud) = &self.aud {
            claims.insert("aud".to_string(), aud.clone());
        }
        Value::Object(claims)
    }
}
