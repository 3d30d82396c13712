//! Typed broker resource patterns.
//!
//! A pattern renders to a broker resource ARN:
//!
//! ```text
//! arn:aws:iot:{region}:{account}:{kind}/[$share/{group}/]{segment}/{segment}...
//! ```
//!
//! Literal segments are escaped with the broker's policy-variable syntax so a
//! caller-controlled identifier can never introduce a wildcard.

use crate::errors::AuthzError;
use std::fmt::Write;

/// Region and account a policy is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnContext {
    region: String,
    account: String,
}

impl ArnContext {
    pub fn new(region: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account: account.into(),
        }
    }

    /// Derive the context from the invoked function's ARN,
    /// `arn:{partition}:{service}:{region}:{account}:{resource...}`.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::NoRequestContext` if the ARN has fewer than five
    /// fields or an empty region or account.
    pub fn from_function_arn(arn: &str) -> Result<Self, AuthzError> {
        let mut fields = arn.split(':');
        if fields.next() != Some("arn") {
            return Err(AuthzError::NoRequestContext);
        }

        let region = fields.nth(2).filter(|r| !r.is_empty());
        let account = fields.next().filter(|a| !a.is_empty());

        match (region, account) {
            (Some(region), Some(account)) => Ok(Self::new(region, account)),
            _ => Err(AuthzError::NoRequestContext),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

/// Broker resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A client ID (connect).
    Client,
    /// A concrete topic (publish, receive).
    Topic,
    /// A topic filter (subscribe).
    TopicFilter,
}

impl ResourceKind {
    fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Client => "client",
            ResourceKind::Topic => "topic",
            ResourceKind::TopicFilter => "topicfilter",
        }
    }
}

/// One `/`-separated element of a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Fixed or identifier text, rendered escaped.
    Literal(String),
    /// MQTT single-level wildcard `+` as a literal topic-filter character.
    SingleLevel,
    /// Policy wildcard `*` matching any text.
    Any,
}

/// A resource pattern built from structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePattern {
    kind: ResourceKind,
    shared_group: Option<String>,
    segments: Vec<Segment>,
}

impl ResourcePattern {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            shared_group: None,
            segments: Vec::new(),
        }
    }

    /// Pattern for a client ID.
    pub fn client(client_id: &str) -> Self {
        Self::new(ResourceKind::Client).literal(client_id)
    }

    pub fn literal(mut self, text: &str) -> Self {
        self.segments.push(Segment::Literal(text.to_string()));
        self
    }

    pub fn single_level(mut self) -> Self {
        self.segments.push(Segment::SingleLevel);
        self
    }

    pub fn any(mut self) -> Self {
        self.segments.push(Segment::Any);
        self
    }

    /// Place the path under `$share/{group}/`.
    pub fn shared(mut self, group: &str) -> Self {
        self.shared_group = Some(group.to_string());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Render the ARN for a region and account.
    pub fn render(&self, context: &ArnContext) -> String {
        let mut arn = format!(
            "arn:aws:iot:{}:{}:{}/",
            context.region,
            context.account,
            self.kind.as_str()
        );

        if let Some(group) = &self.shared_group {
            let _ = write!(arn, "$share/{}/", escape(group));
        }

        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                arn.push('/');
            }
            match segment {
                Segment::Literal(text) => arn.push_str(&escape(text)),
                Segment::SingleLevel => arn.push('+'),
                Segment::Any => arn.push('*'),
            }
        }

        arn
    }
}

/// Escape policy metacharacters as `${*}`, `${?}` and `${$}`.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '$' => {
                escaped.push_str("${");
                escaped.push(c);
                escaped.push('}');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
