//! Signing-key store backed by a JWKS trust source.
//!
//! The store maps key identifiers to parsed [`SigningKey`]s. It is created
//! empty and repopulated wholesale from the trust source:
//!
//! - A refresh builds a complete new key map and swaps it in under a single
//!   write lock, so a lookup sees either the old set or the new one.
//! - Any malformed RSA entry aborts the refresh; the previous set stays live.
//! - Fetch failures (transport error, non-200, timeout) leave the previous
//!   set in place.
//! - Concurrent misses share one refresh: a caller that waited on the refresh
//!   lock skips its own fetch if the key set changed while it waited.

use crate::auth::signing_key::{JwkSet, SigningKey, RSA_KEY_TYPE};
use crate::errors::AuthzError;
use crate::observability::metrics::{record_jwks_refresh, record_key_lookup, set_jwks_keys};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// User-Agent sent on trust-source fetches.
pub const TRUST_SOURCE_USER_AGENT: &str = "broker-authorizer";

/// Source of the JWKS document.
#[async_trait]
pub trait TrustSource: Send + Sync {
    /// Fetch the current key set.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::KeyFetchFailure` on any transport, status or
    /// body-parsing failure.
    async fn fetch(&self) -> Result<JwkSet, AuthzError>;
}

/// Trust source fetched over HTTP with a bounded timeout.
pub struct HttpTrustSource {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client with the fetch timeout applied.
    http_client: reqwest::Client,
}

impl HttpTrustSource {
    /// Create a new HTTP trust source.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::KeyFetchFailure` if the HTTP client cannot be
    /// built. An unbounded client is never substituted.
    pub fn new(jwks_url: String, timeout: Duration) -> Result<Self, AuthzError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(TRUST_SOURCE_USER_AGENT)
            .build()
            .map_err(|e| {
                AuthzError::KeyFetchFailure(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            jwks_url,
            http_client,
        })
    }
}

#[async_trait]
impl TrustSource for HttpTrustSource {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<JwkSet, AuthzError> {
        tracing::debug!(target: "authz.keys", "Fetching JWKS from trust source");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timeout" } else { "transport" };
                tracing::error!(target: "authz.keys", error = %e, kind, "Failed to fetch JWKS");
                AuthzError::KeyFetchFailure(format!("{kind}: {e}"))
            })?;

        if response.status() != StatusCode::OK {
            tracing::error!(
                target: "authz.keys",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthzError::KeyFetchFailure(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            tracing::error!(target: "authz.keys", error = %e, "Failed to parse JWKS response");
            AuthzError::KeyFetchFailure(format!("invalid JWKS body: {e}"))
        })
    }
}

/// One generation of the key map.
struct KeySnapshot {
    generation: u64,
    keys: HashMap<String, SigningKey>,
}

/// Process-wide signing-key store.
pub struct KeyStore {
    source: Arc<dyn TrustSource>,

    /// Current key map; replaced, never mutated in place.
    snapshot: RwLock<Arc<KeySnapshot>>,

    /// Serializes refreshes.
    refresh_lock: Mutex<()>,
}

impl KeyStore {
    /// Create an empty store over the given trust source.
    pub fn new(source: Arc<dyn TrustSource>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(KeySnapshot {
                generation: 0,
                keys: HashMap::new(),
            })),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Resolve a key by identifier.
    ///
    /// On a miss, refreshes from the trust source once (or waits for an
    /// in-flight refresh) and looks again.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` - the identifier is absent even after the refresh
    /// - any refresh error (`KeyFetchFailure`, `ExponentOverflow`,
    ///   `MalformedSigningKey`)
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<SigningKey, AuthzError> {
        let observed = self.current().await;
        if let Some(key) = observed.keys.get(kid) {
            record_key_lookup("hit");
            return Ok(key.clone());
        }

        tracing::debug!(target: "authz.keys", kid = %kid, "Key not cached, refreshing");
        self.refresh_after(observed.generation).await?;

        if let Some(key) = self.current().await.keys.get(kid) {
            record_key_lookup("refreshed");
            return Ok(key.clone());
        }

        record_key_lookup("miss");
        tracing::warn!(target: "authz.keys", kid = %kid, "Key not found in JWKS after refresh");
        Err(AuthzError::KeyNotFound(kid.to_string()))
    }

    /// Fetch the trust source and replace the key set.
    ///
    /// Returns the number of keys now held.
    ///
    /// # Errors
    ///
    /// Returns the fetch or parse error; the previous key set is kept.
    pub async fn refresh(&self) -> Result<usize, AuthzError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Number of keys currently held.
    pub async fn key_count(&self) -> usize {
        self.current().await.keys.len()
    }

    /// True once at least one refresh has succeeded.
    pub async fn is_loaded(&self) -> bool {
        self.current().await.generation > 0
    }

    async fn current(&self) -> Arc<KeySnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Refresh unless a newer generation than `observed` already landed.
    async fn refresh_after(&self, observed: u64) -> Result<(), AuthzError> {
        let _guard = self.refresh_lock.lock().await;

        if self.current().await.generation != observed {
            tracing::debug!(target: "authz.keys", "Concurrent refresh already completed");
            return Ok(());
        }

        self.refresh_locked().await.map(|_| ())
    }

    async fn refresh_locked(&self) -> Result<usize, AuthzError> {
        let start = Instant::now();

        let result = match self.source.fetch().await {
            Ok(set) => parse_key_set(set),
            Err(e) => Err(e),
        };

        match result {
            Ok(keys) => {
                let count = keys.len();
                {
                    let mut snapshot = self.snapshot.write().await;
                    let generation = snapshot.generation.saturating_add(1);
                    *snapshot = Arc::new(KeySnapshot { generation, keys });
                }

                record_jwks_refresh("success", start.elapsed());
                set_jwks_keys(count);
                tracing::info!(target: "authz.keys", key_count = count, "JWKS refreshed");
                Ok(count)
            }
            Err(e) => {
                record_jwks_refresh("error", start.elapsed());
                tracing::warn!(
                    target: "authz.keys",
                    error = %e,
                    reason = e.reason(),
                    "JWKS refresh failed, keeping previous key set"
                );
                Err(e)
            }
        }
    }
}

/// Build the full key map. All-or-nothing: any bad RSA entry fails the set.
fn parse_key_set(set: JwkSet) -> Result<HashMap<String, SigningKey>, AuthzError> {
    let mut keys = HashMap::with_capacity(set.keys.len());

    for jwk in &set.keys {
        if jwk.kty != RSA_KEY_TYPE {
            tracing::debug!(target: "authz.keys", kty = %jwk.kty, "Skipping non-RSA key");
            continue;
        }

        let key = SigningKey::from_rsa_jwk(jwk)?;
        keys.insert(key.kid().to_string(), key);
    }

    Ok(keys)
}
