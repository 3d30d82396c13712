//! Test server harness for E2E testing
//!
//! Provides `TestAuthzServer` for spawning real authorizer instances in tests.

use authz_service::auth::jwks::{HttpTrustSource, KeyStore};
use authz_service::config::Config;
use authz_service::routes::{self, AppState};
use authz_service::services::AuthorizerService;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Invoked-function ARN tests send with each decision request.
pub const TEST_FUNCTION_ARN: &str =
    "arn:aws:lambda:us-west-2:11111122222:function:broker-authorizer";

/// Test harness for spawning the authorizer in E2E tests.
///
/// The key store starts empty; call `key_store().refresh()` to prime it.
///
/// # Example
/// ```rust,ignore
/// let server = TestAuthzServer::spawn(&jwks_url(&jwks)).await?;
/// let response = reqwest::Client::new()
///     .get(format!("{}/v1/health", server.url()))
///     .send()
///     .await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestAuthzServer {
    addr: SocketAddr,
    config: Config,
    key_store: Arc<KeyStore>,
    _handle: JoinHandle<()>,
}

impl TestAuthzServer {
    /// Spawn a server fetching keys from `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks_url, &[]).await
    }

    /// Spawn a server with extra configuration variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        jwks_url: &str,
        extra_vars: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        for (key, value) in extra_vars {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let trust_source = HttpTrustSource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create trust source: {}", e))?;
        let key_store = Arc::new(KeyStore::new(Arc::new(trust_source)));

        let state = Arc::new(AppState {
            authorizer: Arc::new(AuthorizerService::new(&config, Arc::clone(&key_store))),
            key_store: Arc::clone(&key_store),
            metrics_handle: None,
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            key_store,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the decision endpoint.
    pub fn authorize_url(&self) -> String {
        format!("{}/v1/authorize", self.url())
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The server's key store.
    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }
}

impl Drop for TestAuthzServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
