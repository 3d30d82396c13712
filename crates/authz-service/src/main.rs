//! Broker Authorizer
//!
//! Custom authorizer for the message broker: validates device and service
//! tokens and answers each connection attempt with a scoped policy.

use authz_service::auth::jwks::{HttpTrustSource, KeyStore};
use authz_service::config::Config;
use authz_service::observability::metrics::init_metrics_recorder;
use authz_service::routes::{self, AppState};
use authz_service::services::AuthorizerService;
use common::config::ObservabilityConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded = Config::from_env();

    // A config error is still logged, with default log settings
    let observability: ObservabilityConfig = loaded
        .as_ref()
        .map(|config| config.observability.clone())
        .unwrap_or_default();
    init_tracing(&observability);

    info!("Starting Broker Authorizer");

    let config = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        jwks_url = %config.jwks_url,
        jwks_fetch_timeout_ms = config.jwks_fetch_timeout.as_millis() as u64,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let trust_source = HttpTrustSource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)
        .map_err(|e| {
            error!("Failed to build trust source client: {}", e);
            e
        })?;
    let key_store = Arc::new(KeyStore::new(Arc::new(trust_source)));

    // Keys are fetched on the first miss if this fails
    match key_store.refresh().await {
        Ok(count) => info!(key_count = count, "Signing keys loaded"),
        Err(e) => warn!(error = %e, "Initial key refresh failed, continuing without keys"),
    }

    let authorizer = Arc::new(AuthorizerService::new(&config, Arc::clone(&key_store)));

    let state = Arc::new(AppState {
        authorizer,
        key_store,
        metrics_handle: Some(metrics_handle),
    });

    let app = routes::build_routes(state);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Broker Authorizer listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Broker Authorizer shutdown complete");

    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&observability.log_filter)
        .unwrap_or_else(|_| common::config::DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
