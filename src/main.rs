use mpesa_relay::api::{self, AppState};
use mpesa_relay::config::RelayConfig;
use mpesa_relay::database;
use mpesa_relay::database::callback_repository::CallbackRepository;
use mpesa_relay::database::ledger_repository::LedgerRepository;
use mpesa_relay::database::repository::{
    CallbackStore, LedgerStore, NoopCallbackStore, NoopLedgerStore,
};
use mpesa_relay::health::HealthChecker;
use mpesa_relay::logging::init_tracing;
use mpesa_relay::middleware::logging::{request_logging_middleware, UuidRequestId};
use mpesa_relay::payments::factory::ProviderFactory;
use mpesa_relay::services::reconciliation::ReconciliationEngine;
use mpesa_relay::services::registry::Registry;
use mpesa_relay::services::status::StatusService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

/// Graceful shutdown signal handler. Pending timers and held connections
/// are abandoned on shutdown; callers time out client-side.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = RelayConfig::from_env();
    config.warn_missing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        stk_timeout_secs = config.stk_timeout.as_secs(),
        "Starting mpesa-relay service"
    );

    let db_pool = match config.database_url.as_deref() {
        Some(url) => {
            let pool = database::init_pool(url, None).await.map_err(|e| {
                error!("Failed to initialize database pool: {}", e);
                e
            })?;
            Some(pool)
        }
        None => {
            info!("Running without durable storage (DATABASE_URL not set)");
            None
        }
    };

    let (callbacks, ledger): (Arc<dyn CallbackStore>, Arc<dyn LedgerStore>) = match &db_pool {
        Some(pool) => (
            Arc::new(CallbackRepository::new(pool.clone())),
            Arc::new(LedgerRepository::new(pool.clone())),
        ),
        None => (Arc::new(NoopCallbackStore), Arc::new(NoopLedgerStore)),
    };

    let registry = Arc::new(Registry::new());
    let engine = Arc::new(ReconciliationEngine::new(
        registry.clone(),
        callbacks.clone(),
        ledger,
        config.stk_timeout,
    ));
    let status = Arc::new(StatusService::new(callbacks, registry.clone()));
    let factory = Arc::new(ProviderFactory::from_config(&config).map_err(|e| {
        error!("Failed to initialize payment providers: {}", e);
        anyhow::anyhow!(e.to_string())
    })?);
    let health = HealthChecker::new(db_pool, registry);

    let state = AppState {
        engine,
        status,
        factory,
        config: Arc::new(config.clone()),
        health,
    };

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
