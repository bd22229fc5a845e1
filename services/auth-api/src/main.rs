//! Keygate Auth API binary

use std::net::SocketAddr;
use std::sync::Arc;

use auth_api::{build_router, AppState, Config, Lifecycle, Strategy};
use keygate_axum::{BearerTransport, Transport};
use keygate_db::{
    PgPrincipalRepository, PrincipalRepository, RedisPools, RedisRevocationStore, RevocationStore,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("auth_api=debug".parse()?)
                .add_directive("keygate_auth_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keygate Auth API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        environment = %config.environment,
        algorithm = ?config.auth.algorithm,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool = keygate_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");
    let principals: Arc<dyn PrincipalRepository> = Arc::new(PgPrincipalRepository::new(pool));

    // Connect the revocation store
    let pools = RedisPools::connect(&config.redis).await?;
    let store = Arc::new(RedisRevocationStore::new(pools));
    tracing::info!(databases = ?config.redis.databases, "Revocation store connected");

    let lifecycle = Lifecycle::new();
    lifecycle.register_revocation_store(Arc::clone(&store)).await;
    let failed = lifecycle.startup().await;
    if failed > 0 {
        tracing::warn!(failed, "Some startup hooks failed");
    }

    let revocations: Arc<dyn RevocationStore> = store;
    let strategy = Strategy::from_config(&config.auth, principals, revocations)?;
    let transport: Arc<dyn Transport> = Arc::new(BearerTransport::new(config.cookie_settings()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(strategy, transport, config);
    let app = build_router(state, metrics_handle);

    // Serve until a shutdown signal arrives, then release the stores
    let result = run_http_server(app, addr).await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "HTTP server error");
    }

    lifecycle.shutdown().await;
    tracing::info!("Shutdown complete");
    result
}

async fn run_http_server(app: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "keygate_tokens_issued_total",
        "Total tokens issued by kind"
    );
    metrics::describe_counter!(
        "keygate_token_reads_total",
        "Total token validations by kind and outcome"
    );
    metrics::describe_counter!(
        "keygate_revocations_total",
        "Total tokens revoked by kind"
    );
    metrics::describe_counter!(
        "keygate_signal_receiver_failures_total",
        "Total lifecycle hook failures"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
