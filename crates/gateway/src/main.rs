//! Gateway service entry point.
//!
//! Real-time notification delivery over WebSocket.

use amqp_client::AmqpClient;
use anyhow::{Context, Result};
use gateway::observability::{init_observability, install_metrics};
use gateway::{
    create_router, spawn_stale_sweeper, AppState, ConnectionRegistry, GatewayConfig,
    NotificationConsumer, ReconnectPolicy, Services, TokenVerifier,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const SERVICE_NAME: &str = "notification-gateway";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env()?;

    let telemetry = init_observability(SERVICE_NAME, config.mode, config.otlp_endpoint.as_deref());

    info!("Starting Gateway service");
    config.log_summary();

    install_metrics(config.metrics_port)?;

    // Backends and broker must be reachable at startup.
    let services = Services::connect(&config.services, &config.retry).await?;
    let amqp = AmqpClient::connect(&config.amqp_url)
        .await
        .context("AMQP broker unreachable at startup")?;

    let registry = Arc::new(ConnectionRegistry::new());
    let shutdown = CancellationToken::new();

    let consumer = Arc::new(NotificationConsumer::new(registry.clone(), config.consumer.clone()));
    let consumer_state = consumer.subscribe_state();
    let consumer_handle = tokio::spawn({
        let consumer = consumer.clone();
        let uri = config.amqp_url.clone();
        let shutdown = shutdown.clone();
        let reconnect = move || {
            let uri = uri.clone();
            async move { AmqpClient::connect(&uri).await }
        };
        async move {
            if let Err(e) = consumer
                .supervise(amqp, reconnect, ReconnectPolicy::default(), shutdown)
                .await
            {
                error!("Notification consumer stopped: {}", e);
            }
        }
    });

    let sweeper_handle = spawn_stale_sweeper(registry.clone(), config.idle_timeout, shutdown.clone());

    let state = Arc::new(AppState {
        registry: registry.clone(),
        consumer_state,
        verifier: TokenVerifier::new(&config.jwt_secret),
        services,
    });
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Gateway listening on {}", addr);

    // WebSocket handlers only end once their connections are told to close.
    let server_shutdown = {
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            registry.close_all();
            shutdown.cancel();
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(server_shutdown)
        .await?;

    info!("Shutting down consumer...");
    shutdown.cancel();
    let _ = consumer_handle.await;
    let _ = sweeper_handle.await;

    telemetry.shutdown();
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
