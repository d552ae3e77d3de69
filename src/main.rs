// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use virtual_node_agent::config::{self, NodeConfig};
use virtual_node_agent::metrics::MetricsRegistry;
use virtual_node_agent::ping::PingCoordinator;
use virtual_node_agent::provider::{HttpNodeProvider, NodeProvider, TcpNodeProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("virtual_node_agent=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    // Build the configured node provider
    let provider: Arc<dyn NodeProvider> = match &config.node {
        NodeConfig::Http { endpoint } => Arc::new(HttpNodeProvider::new(endpoint.clone())?),
        NodeConfig::Tcp { addr } => Arc::new(TcpNodeProvider::new(*addr)),
    };

    // Start the ping loop
    let coordinator = Arc::new(PingCoordinator::new(
        provider,
        config.ping.interval(),
        config.ping.timeout(),
        Some(metrics),
    ));
    let ping_loop = tokio::spawn(coordinator.clone().run());

    // Start the admin endpoint if enabled
    if config.admin.enabled {
        let admin_addr: SocketAddr = ([0, 0, 0, 0], config.admin.port).into();
        start_admin_server(admin_addr, metrics_registry, coordinator.clone());
    }

    shutdown_signal().await;
    coordinator.shutdown();
    let _ = ping_loop.await;

    Ok(())
}

/// Serve `/healthz` (latest ping outcome as JSON) and `/metrics` (Prometheus
/// text) on a background task.
fn start_admin_server(
    addr: SocketAddr,
    registry: MetricsRegistry,
    coordinator: Arc<PingCoordinator>,
) {
    let registry = Arc::new(registry);

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let coordinator = coordinator.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let coordinator = coordinator.clone();

                async move {
                    let response = match req.uri().path() {
                        "/metrics" => Response::builder()
                            .status(StatusCode::OK)
                            .header("Content-Type", "text/plain; version=0.0.4")
                            .body(Body::from(registry.gather())),
                        "/healthz" => {
                            let (status, body) = health_payload(&coordinator).await;
                            Response::builder()
                                .status(status)
                                .header("Content-Type", "application/json")
                                .body(Body::from(body))
                        }
                        _ => Response::builder()
                            .status(StatusCode::NOT_FOUND)
                            .body(Body::from("Not Found")),
                    };

                    Ok::<_, Infallible>(response.unwrap_or_else(|e| {
                        error!("Failed to build admin response: {}", e);
                        let mut fallback = Response::new(Body::from("Internal Error"));
                        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                        fallback
                    }))
                }
            }))
        }
    });

    let server = Server::bind(&addr).serve(make_service);
    info!("Admin endpoint listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Admin server error: {}", e);
        }
    });
}

async fn health_payload(coordinator: &PingCoordinator) -> (StatusCode, String) {
    // Report "initializing" instead of blocking while the first ping is
    // still in flight.
    if !coordinator.is_ready() {
        let body = serde_json::json!({ "status": "initializing" });
        return (StatusCode::SERVICE_UNAVAILABLE, body.to_string());
    }

    let result = coordinator.result().await;
    let healthy = result.is_healthy();
    let status_word = if healthy { "ok" } else { "failing" };
    let body = serde_json::json!({
        "status": status_word,
        "observed_at": result.observed_at,
        "error": result.error.as_ref().map(|e| e.to_string()),
    });
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, body.to_string())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
