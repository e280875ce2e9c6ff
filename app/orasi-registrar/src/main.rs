//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Orasi Registrar main binary

use orasi_registrar::{
    config::RegistrarConfig, error::RegistrarError, http::HttpServer, init_registrar,
    REGISTRAR_NAME, REGISTRAR_VERSION,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", REGISTRAR_NAME, REGISTRAR_VERSION);

    // Load configuration
    let config = load_config()?;
    info!("Configuration loaded successfully");

    let registrar = Arc::new(init_registrar(&config)?);

    let stop_handle = registrar
        .register(config.service.clone(), config.interval_secs)
        .await?;
    info!(
        "Registered {} at {}",
        config.service.name,
        config.service.register_path()
    );

    let app = HttpServer::new(registrar.clone()).create_router();
    let addr: std::net::SocketAddr = config.http_endpoint.parse()?;

    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!("HTTP server error: {}", e);
    }

    info!("Unregistering {}", config.service.register_path());
    stop_handle.shutdown().await?;

    info!("{} shutdown completed", REGISTRAR_NAME);
    Ok(())
}

/// Load configuration from environment or file
fn load_config() -> Result<RegistrarConfig, RegistrarError> {
    let config_path = std::env::var("ORASI_REGISTRAR_CONFIG_PATH")
        .unwrap_or_else(|_| "config/registrar.toml".to_string());

    let mut config = RegistrarConfig::from_file(&config_path)?;

    if let Ok(endpoints) = std::env::var("ORASI_REGISTRAR_ETCD_ENDPOINTS") {
        config.etcd_endpoints = endpoints
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Ok(name) = std::env::var("ORASI_REGISTRAR_SERVICE_NAME") {
        config.service.name = name;
    }
    if let Ok(addr) = std::env::var("ORASI_REGISTRAR_SERVICE_ADDR") {
        config.service.addr = addr;
    }
    if let Ok(weight) = std::env::var("ORASI_REGISTRAR_WEIGHT") {
        config.service.weight = weight.parse().map_err(|e| {
            RegistrarError::Configuration(format!("invalid ORASI_REGISTRAR_WEIGHT: {}", e))
        })?;
    }
    if let Ok(interval) = std::env::var("ORASI_REGISTRAR_INTERVAL_SECS") {
        config.interval_secs = interval.parse().map_err(|e| {
            RegistrarError::Configuration(format!("invalid ORASI_REGISTRAR_INTERVAL_SECS: {}", e))
        })?;
    }
    if let Ok(endpoint) = std::env::var("ORASI_REGISTRAR_HTTP_ENDPOINT") {
        config.http_endpoint = endpoint;
    }

    Ok(config)
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }

    info!("Shutdown signal received");
}
