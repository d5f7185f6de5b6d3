// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod error;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::alert_dispatcher::AlertDispatcher;
use crate::application::alert_service::AlertService;
use crate::application::evaluator::TemperaturePolicy;
use crate::application::measurement_service::MeasurementService;
use crate::application::monitor::PoolMonitor;
use crate::application::session_client::SessionClient;
use crate::domain::session::Credentials;
use crate::infrastructure::cloud_client::HttpPoolCloudApi;
use crate::infrastructure::config::{DEFAULT_CONFIG_PATH, load_config};
use crate::infrastructure::email_sender::EmailAlertSender;
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    current_measurements, health_check, latest_measurements, list_devices, measurement_history, monitor_status,
    pool_status, refresh_devices, select_device, send_test_alert, trigger_check,
};

#[derive(Parser)]
#[command(name = "pool-telemetry")]
#[command(about = "Pool controller telemetry and alerting service")]
#[command(version)]
struct Args {
    /// Path to configuration file (extension optional)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// HTTP port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config =
        load_config(&args.config).with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::debug!("Loaded configuration: {:?}", config);
    tracing::info!("Hue bridge configured at {}", config.hue.bridge_ip);

    // Infrastructure
    let cloud = Arc::new(HttpPoolCloudApi::new(
        config.cloud.base_url.clone(),
        config.cloud.auth_url.clone(),
        config.cloud.cloud_id.clone(),
    )?);
    let repository = Arc::new(InfluxRepository::new(
        config.influx.host.clone(),
        config.influx.token.clone(),
        config.influx.database.clone(),
        config.influx.retention_policy.clone(),
    ));
    let sender = Arc::new(EmailAlertSender::new(config.alerting.email.clone()));

    // Application
    let session = Arc::new(SessionClient::new(
        cloud,
        Credentials {
            email: config.cloud.email.clone(),
            password: config.cloud.password.clone(),
        },
    ));
    let dispatcher = Arc::new(AlertDispatcher::new(
        AlertService::new(sender),
        config.alerting.default_receivers.clone(),
    ));
    let measurement_service = MeasurementService::new(session.clone(), repository.clone());
    let monitor = Arc::new(
        PoolMonitor::new(
            session.clone(),
            dispatcher.clone(),
            TemperaturePolicy::new(config.pool.expected_temperature, config.pool.temperature_threshold),
            config.pool.check_interval,
        )
        .with_recorder(repository),
    );

    if !dispatcher.is_enabled() {
        tracing::info!("Email alerting disabled, alerts will only be logged");
    }

    session.spawn_initialization(config.pool.check_interval);
    {
        let session = session.clone();
        let monitor = monitor.clone();
        tokio::spawn(async move {
            session.wait_initialized().await;
            if let Err(e) = monitor.start().await {
                tracing::error!("Failed to start pool monitor: {}", e);
            }
        });
    }

    let state = Arc::new(AppState {
        session,
        monitor: monitor.clone(),
        measurement_service,
        dispatcher,
    });

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/measurements", get(current_measurements))
        .route("/api/measurements/latest", get(latest_measurements))
        .route("/api/measurements/history", get(measurement_history))
        .route("/api/pool/status", get(pool_status))
        .route("/api/pool/monitor", get(monitor_status))
        .route("/api/pool/check", post(trigger_check))
        .route("/api/alert/test", post(send_test_alert))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/refresh", post(refresh_devices))
        .route("/api/devices/:serial/select", post(select_device))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Starting pool-telemetry service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = monitor.stop().await {
        tracing::debug!("Monitor was not running at shutdown: {}", e);
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
