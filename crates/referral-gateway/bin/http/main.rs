mod cli;

use crate::cli::{StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use referral_gateway::{App, AppState, AppStore, GatewaySettings};
use referral_generator::CandidateSettings;
use referral_service::{AccountSettings, IssuerSettings};
use referral_storage::{InMemoryStore, PgStore};
use referral_telemetry::TelemetryConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;

    let _telemetry = referral_telemetry::init(
        &TelemetryConfig::builder()
            .service_name("referral-gateway")
            .format(config.log_format.into())
            .otlp_endpoint(config.otlp_endpoint.clone())
            .build(),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        max_attempts = config.max_attempts,
        deadline_ms = config.deadline_ms,
        "starting referral gateway"
    );

    let store: Arc<dyn AppStore> = match config.storage {
        StorageBackendArg::InMemory => Arc::new(InMemoryStore::new()),
        StorageBackendArg::Postgres => {
            let dsn = config
                .postgres_dsn
                .as_deref()
                .context("postgres dsn is required when storage backend is postgres")?;
            let store = PgStore::connect(dsn, config.postgres_max_connections).await?;
            store.create_schema().await?;
            Arc::new(store)
        }
    };

    let settings = GatewaySettings::builder()
        .candidate(
            CandidateSettings::builder()
                .random_bytes(usize::try_from(config.random_bytes)?)
                .build(),
        )
        .issuer(
            IssuerSettings::builder()
                .max_attempts(config.max_attempts)
                .deadline(Duration::from_millis(config.deadline_ms))
                .store_backoff(Duration::from_millis(config.store_backoff_ms))
                .build(),
        )
        .accounts(
            AccountSettings::builder()
                .reward_points(config.reward_points)
                .build(),
        )
        .build();

    let router = App::router(AppState::new(store, settings))
        .layer(App::cors(&config.cors_origins).context("invalid CORS origin")?);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("referral gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
