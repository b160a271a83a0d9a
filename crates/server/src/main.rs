mod assistant;
mod bootstrap;
mod health;
mod home;
mod routes;
mod webhook;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use orderbot_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

fn init_logging(config: &AppConfig) {
    use orderbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let server = &app.config.server;
    let address = format!("{}:{}", server.bind_address, server.port);
    let grace_period = Duration::from_secs(server.graceful_shutdown_secs);
    let router = routes::router(app.state(), &server.static_dir);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "orderbot-server listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut serving = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .into_future(),
    );

    tokio::select! {
        finished = &mut serving => {
            finished??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_period_secs = grace_period.as_secs(),
        "draining in-flight requests"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(grace_period, &mut serving).await {
        Ok(finished) => finished??,
        Err(_) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                "grace period elapsed with requests still in flight"
            );
            serving.abort();
        }
    }

    if let Some(pool) = &app.db_pool {
        pool.close().await;
    }
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "orderbot-server stopped"
    );

    Ok(())
}
