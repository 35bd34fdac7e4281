mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use eyematch_core::config::{AppConfig, LoadOptions};
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;

fn init_logging(config: &AppConfig) {
    use eyematch_core::config::LogFormat::*;
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
    // Logging comes up before bootstrap so its events are captured
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let router = Router::new()
        .merge(health::router(app.db_pool.clone()))
        .merge(api::router(api::ApiState::new(&app.config, app.db_pool.clone())))
        .layer(TraceLayer::new_for_http());

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "eyematch-server listening"
    );

    let stop = Arc::new(Notify::new());
    let drain = stop.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move { drain.notified().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        signal = wait_for_shutdown() => {
            signal?;
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                grace_secs = app.config.server.graceful_shutdown_secs,
                "eyematch-server draining connections"
            );
            stop.notify_one();
            let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result?,
                Err(_) => tracing::warn!(
                    event_name = "system.server.shutdown_timeout",
                    correlation_id = "shutdown",
                    "in-flight requests did not finish within the grace period"
                ),
            }
        }
    }

    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "eyematch-server stopped"
    );
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
