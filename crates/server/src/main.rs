mod bootstrap;
mod command;
mod health;

use anyhow::Result;
use leadly_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use leadly_core::config::LogFormat::*;
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
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap(config).await?;
    let bind_address = app.config.server.bind_address.clone();

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %bind_address,
        "leadly-server listening"
    );

    axum::serve(listener, app.router).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!(event_name = "system.server.stopping", "leadly-server stopping");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
