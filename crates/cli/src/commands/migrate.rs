use anyhow::Result;

use leadly_core::config::{AppConfig, LoadOptions};
use leadly_db::{connect_with_settings, migrations};

use super::CommandResult;

pub async fn run() -> CommandResult {
    match apply().await {
        Ok(summary) => CommandResult::ok(summary),
        Err(error) => CommandResult::failed(format!("migration failed: {error}")),
    }
}

async fn apply() -> Result<String> {
    let config = AppConfig::load(LoadOptions::default())?;
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;
    migrations::run_pending(&pool).await?;
    Ok(format!("migrations applied to {}", config.database.url))
}
