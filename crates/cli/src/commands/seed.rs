use anyhow::Result;

use leadly_core::config::{AppConfig, LoadOptions};
use leadly_db::{connect_with_settings, fixtures, migrations};

use super::CommandResult;

pub async fn run() -> CommandResult {
    match seed().await {
        Ok(count) => CommandResult::ok(format!("seeded {count} demo leads")),
        Err(error) => CommandResult::failed(format!("seed failed: {error}")),
    }
}

async fn seed() -> Result<usize> {
    let config = AppConfig::load(LoadOptions::default())?;
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;
    migrations::run_pending(&pool).await?;
    Ok(fixtures::seed(&pool).await?)
}
