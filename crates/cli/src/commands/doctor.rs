use serde::Serialize;

use leadly_core::config::{AppConfig, LoadOptions};
use leadly_db::connect_with_settings;

use super::CommandResult;

#[derive(Serialize)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

pub async fn run(json: bool) -> CommandResult {
    let checks = collect().await;
    let all_ok = checks.iter().all(|check| check.ok);

    let output = if json {
        serde_json::to_string_pretty(&checks).unwrap_or_else(|err| format!("{{\"error\": \"{err}\"}}"))
    } else {
        checks
            .iter()
            .map(|check| {
                format!("[{}] {}: {}", if check.ok { "ok" } else { "fail" }, check.name, check.detail)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    if all_ok {
        CommandResult::ok(output)
    } else {
        CommandResult::failed(output)
    }
}

async fn collect() -> Vec<Check> {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(Check { name: "config", ok: true, detail: "loaded and valid".to_string() });
            config
        }
        Err(error) => {
            checks.push(Check { name: "config", ok: false, detail: error.to_string() });
            return checks;
        }
    };

    checks.push(if config.llm.api_key.is_some() {
        Check { name: "llm", ok: true, detail: format!("model {} configured", config.llm.model) }
    } else {
        Check {
            name: "llm",
            ok: false,
            detail: "no api key set (LEADLY_LLM_API_KEY)".to_string(),
        }
    });

    match connect_with_settings(&config.database.url, 1, 5).await {
        Ok(pool) => match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => checks.push(Check {
                name: "database",
                ok: true,
                detail: format!("reachable at {}", config.database.url),
            }),
            Err(error) => {
                checks.push(Check { name: "database", ok: false, detail: error.to_string() })
            }
        },
        Err(error) => checks.push(Check { name: "database", ok: false, detail: error.to_string() }),
    }

    checks
}
