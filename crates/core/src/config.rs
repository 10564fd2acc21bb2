//! Application configuration: defaults, optional TOML file, `LEADLY_*`
//! environment overrides, then validation. Secrets are wrapped so a debug
//! dump never leaks them.

use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub messaging: MessagingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
    /// Low fixed sampling temperature biases the translator toward
    /// determinism.
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MessagingConfig {
    pub sms_gateway_url: Option<String>,
    pub whatsapp_gateway_url: Option<String>,
    pub email_gateway_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://leadly.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                temperature: 0.1,
                timeout_secs: 60,
            },
            messaging: MessagingConfig::default(),
            server: ServerConfig { bind_address: "127.0.0.1:8080".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

/// Optional-field mirror of `AppConfig` for the TOML file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<FileDatabase>,
    llm: Option<FileLlm>,
    messaging: Option<FileMessaging>,
    server: Option<FileServer>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLlm {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileMessaging {
    sms_gateway_url: Option<String>,
    whatsapp_gateway_url: Option<String>,
    email_gateway_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServer {
    bind_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Defaults, then the file (if any), then environment, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .clone()
            .or_else(|| env::var("LEADLY_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("leadly.toml"));

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: FileConfig = toml::from_str(&raw)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_file(file);
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(database) = file.database {
            apply(&mut self.database.url, database.url);
            apply(&mut self.database.max_connections, database.max_connections);
            apply(&mut self.database.timeout_secs, database.timeout_secs);
        }
        if let Some(llm) = file.llm {
            apply(&mut self.llm.base_url, llm.base_url);
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(SecretString::from(api_key));
            }
            apply(&mut self.llm.model, llm.model);
            apply(&mut self.llm.temperature, llm.temperature);
            apply(&mut self.llm.timeout_secs, llm.timeout_secs);
        }
        if let Some(messaging) = file.messaging {
            if messaging.sms_gateway_url.is_some() {
                self.messaging.sms_gateway_url = messaging.sms_gateway_url;
            }
            if messaging.whatsapp_gateway_url.is_some() {
                self.messaging.whatsapp_gateway_url = messaging.whatsapp_gateway_url;
            }
            if messaging.email_gateway_url.is_some() {
                self.messaging.email_gateway_url = messaging.email_gateway_url;
            }
        }
        if let Some(server) = file.server {
            apply(&mut self.server.bind_address, server.bind_address);
        }
        if let Some(logging) = file.logging {
            apply(&mut self.logging.level, logging.level);
            apply(&mut self.logging.format, logging.format);
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = read_env("LEADLY_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(raw) = read_env("LEADLY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("LEADLY_DATABASE_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(base_url) = read_env("LEADLY_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = read_env("LEADLY_LLM_API_KEY") {
            self.llm.api_key = Some(SecretString::from(api_key));
        }
        if let Some(model) = read_env("LEADLY_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(raw) = read_env("LEADLY_LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LEADLY_LLM_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = read_env("LEADLY_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_env("LEADLY_LLM_TIMEOUT_SECS", &raw)?;
        }
        if let Some(url) = read_env("LEADLY_SMS_GATEWAY_URL") {
            self.messaging.sms_gateway_url = Some(url);
        }
        if let Some(url) = read_env("LEADLY_WHATSAPP_GATEWAY_URL") {
            self.messaging.whatsapp_gateway_url = Some(url);
        }
        if let Some(url) = read_env("LEADLY_EMAIL_GATEWAY_URL") {
            self.messaging.email_gateway_url = Some(url);
        }
        if let Some(bind_address) = read_env("LEADLY_BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }
        if let Some(level) = read_env("LEADLY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = read_env("LEADLY_LOG_FORMAT") {
            self.logging.format = match raw.to_ascii_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "LEADLY_LOG_FORMAT".to_string(),
                        value: raw,
                    })
                }
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_string(),
            ));
        }
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {LEVELS:?}, got `{}`",
                self.logging.level
            )));
        }
        Ok(())
    }
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, LoadOptions, LogFormat};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_load_without_a_file() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());
        clear_vars(&["LEADLY_DATABASE_URL", "LEADLY_LOG_LEVEL", "LEADLY_LOG_FORMAT"]);

        let config = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/leadly.toml".into()),
            require_file: false,
        })
        .expect("config load");

        assert_eq!(config.database.url, "sqlite://leadly.db");
        assert_eq!(config.llm.temperature, 0.1);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("leadly.toml");
        fs::write(
            &path,
            r#"
[database]
url = "sqlite://from-file.db"

[llm]
api_key = "sk-from-file"
model = "file-model"

[logging]
level = "warn"
"#,
        )
        .expect("write config");

        env::set_var("LEADLY_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("LEADLY_LLM_API_KEY", "sk-from-env");

        let config = AppConfig::load(LoadOptions { config_path: Some(path), require_file: true })
            .expect("config load");

        clear_vars(&["LEADLY_DATABASE_URL", "LEADLY_LLM_API_KEY"]);

        assert_eq!(config.database.url, "sqlite://from-env.db");
        assert_eq!(config.llm.model, "file-model");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-from-env".to_string())
        );
    }

    #[test]
    fn validation_rejects_out_of_range_temperature() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());

        env::set_var("LEADLY_LLM_TEMPERATURE", "3.5");
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/leadly.toml".into()),
            require_file: false,
        });
        clear_vars(&["LEADLY_LLM_TEMPERATURE"]);

        assert!(matches!(
            result,
            Err(ConfigError::Validation(ref message)) if message.contains("llm.temperature")
        ));
    }

    #[test]
    fn secret_values_do_not_leak_through_debug() {
        let _guard = env_lock().lock().unwrap_or_else(|p| p.into_inner());

        env::set_var("LEADLY_LLM_API_KEY", "sk-secret-value");
        let config = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/leadly.toml".into()),
            require_file: false,
        })
        .expect("config load");
        clear_vars(&["LEADLY_LLM_API_KEY"]);

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
    }
}
