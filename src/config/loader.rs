use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
    pub rollup: RollupConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}`, `TRADE_INGEST__*` variables and
    /// the legacy `REDIS_IO` / `DATABASE_URL` variables, in that order.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("TRADE_INGEST").separator("__"))
            .set_override_option("queue.url", std::env::var("REDIS_IO").ok())
            .and_then(|b| b.set_override_option("storage.url", std::env::var("DATABASE_URL").ok()))
            .and_then(|b| b.build())
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    /// Storage settings for the rollup gateway: the shared connection settings
    /// with the rollup statement timeout.
    pub fn rollup_storage(&self) -> StorageConfig {
        StorageConfig {
            statement_timeout_secs: self.rollup.statement_timeout_secs,
            ..self.storage.clone()
        }
    }

    /// Environment name from `APP_ENV`, defaulting to development.
    pub fn env_name() -> String {
        std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue.url.trim().is_empty() {
            return Err(Error::ConfigError("queue.url must not be empty".to_string()));
        }
        if self.queue.channel.trim().is_empty() {
            return Err(Error::ConfigError("queue.channel must not be empty".to_string()));
        }
        if self.queue.dead_letter_channel.as_deref() == Some(self.queue.channel.as_str()) {
            return Err(Error::ConfigError(
                "queue.dead_letter_channel must differ from queue.channel".to_string(),
            ));
        }
        if self.storage.url.trim().is_empty() {
            return Err(Error::ConfigError("storage.url must not be empty".to_string()));
        }
        if self.storage.max_connections == 0 {
            return Err(Error::ConfigError("storage.max_connections must be >= 1".to_string()));
        }
        if self.ingestion.max_attempts == 0 {
            return Err(Error::ConfigError("ingestion.max_attempts must be >= 1".to_string()));
        }
        if self.rollup.refresh_interval_secs == 0 {
            return Err(Error::ConfigError("rollup.refresh_interval_secs must be >= 1".to_string()));
        }
        Ok(())
    }
}
