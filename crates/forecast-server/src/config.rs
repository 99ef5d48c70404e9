use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use forecast_core::ForecastKind;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Microsoft SQL Server over TDS
    SqlServer,
    /// Process-local tables, lost on exit
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub trust_cert: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionConfig {
    /// Base URL of the prediction API
    pub api_url: String,
    /// Request timeout; unset leaves the HTTP client default in place
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Deployment routing per forecast kind
    #[serde(default)]
    pub routes: HashMap<ForecastKind, DeploymentRoute>,
}

#[derive(Deserialize, Clone, PartialEq)]
pub struct DeploymentRoute {
    pub deployment_id: String,
    #[serde(default)]
    pub deployment_token: String,
}

impl std::fmt::Debug for DeploymentRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentRoute")
            .field("deployment_id", &self.deployment_id)
            .field("deployment_token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Username to lowercase hex SHA-256 password digest. Keys arrive
    /// lowercased from the config loader.
    #[serde(default)]
    pub users: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Database defaults
            .set_default("database.backend", "sqlserver")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 1433)?
            .set_default("database.database", "forecasts")?
            // Prediction defaults
            .set_default("prediction.api_url", "https://api.abacus.ai/api/v0")?
            // Session defaults
            .set_default("session.ttl_seconds", 3600)?
            .set_default("session.max_capacity", 1000)?
            // Load from config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (FORECAST__DATABASE__PASSWORD, etc.)
            // Using double underscore as separator to handle nested keys with underscores
            .add_source(
                Environment::with_prefix("FORECAST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PredictionConfig {
    pub fn route(&self, kind: ForecastKind) -> Option<&DeploymentRoute> {
        self.routes.get(&kind)
    }
}
