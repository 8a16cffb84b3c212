//! # configs
//!
//! Layered settings for the forum server:
//! built-in defaults, then `FORUM_*` environment variables
//! (`FORUM_SERVER__PORT`, `FORUM_AUTH__SECRET_KEY`, ...), then the legacy
//! `SECRET_KEY` / `DATABASE_URL` variables, which win when set.
//! A `.env` file in the working directory is read first if present.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
    pub web: WebSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
    /// Directory holding the SQL migrations applied at startup
    pub migrations: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing key for bearer tokens
    pub secret_key: SecretString,
    pub token_ttl_days: i64,
}

/// Browser client files served next to the API.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSettings {
    /// Page returned for `/`
    pub index: PathBuf,
    /// Directory mounted at `/static/`
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info,sqlx=warn`
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::build(None, std::env::var("SECRET_KEY").ok(), std::env::var("DATABASE_URL").ok())
    }

    /// Same layering as `load`, with the environment given as a map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let secret_key = vars.get("SECRET_KEY").cloned();
        let database_url = vars.get("DATABASE_URL").cloned();
        Self::build(Some(vars), secret_key, database_url)
    }

    fn build(
        vars: Option<HashMap<String, String>>,
        secret_key: Option<String>,
        database_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix("FORUM")
            .prefix_separator("_")
            .separator("__")
            .source(vars.map(|v| v.into_iter().collect()));

        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("database.migrations", "./crates/storage-adapters/migrations")?
            .set_default("auth.token_ttl_days", 90)?
            .set_default("log.filter", "info")?
            .set_default("log.format", "json")?
            .set_default("web.index", "./template/index.html")?
            .set_default("web.static_dir", "./static")?
            .add_source(environment)
            .set_override_option("auth.secret_key", secret_key)?
            .set_override_option("database.url", database_url)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.expose_secret().is_empty() {
            return Err(ConfigError::Invalid {
                key: "auth.secret_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.auth.token_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "auth.token_ttl_days",
                reason: "must be positive".to_string(),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
