//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and overridden by `LIBRARY__*` environment
//! variables (e.g. `LIBRARY__SERVER__PORT=8080`).
//!
//! See `settings.toml` for an example.
use config::{Config, ConfigError, Environment, File};
use engine::SmtpConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: Database,
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    /// SMTP relay for purchase confirmations. Mails are only logged when
    /// absent.
    pub mail: Option<SmtpConfig>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("LIBRARY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
