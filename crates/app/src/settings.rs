//! Application settings.
//!
//! Read from `config/settings.toml` when present, then from environment
//! variables such as `TALLY_TELEGRAM__TOKEN` or `TALLY_APP__LEVEL`.

use std::net::SocketAddr;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `database = "memory"` or `[database] sqlite = "tally.db"`.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Webhook {
    pub url: String,
    pub bind: SocketAddr,
    pub secret_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    #[serde(default = "admins_only_default")]
    pub admins_only: bool,
    pub webhook: Option<Webhook>,
}

fn admins_only_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub database: Database,
    pub telegram: Option<Telegram>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Result<Settings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn full_settings() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [database]
            sqlite = "tally.db"

            [telegram]
            token = "123:abc"
            admins_only = false

            [telegram.webhook]
            url = "https://example.org/bot/secret"
            bind = "0.0.0.0:3000"
            secret_token = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database, Database::Sqlite("tally.db".to_string()));
        let telegram = settings.telegram.unwrap();
        assert!(!telegram.admins_only);
        let webhook = telegram.webhook.unwrap();
        assert_eq!(webhook.bind.port(), 3000);
        assert_eq!(webhook.secret_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn defaults() {
        let settings = parse(
            r#"
            database = "memory"

            [telegram]
            token = "123:abc"
            "#,
        )
        .unwrap();

        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::Memory);
        let telegram = settings.telegram.unwrap();
        assert!(telegram.admins_only);
        assert!(telegram.webhook.is_none());
    }

    #[test]
    fn database_is_required() {
        assert!(parse("[app]\nlevel = \"info\"").is_err());
    }
}
