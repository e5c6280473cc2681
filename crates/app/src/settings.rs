//! Settings for the command line front end.
//!
//! Read from an optional TOML file (default `config/tally.toml`) and from
//! `TALLY_*` environment variables, `__` separating nested keys
//! (`TALLY_ACCOUNT__PASSWORD`). Flags given on the command line win.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{cli::Cli, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/tally.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("tally.db".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Account {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    /// How often `watch` checks for writes made by other processes.
    pub database_poll_ms: u64,
    pub account: Account,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: App::default(),
            database: Database::default(),
            database_poll_ms: 500,
            account: Account::default(),
        }
    }
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = Config::builder()
            .add_source(File::with_name(path).required(cli.config.is_some()))
            .add_source(
                Environment::with_prefix("TALLY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let mut settings: Self = settings.try_deserialize()?;

        if let Some(email) = &cli.email {
            settings.account.email = Some(email.clone());
        }

        Ok(settings)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.database_poll_ms)
    }
}
