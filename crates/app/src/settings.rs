//! Handles settings for the daemon. Configuration is read from an optional
//! `settings.toml`, overridden by `MONTHBOOK__*` environment variables
//! (`MONTHBOOK__DATABASE__SQLITE=./monthbook.db`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_INTERVAL_SECS: u64 = 3600;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

/// SQLite file to use; in-memory when no path is given.
#[derive(Debug, Default, Deserialize)]
pub struct Database {
    pub sqlite: Option<String>,
}

impl Database {
    pub fn url(&self) -> String {
        match &self.sqlite {
            Some(path) => format!("sqlite:{path}?mode=rwc"),
            None => String::from("sqlite::memory:"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub interval_secs: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Engine {
    pub lock_timeout_ms: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub scheduler: Scheduler,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("MONTHBOOK").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
