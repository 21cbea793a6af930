pub mod config;
pub mod db;
pub mod serve;
pub mod token;
pub mod user;

use anyhow::Context as _;
use pulse_core::config::Config;
use pulse_core::store::{RecordStore, SqliteStore};
use std::path::PathBuf;

/// Global flags shared by every subcommand.
pub struct Context {
    pub config_path: PathBuf,
    pub db_override: Option<String>,
    pub json: bool,
}

impl Context {
    /// Config file (or defaults), then `PULSE_TOKEN_SECRET`, then `--db`.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config_path)
            .with_context(|| format!("failed to load config {}", self.config_path.display()))?;
        config.apply_env();
        if let Some(db) = &self.db_override {
            config.database.path = db.clone();
        }
        Ok(config)
    }

    /// Open the configured database without touching its schema.
    pub fn open_store(&self, config: &Config) -> anyhow::Result<SqliteStore> {
        SqliteStore::open_location(&config.database.path)
            .with_context(|| format!("failed to open database {}", config.database.path))
    }

    /// Open the configured database and bring its schema up to date.
    pub fn open_migrated(&self) -> anyhow::Result<SqliteStore> {
        let config = self.load_config()?;
        let store = self.open_store(&config)?;
        store.migrate().context("failed to migrate database")?;
        Ok(store)
    }
}
