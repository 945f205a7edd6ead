use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use config::{Config, Environment, File};
use hoikudb_core::stats::DEFAULT_TTL;
use serde::Deserialize;

const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/preschool-data";

/// Runtime settings: defaults, then `configuration/base.yaml`, then `HOIKUDB_*` variables.
#[derive(Debug, Deserialize)]
pub(crate) struct Settings {
    pub endpoint: String,
    pub cache_ttl_secs: u64,
    pub user_agent: String,
    pub log_dir: PathBuf,
}

impl Settings {
    pub(crate) fn load() -> Result<Self> {
        let base_path = env::current_dir().context("Failed to determine the current directory")?;
        let file = base_path.join("configuration").join("base.yaml");

        Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("cache_ttl_secs", DEFAULT_TTL.num_seconds())?
            .set_default("user_agent", "hoikudb/0.1")?
            .set_default("log_dir", "logs")?
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix("HOIKUDB").try_parsing(true))
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize settings")
    }

    pub(crate) fn cache_ttl(&self) -> TimeDelta {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(DEFAULT_TTL)
    }
}
