//! Settings for the `nestegg` binary.
//!
//! Sources, lowest priority first: the TOML file (`config/nestegg.toml`
//! unless `--config` says otherwise, optional), `NESTEGG_*` environment
//! variables, then command line flags.
use std::path::PathBuf;

use serde::Deserialize;

use crate::{cli::Cli, error::Result};

const DEFAULT_CONFIG_PATH: &str = "config/nestegg.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Identity every goal is scoped to.
    pub user: String,
    /// Directory holding the local goal files (and the authority ledger
    /// when no remote is configured).
    pub data_dir: String,
    /// Base URL of the savings authority. Without it an in-process authority
    /// persisted under `data_dir` is used.
    pub remote_url: Option<String>,
    pub level: String,
    pub bind: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user: String::new(),
            data_dir: "data".to_string(),
            remote_url: None,
            level: "info".to_string(),
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn authority_dir(&self) -> PathBuf {
        self.data_dir().join("authority")
    }
}

pub fn load(cli: &Cli) -> Result<Settings> {
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("NESTEGG"));
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(user) = &cli.user {
        settings.user = user.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        settings.data_dir = data_dir.clone();
    }
    if let Some(remote_url) = &cli.remote_url {
        settings.remote_url = Some(remote_url.clone());
    }
    if let Some(level) = &cli.level {
        settings.level = level.clone();
    }

    Ok(settings)
}
