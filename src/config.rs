//! Daemon configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `studentd.toml` (or the file named by `STUDENTD_CONFIG`), then
//! `STUDENTD_*` environment variables.

use anyhow::{bail, Context};
use ::config::{Config as Sources, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::password::PasswordScheme;

pub const CONFIG_PATH_ENV: &str = "STUDENTD_CONFIG";
const ENV_PREFIX: &str = "STUDENTD";
const DEFAULT_FILE_STEM: &str = "studentd";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Workspace opened at startup, before any `workspace.select`.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    pub log_level: String,
    /// Format used for newly registered credentials.
    pub password_scheme: PasswordScheme,
    /// Longest accepted text for a single grid field or credential field.
    pub max_field_length: usize,
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workspace: None,
            log_level: "info".to_string(),
            password_scheme: PasswordScheme::Argon2id,
            max_field_length: 256,
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(explicit.as_deref(), Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(file: Option<&Path>, env: Environment) -> anyhow::Result<Self> {
        let defaults = Config::default();
        let mut builder = Sources::builder()
            .set_default("log_level", defaults.log_level.clone())?
            .set_default("password_scheme", "argon2id")?
            .set_default("max_field_length", defaults.max_field_length as i64)?
            .set_default("busy_timeout_ms", defaults.busy_timeout_ms as i64)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path.to_path_buf()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_FILE_STEM).required(false)),
        };

        let cfg: Config = builder
            .add_source(env)
            .build()
            .context("failed to read configuration sources")?
            .try_deserialize()
            .context("invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.log_level.trim().is_empty() {
            bail!("log_level must not be empty");
        }
        if self.max_field_length == 0 {
            bail!("max_field_length must be > 0");
        }
        Ok(())
    }
}
