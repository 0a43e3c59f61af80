//! # gd-config
//!
//! Layered settings: built-in defaults, then an optional `gromover.toml`,
//! then `GROMOVER_*` environment variables (nested keys joined with `__`,
//! e.g. `GROMOVER_STORAGE__DATA_DIR`). A `.env` file is loaded first when present.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use gd_core::validation::is_valid_ipv4;
use gd_core::{BlacklistPolicy, ExportKind};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "gromover";

/// Address blacklisted before the admin has added anything.
pub const DEFAULT_SEED_IP: &str = "92.52.166.230";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    pub ip_lookup: IpLookupSettings,
    pub moderation: ModerationSettings,
    pub listing: ListingSettings,
    pub export: ExportSettings,
    pub log: LogSettings,
    /// The `.env` file that was applied, if any. Logged by the caller once
    /// telemetry is up.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Holds one JSON file per document plus the `blobs/` tree.
    pub data_dir: PathBuf,
    pub max_cas_retries: u32,
}

impl StorageSettings {
    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpLookupSettings {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl IpLookupSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModerationSettings {
    pub policy: BlacklistPolicy,
    pub seed_blacklist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingSettings {
    pub hide_rejected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    pub dir: PathBuf,
    pub kind: ExportKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, then `gromover.toml`, from the working directory.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_in(Path::new("."))
    }

    /// Same as `load`, looking in `dir`. A missing `.env` is not an error.
    pub fn load_in(dir: &Path) -> Result<Self, SettingsError> {
        let env_path = dir.join(".env");
        let env_file = dotenvy::from_path(&env_path).ok().map(|()| env_path);
        let mut settings = Self::load_from(&dir.join(DEFAULT_CONFIG_FILE))?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Same layering as `load`, reading the optional file at `file`
    /// (extension may be omitted) and skipping `.env`.
    pub fn load_from(file: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .set_default("storage.data_dir", "./data")?
            .set_default("storage.max_cas_retries", 16)?
            .set_default("ip_lookup.endpoint", "https://api.ipify.org?format=json")?
            .set_default("ip_lookup.timeout_ms", 5000)?
            .set_default("moderation.policy", "tag")?
            .set_default("moderation.seed_blacklist", vec![DEFAULT_SEED_IP])?
            .set_default("listing.hide_rejected", false)?
            .set_default("export.dir", "./exports")?
            .set_default("export.kind", "summary")?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix("GROMOVER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("moderation.seed_blacklist")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(bad) = self
            .moderation
            .seed_blacklist
            .iter()
            .find(|ip| !is_valid_ipv4(ip))
        {
            return Err(SettingsError::Invalid(format!(
                "moderation.seed_blacklist entry {bad:?} is not an IPv4 address"
            )));
        }
        if self.ip_lookup.timeout_ms == 0 {
            return Err(SettingsError::Invalid("ip_lookup.timeout_ms must be positive".into()));
        }
        if self.ip_lookup.endpoint.trim().is_empty() {
            return Err(SettingsError::Invalid("ip_lookup.endpoint must not be empty".into()));
        }
        Ok(())
    }
}
