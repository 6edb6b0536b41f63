use crate::constants::{CONFIG_PATHS, DEFAULT_ARCHIVE_URL, DEFAULT_SIZE_LIMIT};
use crate::error::SyncError;
use crate::models::{RetentionWindow, SizeLimit, SyncOptions};
use crate::utils;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub retention: RetentionWindow,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_ARCHIVE_URL.to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadConfig {
    /// -1 always downloads the full image, 0 always the thumbnail
    #[serde(default = "default_size_limit")]
    pub size_limit: i64,
    #[serde(default)]
    pub skip_cleanup: bool,
}

fn default_size_limit() -> i64 {
    DEFAULT_SIZE_LIMIT
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            size_limit: default_size_limit(),
            skip_cleanup: false,
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub days: Option<u32>,
    pub years: Option<u32>,
    pub square: bool,
    pub force: bool,
    pub skip_cleanup: bool,
    pub size_limit: Option<i64>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load configuration from default location or return defaults.
    /// A settings file that exists but cannot be read or parsed is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_PATHS)
    }

    /// First existing file among `paths` wins
    pub fn load_from(paths: &[&str]) -> Result<Self> {
        for path in paths {
            let path = utils::expand_path(path);
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration");
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Merge command line overrides and validate into the options of a run
    pub fn sync_options(&self, local_path: PathBuf, overrides: &Overrides) -> Result<SyncOptions, SyncError> {
        let size_limit = overrides.size_limit.unwrap_or(self.download.size_limit);
        let retention = RetentionWindow {
            days: overrides.days.unwrap_or(self.retention.days),
            years: overrides.years.unwrap_or(self.retention.years),
            square: overrides.square || self.retention.square,
        };
        retention.validate()?;

        Ok(SyncOptions {
            local_path,
            retention,
            force: overrides.force,
            skip_cleanup: overrides.skip_cleanup || self.download.skip_cleanup,
            size_limit: SizeLimit::try_from(size_limit)?,
        })
    }
}
