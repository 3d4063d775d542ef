//! Engine configuration: part size, worker count, resume flag, endpoint.

use crate::error::DownloadError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_part_size() -> u64 {
    8 * 1024 * 1024
}

fn default_concurrency() -> usize {
    4
}

fn default_resume() -> bool {
    true
}

/// Configuration loaded from `~/.config/osd/config.toml`, or built in code
/// by embedders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsdConfig {
    /// Object-store endpoint URL for the bundled HTTP client.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Size of each downloaded part in bytes.
    #[serde(default = "default_part_size")]
    pub part_size: u64,
    /// Number of parallel part-fetch workers. A value of 1 means exactly one
    /// worker; zero workers is not a mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Persist breakpoint records so interrupted downloads can resume.
    #[serde(default = "default_resume")]
    pub resume: bool,
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            part_size: default_part_size(),
            concurrency: default_concurrency(),
            resume: default_resume(),
        }
    }
}

impl OsdConfig {
    /// Rejects configurations the engine cannot run with, before any network
    /// or disk work starts.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.part_size < 1 {
            return Err(DownloadError::Config(
                "part_size must be at least 1 byte".to_string(),
            ));
        }
        if self.concurrency < 1 {
            return Err(DownloadError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("osd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<OsdConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = OsdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: OsdConfig = toml::from_str(&data)?;
    Ok(cfg)
}
