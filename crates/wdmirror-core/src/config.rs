use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/wdmirror/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Directory (relative to the working directory unless absolute) holding
    /// downloaded media, fetched query results, and the cache index.
    pub base_dir: PathBuf,
    /// Name of the persisted cache index inside `base_dir`.
    pub cache_file: String,
    /// When false, every cache lookup is a forced miss.
    pub cache_enabled: bool,
    /// Default time-to-live for new cache entries, in milliseconds.
    /// Zero means entries never expire.
    pub default_ttl_ms: u64,
    /// Enables the progress display and diagnostic logging.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("content"),
            cache_file: ".cache.json".to_string(),
            cache_enabled: true,
            default_ttl_ms: 60 * 60 * 1000, // 1h
            verbose: false,
        }
    }
}

impl MirrorConfig {
    /// Resolves `base_dir` against the current working directory.
    pub fn work_dir(&self) -> Result<PathBuf> {
        if self.base_dir.is_absolute() {
            return Ok(self.base_dir.clone());
        }
        Ok(std::env::current_dir()?.join(&self.base_dir))
    }

    /// Path of the persisted cache index.
    pub fn cache_path(&self) -> Result<PathBuf> {
        Ok(self.work_dir()?.join(&self.cache_file))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wdmirror")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MirrorConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MirrorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MirrorConfig = toml::from_str(&data)?;
    Ok(cfg)
}
