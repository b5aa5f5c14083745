use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("ROLESWAP_CONFIG_PATH").unwrap_or("roleswap.toml"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP bind address for `serve`.
    pub bind: String,
    /// Directory holding the ONNX model files.
    pub model_dir: PathBuf,
    /// Directory the preset web paths resolve against.
    pub asset_root: PathBuf,
    /// Where undetectable source images are dumped for analysis.
    pub debug_dir: PathBuf,
    /// Detector score threshold.
    pub detection_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:1204".to_string(),
            model_dir: PathBuf::from("models"),
            asset_root: PathBuf::from("."),
            debug_dir: PathBuf::from("."),
            detection_threshold: 0.3,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
