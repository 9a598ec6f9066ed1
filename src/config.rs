use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;

/// Static provider connection parameters, read once at process start from
/// `~/.config/cocher/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the identity endpoint (`.../v1/accounts:*` lives under it).
    pub identity_url: String,
    /// Base URL of the document store (`users/{uid}/...` lives under it).
    pub store_url: String,
    /// API key appended to identity calls.
    pub api_key: String,
    /// Skip TLS verification (self-hosted dev servers).
    #[serde(default)]
    pub allow_insecure_certs: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj = ProjectDirs::from("com", "cocher", "cocher")
            .context("Could not determine a config directory")?;
        let path = proj.config_dir().join("config.toml");
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Could not parse {}", path.display()))?;
        Ok(config)
    }
}
