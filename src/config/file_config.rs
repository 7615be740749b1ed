use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    pub oai: Option<OaiConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OaiConfig {
    /// Namespace part of record identifiers, usually the host name.
    pub repository_id: Option<String>,
    pub repository_name: Option<String>,
    pub admin_email: Option<String>,
    pub records_per_page: Option<usize>,
    pub identifiers_per_page: Option<usize>,
    pub sets_per_page: Option<usize>,
    pub token_lifetime_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
