mod file_config;

pub use file_config::{FileConfig, OaiConfig};

use crate::oai::RepositorySettings;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// Upper bound for `token_lifetime_secs`, one year.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub repository_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub oai: RepositorySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let oai_file = file.oai.unwrap_or_default();
        let defaults = RepositorySettings::default();

        let repository_id = oai_file
            .repository_id
            .or_else(|| cli.repository_id.clone())
            .unwrap_or(defaults.repository_id);
        if repository_id.is_empty() || repository_id.contains(char::is_whitespace) {
            bail!("Invalid repository id: {:?}", repository_id);
        }

        let oai = RepositorySettings {
            repository_id,
            repository_name: oai_file
                .repository_name
                .unwrap_or(defaults.repository_name),
            admin_email: oai_file.admin_email.unwrap_or(defaults.admin_email),
            records_per_page: positive(
                "records_per_page",
                oai_file.records_per_page,
                defaults.records_per_page,
            )?,
            identifiers_per_page: positive(
                "identifiers_per_page",
                oai_file.identifiers_per_page,
                defaults.identifiers_per_page,
            )?,
            sets_per_page: positive(
                "sets_per_page",
                oai_file.sets_per_page,
                defaults.sets_per_page,
            )?,
            token_lifetime: match oai_file.token_lifetime_secs {
                Some(0) => bail!("token_lifetime_secs must be greater than zero"),
                Some(secs) if secs > MAX_TOKEN_LIFETIME_SECS => bail!(
                    "token_lifetime_secs must be at most {}, got {}",
                    MAX_TOKEN_LIFETIME_SECS,
                    secs
                ),
                Some(secs) => chrono::Duration::seconds(secs as i64),
                None => defaults.token_lifetime,
            },
        };

        Ok(Self {
            db_dir,
            port,
            logging_level,
            oai,
        })
    }

    pub fn publishing_db_path(&self) -> PathBuf {
        self.db_dir.join("publishing.db")
    }

    pub fn harvest_db_path(&self) -> PathBuf {
        self.db_dir.join("harvest.db")
    }
}

fn positive(name: &str, value: Option<usize>, default: usize) -> Result<usize> {
    match value {
        Some(0) => bail!("{} must be greater than zero", name),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
