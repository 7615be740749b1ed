use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use preprint_oai_server::config::{AppConfig, CliConfig, FileConfig};
use preprint_oai_server::publishing_store::SqlitePublishingStore;
use preprint_oai_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use preprint_oai_server::token_store::SqliteTokenStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding `publishing.db` and `harvest.db`.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Optional TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Namespace used in record identifiers, e.g. `preprints.example.org`.
    #[clap(long)]
    pub repository_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        repository_id: cli_args.repository_id,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!(
        "Opening publishing database at {:?}...",
        config.publishing_db_path()
    );
    let publishing_store = Arc::new(SqlitePublishingStore::new(config.publishing_db_path())?);

    info!(
        "Opening harvest state database at {:?}...",
        config.harvest_db_path()
    );
    let token_store = Arc::new(SqliteTokenStore::new(config.harvest_db_path())?);

    info!(
        "Repository {} ({}), pages of {}/{}/{} records/identifiers/sets",
        config.oai.repository_id,
        config.oai.repository_name,
        config.oai.records_per_page,
        config.oai.identifiers_per_page,
        config.oai.sets_per_page,
    );

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level,
        port: config.port,
    };

    run_server(publishing_store, token_store, config.oai, server_config).await
}
