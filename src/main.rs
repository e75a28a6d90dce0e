use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use musicboxd_server::config;
use musicboxd_server::search::create_search_provider;
use musicboxd_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use musicboxd_server::store::SqliteStore;

/// Absolute form of a command line path. A missing file is not an error here.
fn absolute_path(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .map_err(|err| format!("Cannot resolve {}: {}", raw, err)),
        Err(err) => Err(format!("Cannot resolve {}: {}", raw, err)),
    }
}

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
    let path = absolute_path(raw)?;
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{} is not an existing directory", raw))
    }
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = absolute_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the database file (musicboxd.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = existing_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Browser origin allowed to call the API. Can be repeated.
    #[clap(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// Largest page a log listing may return.
    #[clap(long)]
    pub max_page_size: Option<usize>,

    /// Last.fm API key. Search returns no results without one.
    #[clap(long, env = "LASTFM_API_KEY")]
    pub lastfm_api_key: Option<String>,

    /// Base URL of the Last.fm API.
    #[clap(long)]
    pub lastfm_base_url: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            cors_origins: args.cors_origins.clone(),
            max_page_size: args.max_page_size,
            lastfm_api_key: args.lastfm_api_key.clone(),
            lastfm_base_url: args.lastfm_base_url.clone(),
        }
    }
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

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  metrics_port: {}", app_config.metrics_port);
    info!("  logging_level: {}", app_config.logging_level);
    info!(
        "  page size: default {}, max {}",
        app_config.logs.default_page_size, app_config.logs.max_page_size
    );

    info!("Opening SQLite database at {:?}...", app_config.db_path());
    let store = Arc::new(SqliteStore::new(app_config.db_path())?);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let search = create_search_provider(
        app_config.lastfm.api_key.as_deref(),
        &app_config.lastfm.base_url,
    )?;

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        cors_origins: app_config.cors_origins.clone(),
        default_page_size: app_config.logs.default_page_size,
        max_page_size: app_config.logs.max_page_size,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(server_config, app_config.metrics_port, store, search).await
}
