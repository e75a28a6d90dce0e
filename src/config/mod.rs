mod file_config;

pub use file_config::{FileConfig, LastFmConfig, LogsConfig};

use crate::search::LASTFM_API_BASE;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 200;

/// Settings taken from the command line. Any of them may be replaced by the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub cors_origins: Vec<String>,
    pub max_page_size: Option<usize>,
    pub lastfm_api_key: Option<String>,
    pub lastfm_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub cors_origins: Vec<String>,

    pub logs: LogsSettings,
    pub lastfm: LastFmSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for LogsSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastFmSettings {
    /// Without a key search answers with empty results.
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for LastFmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: LASTFM_API_BASE.to_string(),
        }
    }
}

impl AppConfig {
    /// Merges command line and config file. A value present in the file wins.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow::anyhow!("No database directory: pass --db-dir or set db_dir"))?;

        if !db_dir.is_dir() {
            if db_dir.exists() {
                bail!("Database location {:?} is not a directory", db_dir);
            }
            bail!("Database directory {:?} is missing", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(raw) => parse_logging_level(&raw)
                .ok_or_else(|| anyhow::anyhow!("Unknown logging_level {:?}", raw))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let cors_origins = file
            .cors_origins
            .unwrap_or_else(|| cli.cors_origins.clone());

        let logs_file = file.logs.unwrap_or_default();
        let max_page_size = logs_file
            .max_page_size
            .or(cli.max_page_size)
            .unwrap_or(DEFAULT_MAX_PAGE_SIZE);
        if max_page_size == 0 {
            bail!("max_page_size must be at least 1");
        }
        let logs = LogsSettings {
            default_page_size: logs_file
                .default_page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, max_page_size),
            max_page_size,
        };

        let lastfm_file = file.lastfm.unwrap_or_default();
        let lastfm = LastFmSettings {
            api_key: lastfm_file
                .api_key
                .or_else(|| cli.lastfm_api_key.clone())
                .filter(|key| !key.trim().is_empty()),
            base_url: lastfm_file
                .base_url
                .or_else(|| cli.lastfm_base_url.clone())
                .unwrap_or_else(|| LASTFM_API_BASE.to_string()),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            cors_origins,
            logs,
            lastfm,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join("musicboxd.db")
    }
}

/// Case-insensitive, same names as the --logging-level flag.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
