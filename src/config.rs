//! Optional config file. The first of ./pratilipi2epub.toml and
//! `<config_dir>/pratilipi2epub/config.toml` that exists wins; command-line flags override it.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_FILE: &str = "pratilipi2epub.toml";
const APP_DIR: &str = "pratilipi2epub";

/// Config file contents. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory for default output paths (relative to CWD).
    pub output_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    /// Seconds between requests.
    pub request_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    /// Visible table-of-contents page after the cover (default true).
    pub toc_page: Option<bool>,
    /// HTTP attempts for transient failures (default 3).
    pub retry_count: Option<u32>,
    /// Seconds to wait before each retry, e.g. `[1, 2, 4]`. Empty means 1, 2, 4, ...
    pub retry_backoff_secs: Option<Vec<u64>>,
    /// skip, placeholder or fail.
    pub empty_chapters: Option<String>,
    /// skip, placeholder or fail.
    pub early_access: Option<String>,
    /// Parts per GraphQL listing page.
    pub page_size: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Candidate config paths in search order.
pub fn config_paths() -> Result<Vec<PathBuf>, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
    let mut paths = vec![cwd.join(LOCAL_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_DIR).join("config.toml"));
    }
    Ok(paths)
}

/// Load the first config found in the default locations. No file gives `Ok(None)`; a present
/// but unreadable or invalid file is an error.
pub fn load_config() -> Result<Option<Config>, ConfigError> {
    load_first(&config_paths()?)
}

/// Load the first existing file among `paths`.
pub fn load_first<P: AsRef<Path>>(paths: &[P]) -> Result<Option<Config>, ConfigError> {
    match paths.iter().map(AsRef::as_ref).find(|p| p.exists()) {
        Some(path) => parse_file(path).map(Some),
        None => Ok(None),
    }
}

fn parse_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
