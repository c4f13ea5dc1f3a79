//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The repository owner and name have no default and must come from one of
//! the first three tiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default branch holding the poem document
pub const DEFAULT_BRANCH: &str = "main";

/// Default document path inside the repository
pub const DEFAULT_DOCUMENT_PATH: &str = "poems.json";

/// Default public raw-content mirror
pub const DEFAULT_RAW_HOST: &str = "https://raw.githubusercontent.com";

/// Default authenticated REST API host
pub const DEFAULT_API_HOST: &str = "https://api.github.com";

/// Default bound on every network call
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default number of poems revealed per page
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Application name used for config/data directories
const APP_DIR: &str = "quire";

/// Configuration file contents
///
/// Every field is optional; anything left out falls through to the
/// compiled default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved site configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch holding the document
    pub branch: String,
    /// Document path inside the repository
    pub path: String,
    /// Public raw-content mirror, no trailing slash
    pub raw_host: String,
    /// REST API host, no trailing slash
    pub api_host: String,
    /// Bound on every network call
    pub timeout: Duration,
    /// Poems revealed per page
    pub page_size: usize,
    /// Directory holding preference and session files
    pub data_dir: PathBuf,
    /// Log level from the TOML file
    pub log_level: String,
}

impl SiteConfig {
    /// Resolve against the process environment
    pub fn resolve(overrides: &ConfigOverrides, toml: &TomlConfig) -> Result<Self> {
        Self::resolve_with(overrides, toml, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<F>(overrides: &ConfigOverrides, toml: &TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let owner = pick(overrides.owner.clone(), env("QUIRE_OWNER"), toml.owner.clone())
            .ok_or_else(|| missing_setting("owner", "--owner", "QUIRE_OWNER"))?;
        let repo = pick(overrides.repo.clone(), env("QUIRE_REPO"), toml.repo.clone())
            .ok_or_else(|| missing_setting("repo", "--repo", "QUIRE_REPO"))?;

        let branch = pick(overrides.branch.clone(), env("QUIRE_BRANCH"), toml.branch.clone())
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let path = pick(overrides.path.clone(), env("QUIRE_PATH"), toml.path.clone())
            .map(|p| p.trim_start_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PATH.to_string());

        let raw_host = pick(None, env("QUIRE_RAW_HOST"), toml.raw_host.clone())
            .unwrap_or_else(|| DEFAULT_RAW_HOST.to_string());
        let api_host = pick(None, env("QUIRE_API_HOST"), toml.api_host.clone())
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());

        let env_timeout = match env("QUIRE_TIMEOUT") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("QUIRE_TIMEOUT must be a whole number of seconds: {}", e))
            })?),
            None => None,
        };
        let timeout_secs = pick(overrides.timeout_secs, env_timeout, toml.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least one second".to_string()));
        }

        let page_size = pick(overrides.page_size, None, toml.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }

        let data_dir = pick(
            overrides.data_dir.clone(),
            env("QUIRE_DATA_DIR").map(PathBuf::from),
            toml.data_dir.clone(),
        )
        .unwrap_or_else(default_data_dir);

        Ok(Self {
            owner,
            repo,
            branch,
            path,
            raw_host: raw_host.trim_end_matches('/').to_string(),
            api_host: api_host.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            page_size,
            data_dir,
            log_level: toml.logging.level.clone(),
        })
    }

    /// File holding long-lived preferences (favorites)
    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    /// File holding session-scoped values (the bearer token)
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn pick<T>(cli: Option<T>, env: Option<T>, toml: Option<T>) -> Option<T> {
    cli.or(env).or(toml)
}

fn missing_setting(name: &str, flag: &str, env_var: &str) -> Error {
    Error::Config(format!(
        "Repository {name} not configured. Set it using one of:\n\
         1. Command line: {flag} <value>\n\
         2. Environment: {env_var}=<value>\n\
         3. TOML config: {} ({name} = \"<value>\")",
        default_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "config.toml".to_string())
    ))
}

/// Default configuration file path for the platform
///
/// `~/.config/quire/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Default data directory for the platform
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./quire_data"))
}

/// Load the TOML config file
///
/// A missing file is not an error: defaults apply and a warning is logged.
/// A file that exists but does not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file not found at {}, using defaults", path.display());
            return Ok(TomlConfig::default());
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let config: TomlConfig = toml::from_str(&text)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write the TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;

    info!("Config written to {}", path.display());
    Ok(())
}
