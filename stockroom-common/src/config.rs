//! Bootstrap configuration and root folder resolution
//!
//! Configuration comes in two tiers:
//! 1. **TOML bootstrap** (this module): root folder, logging level and
//!    provider endpoint overrides. Static for the lifetime of the process.
//! 2. **Database runtime**: credentials, datasheet ids and field mappings in
//!    the `settings` table, written by the setup flow.
//!
//! A missing or broken TOML file is never fatal: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "STOCKROOM_ROOT_FOLDER";

/// Name of the SQLite cache file inside the root folder
pub const DATABASE_FILE: &str = "stockroom.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the cache database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Base URL overrides for self-hosted or test backends
    #[serde(default)]
    pub providers: ProviderEndpoints,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Per-backend base URL overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    #[serde(default)]
    pub aitable_base_url: Option<String>,
    #[serde(default)]
    pub vika_base_url: Option<String>,
    #[serde(default)]
    pub bika_base_url: Option<String>,
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML configuration from its default location
///
/// Falls back to `TomlConfig::default()` when no file exists or it cannot be
/// parsed.
pub fn load_toml_config_or_default() -> TomlConfig {
    let Some(path) = default_config_path() else {
        debug!("No TOML config file found, using defaults");
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            debug!("Loaded TOML config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring TOML config {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Locate the configuration file for this platform
///
/// Linux checks `~/.config/stockroom/config.toml` then
/// `/etc/stockroom/config.toml`; other platforms only the user config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("stockroom").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/stockroom/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "macos") {
        // ~/Library/Application Support/stockroom
        dirs::data_dir()
            .map(|d| d.join("stockroom"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/stockroom"))
    } else {
        // ~/.local/share/stockroom or %LOCALAPPDATA%\stockroom
        dirs::data_local_dir()
            .map(|d| d.join("stockroom"))
            .unwrap_or_else(|| PathBuf::from("./stockroom_data"))
    }
}

/// Root folder resolution
///
/// Priority order:
/// 1. Command-line argument
/// 2. `STOCKROOM_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and derives file paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            debug!("Created root folder {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
