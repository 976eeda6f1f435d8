//! Configuration of the content system.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that contains path to the settings file.
pub const SETTINGS_ENV: &str = "CONTENT_SETTINGS";

/// Settings file used when `CONTENT_SETTINGS` is not set.
pub const DEFAULT_SETTINGS_FILE: &str = "./content_settings.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfiguration {
    /// Directories searched (in order) when fetching descriptors.
    pub content_roots: Vec<PathBuf>,

    /// Whether id-mapped references that look like paths are looked up
    /// by url when they are not valid ids.
    pub path_fallback: bool,

    /// Whether opened materials re-resolve their references when their
    /// descriptor is replaced.
    pub watch_descriptors: bool,
}

// default development configuration
impl Default for ContentConfiguration {
    fn default() -> Self {
        Self {
            content_roots: vec![PathBuf::from("./assets")],
            path_fallback: true,
            watch_descriptors: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    CannotRead(PathBuf, std::io::Error),
    Invalid(PathBuf, serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::CannotRead(p, e) => write!(f, "cannot read settings {:?}: {}", p, e),
            ConfigError::Invalid(p, e) => write!(f, "invalid settings {:?}: {}", p, e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Loads the configuration from the file specified by the `CONTENT_SETTINGS`
/// environment variable. If the file does not exist the default
/// configuration is returned.
pub fn load_configuration() -> Result<ContentConfiguration, ConfigError> {
    let path = std::env::var(SETTINGS_ENV).unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.into());
    load_configuration_from(Path::new(&path))
}

/// Loads the configuration from the specified file. If the file does not
/// exist the default configuration is returned.
pub fn load_configuration_from(path: &Path) -> Result<ContentConfiguration, ConfigError> {
    if !path.exists() {
        info!("Settings file {:?} not found, using defaults.", path);
        return Ok(ContentConfiguration::default());
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::CannotRead(path.to_path_buf(), e))?;

    serde_json::from_str(&text).map_err(|e| ConfigError::Invalid(path.to_path_buf(), e))
}
