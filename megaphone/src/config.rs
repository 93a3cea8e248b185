//! Supervisor configuration and config file discovery

use std::path::{Path, PathBuf};

use megaphone_delivery::{BroadcastConfig, ReconcilerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "MEGAPHONE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("MEGAPHONE_CONFIG points to non-existent file: {}", .0.display())]
    MissingEnvPath(PathBuf),

    #[error("No configuration file found. Tried:\n  - MEGAPHONE_CONFIG environment variable\n{0}")]
    NotFound(String),
}

/// Top-level configuration document
///
/// ```ron
/// (
///     broadcast: (
///         chat_batch_size: 50,
///         max_rate_limit_wait_secs: Some(300),
///         secondary_identities: [1, 2],
///     ),
///     reconciler: (interval_secs: 10),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MegaphoneConfig {
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl MegaphoneConfig {
    /// Parse a RON config document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid RON or has
    /// fields of the wrong type.
    pub fn from_ron(document: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(document)?)
    }

    /// Read and parse the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_ron(&document)
    }
}

/// The default config locations, in precedence order
#[must_use]
pub fn default_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./megaphone.config.ron"),
        PathBuf::from("/etc/megaphone/megaphone.config.ron"),
    ]
}

/// Find the configuration file using the following precedence:
/// 1. `MEGAPHONE_CONFIG` environment variable
/// 2. ./megaphone.config.ron (current working directory)
/// 3. /etc/megaphone/megaphone.config.ron (system-wide config)
///
/// # Errors
///
/// Returns an error if the environment variable names a missing file, or if
/// none of the default locations exist.
pub fn find_config_file() -> Result<PathBuf, ConfigError> {
    find_config_file_from(
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        &default_paths(),
    )
}

/// [`find_config_file`] with the environment value and default locations
/// supplied by the caller.
///
/// # Errors
///
/// See [`find_config_file`].
pub fn find_config_file_from(
    env_path: Option<PathBuf>,
    defaults: &[PathBuf],
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = env_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::MissingEnvPath(path));
    }

    if let Some(path) = defaults.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = defaults
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::NotFound(paths_tried))
}
