//! TOML configuration file lookup and loading.
//!
//! The config file lives in the platform-appropriate directory unless a path
//! is given explicitly with `--config`:
//!
//! - Linux:    `$XDG_CONFIG_HOME/pablet/config.toml` (or `~/.config/pablet/...`)
//! - Windows:  `%APPDATA%\Pablet\config.toml`
//! - macOS:    `~/Library/Application Support/Pablet/config.toml`
//!
//! A missing file at the default location is not an error: the client runs
//! with [`ClientConfig::default`].  A missing file that was named explicitly
//! is an error, since the user clearly expected it to be read.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::domain::ClientConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the client configuration.
///
/// With `explicit` set, that file must exist.  Otherwise the default location
/// is tried and defaults are used when nothing is there.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors and [`ConfigError::Parse`]
/// if the TOML is malformed.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    if let Some(path) = explicit {
        return read_config(path);
    }

    let path = match config_file_path() {
        Ok(path) => path,
        Err(e) => {
            debug!("{e}; using default configuration");
            return Ok(ClientConfig::default());
        }
    };

    match read_config(&path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config file at {}; using defaults", path.display());
            Ok(ClientConfig::default())
        }
        other => other,
    }
}

fn read_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded config from {}", path.display());
    Ok(cfg)
}

/// Resolves the platform config directory, including the `pablet` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Pablet"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Pablet")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pablet"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
