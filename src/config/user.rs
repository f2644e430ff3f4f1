//! User configuration loading for treaty-ls.
//!
//! User config location: $XDG_CONFIG_HOME/treaty-ls/treaty-ls.toml
//! Fallback: the platform config directory from `dirs::config_dir()`.

use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use super::CONFIG_FILE_NAME;
use super::settings::TreatySettings;

const CONFIG_DIR_NAME: &str = "treaty-ls";

#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Returns the path to the user configuration file.
///
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/treaty-ls/treaty-ls.toml
/// 2. Otherwise: `dirs::config_dir()`/treaty-ls/treaty-ls.toml
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(
            PathBuf::from(xdg_config)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load the user configuration file.
///
/// Returns `Ok(None)` when no user config exists.
pub fn load_user_config() -> UserConfigResult<Option<TreatySettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path).map_err(|source| UserConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str::<TreatySettings>(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse { path, source })
}
