//! Core TOML config loading: read from path or platform default.

use crate::schema::TandemConfig;
use crate::validation;
use std::path::Path;
use tandem_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take serde defaults. Validation failures are logged and
/// the parsed config is returned as-is.
pub fn load_from_path(path: &Path) -> Result<TandemConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
        }
    })?;

    let config: TandemConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e} (using parsed config)");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/tandem/config.toml`
///
/// If the file does not exist, writes a commented default and returns defaults.
pub fn load_default() -> Result<TandemConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(TandemConfig::default())
        }
        Err(e) => Err(e),
    }
}
