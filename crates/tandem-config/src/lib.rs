//! Tandem configuration system.
//!
//! TOML-based configuration with full validation. All sections use
//! sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tandem_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("listening on {}", config.server.bind_addr());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ChatConfig, LogLevel, LoggingConfig, RoomsConfig, ServerConfig, StoreBackend, StoreConfig,
    TandemConfig,
};

use std::path::Path;

use tandem_common::ConfigError;

/// Load config from `path`, or from the platform default path when `None`.
///
/// Range problems are logged by the loader and tolerated; a room pattern
/// that does not compile is fatal because the relay cannot admit anyone
/// without it.
pub fn load_config(path: Option<&Path>) -> Result<TandemConfig, ConfigError> {
    let config = match path {
        Some(p) => toml_loader::load_from_path(p)?,
        None => toml_loader::load_default()?,
    };
    config.rooms.compile_pattern()?;
    Ok(config)
}
