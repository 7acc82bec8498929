//! Listener and room admission settings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tandem_common::ConfigError;

/// Where the relay listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Valid range: 1024-65535.
    pub port: u32,
    /// Log a warning once a connection's outbound queue grows past this.
    pub outbox_warn_depth: u32,
    /// Hard bound on a connection's outbound queue (16-65536). A reader that
    /// falls this far behind is disconnected.
    pub outbox_capacity: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3001,
            outbox_warn_depth: 256,
            outbox_capacity: 1024,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Room identifier rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub id_pattern: String,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            id_pattern: r"^[A-Za-z0-9_\-]{1,64}$".into(),
        }
    }
}

impl RoomsConfig {
    pub fn compile_pattern(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.id_pattern).map_err(|e| {
            ConfigError::ValidationError(format!("rooms.id_pattern does not compile: {e}"))
        })
    }
}
