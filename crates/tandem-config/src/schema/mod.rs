//! Configuration schema types for Tandem.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod chat;
mod server;
mod store;
mod system;

pub use chat::*;
pub use server::*;
pub use store::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay and its clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct TandemConfig {
    pub server: ServerConfig,
    pub rooms: RoomsConfig,
    pub chat: ChatConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
