//! Listener and shared per-server state.

use std::sync::Arc;

use tandem_common::ConfigError;
use tandem_config::{ChatConfig, TandemConfig};
use tandem_store::MessageStore;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::coordinator::RoomCoordinator;

/// Everything a connection handler needs. Cheap to clone.
#[derive(Clone)]
pub struct ServerContext {
    pub coordinator: RoomCoordinator,
    pub chat: ChatConfig,
    pub outbox_warn_depth: usize,
    pub outbox_capacity: usize,
}

impl ServerContext {
    pub fn new(store: Arc<dyn MessageStore>, config: &TandemConfig) -> Result<Self, ConfigError> {
        let pattern = config.rooms.compile_pattern()?;
        Ok(Self {
            coordinator: RoomCoordinator::new(store, pattern),
            chat: config.chat.clone(),
            outbox_warn_depth: config.server.outbox_warn_depth as usize,
            outbox_capacity: config.server.outbox_capacity as usize,
        })
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        self.coordinator.store()
    }
}

/// Accept WebSocket clients on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, ctx: ServerContext) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "tandem-relay listening");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, ctx).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
