pub mod errors;
pub mod id;
pub mod protocol;
pub mod types;

pub use errors::{ConfigError, RelayError, RoomError, StoreError, TandemError};
pub use id::{new_id, ConnectionId};
pub use protocol::{ClientEvent, HandshakePayload, ServerEvent};
pub use types::{ChatMessage, MessageKind, NewMessage, RoomId};

pub type Result<T> = std::result::Result<T, TandemError>;
