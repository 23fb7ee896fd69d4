pub mod session;
pub mod ws;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use poker_types::{ClientEvent, Identity, ServerEvent};

pub use session::{ConnectionState, SubscriberId, TransportEvent, TransportSession};
pub use ws::WsConnector;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect without an identity")]
    MissingIdentity,
    #[error("connection failed: {0}")]
    ConnectFailed(String),
}

/// The two halves of an open push connection, already decoded to typed
/// events. Dropping the inbound sender on the far side is how a
/// connector signals that the connection died.
pub struct ConnectorChannel {
    pub outbound: UnboundedSender<ClientEvent>,
    pub inbound: UnboundedReceiver<ServerEvent>,
}

/// Opens push connections. [`WsConnector`] is the real one; tests plug
/// in channel-backed fakes.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, identity: &Identity) -> Result<ConnectorChannel, TransportError>;
}
