pub mod api;
pub mod config;
pub mod restore;
pub mod sync;
pub mod transport;

pub use api::{ApiError, HttpApi, PokerApi};
pub use config::Config;
pub use restore::{RestoreOutcome, SessionRestore};
pub use sync::{SyncError, SyncService};
pub use transport::{
    ConnectionState, Connector, ConnectorChannel, SubscriberId, TransportError, TransportEvent,
    TransportSession, WsConnector,
};
