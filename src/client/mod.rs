pub mod quote_client;
pub mod reconnect;

pub use quote_client::{QuoteClient, QuoteClientConfig};
pub use reconnect::{ConnectionState, ReconnectPolicy, Reconnector};
