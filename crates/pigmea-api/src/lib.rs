// pigmea-api: async client for the shop backend (REST resources + push stream)

pub mod client;
pub mod error;
pub mod push;
pub mod transport;

pub use client::BackendClient;
pub use error::Error;
pub use push::{PushFrame, PushHandle, ReconnectConfig};
pub use transport::{TlsMode, TransportConfig, UserIdentity};
