use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while handling a single connection, talking to a gateway,
/// or reading startup parameters.
///
/// None of these ever stop the listener; they are caught per connection.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Client error: {0}")]
    Client(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that prevent the listener from starting.
///
/// A failed start leaves the process running without a listener; nothing is
/// spawned.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Address {addr} is already in use")]
    AddrInUse {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Listening sockets are not supported on this platform: {0}")]
    Unsupported(String),

    #[error("Failed to resolve bind host '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No bind addresses configured")]
    NoAddresses,

    #[error("Listener was stopped; create a new gateway to listen again")]
    AlreadyStopped,

    #[error("Failed to spawn listener worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl StartError {
    /// Classifies a bind failure for `addr`.
    pub fn from_bind(addr: SocketAddr, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::AddrInUse => StartError::AddrInUse { addr, source },
            std::io::ErrorKind::Unsupported => StartError::Unsupported(source.to_string()),
            _ => StartError::Bind { addr, source },
        }
    }
}

/// A failure reported by the host while running a script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    Script(String),

    #[error("host panicked: {0}")]
    Panicked(String),

    #[error("host failed to start: {0}")]
    Startup(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
