//! Error types for stpsim

use thiserror::Error;

/// Result type alias for stpsim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stpsim
///
/// Every variant is raised synchronously by the operation that detected it and
/// is never retried by the simulator.
#[derive(Error, Debug)]
pub enum Error {
    /// Device or interface name already used in its scope
    #[error("Name already in use: {0}")]
    NameCollision(String),

    /// Device or interface reference unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or non-unicast MAC, malformed IPv4, or address overflow
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Interface connected to itself
    #[error("Cannot connect interface {0} to itself")]
    SelfConnect(String),

    /// One side of the link is already connected
    #[error("Interface {0} is already connected")]
    AlreadyConnected(String),

    /// Both sides do not belong to the same network
    #[error("Interfaces belong to different networks: {0}")]
    CrossNetwork(String),

    /// Disconnecting an interface that has no (matching) peer
    #[error("Interface {0} is not connected")]
    NotConnected(String),

    /// Clock started twice or stopped twice
    #[error("Clock state error: {0}")]
    ClockState(String),

    /// Speed multiplier must be finite and strictly positive
    #[error("Invalid clock speed: {0}")]
    InvalidSpeed(f64),

    /// Malformed save file
    #[error("Invalid persisted data: {0}")]
    InvalidPersistedData(String),

    /// Packet parsing error (truncated buffer, bad value)
    #[error("Packet parsing error: {0}")]
    PacketParsing(String),

    /// Packet construction error (missing or mistyped field)
    #[error("Packet construction error: {0}")]
    PacketConstruction(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a not-found error with a custom message
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create an invalid-address error with a custom message
    pub fn invalid_address<S: Into<String>>(msg: S) -> Self {
        Error::InvalidAddress(msg.into())
    }

    /// Create a packet parsing error with a custom message
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        Error::PacketParsing(msg.into())
    }

    /// Create a packet construction error with a custom message
    pub fn construction<S: Into<String>>(msg: S) -> Self {
        Error::PacketConstruction(msg.into())
    }

    /// Create an invalid persisted data error with a custom message
    pub fn persisted<S: Into<String>>(msg: S) -> Self {
        Error::InvalidPersistedData(msg.into())
    }

    /// True for the link-level errors (self, already connected, cross-network, not connected)
    pub fn is_topology(&self) -> bool {
        matches!(
            self,
            Error::SelfConnect(_)
                | Error::AlreadyConnected(_)
                | Error::CrossNetwork(_)
                | Error::NotConnected(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidPersistedData(err.to_string())
    }
}
