//! Error types for shardmap

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Routing Errors ===
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Routing invariant violated: no range of collection {collection} covers hash {hash}")]
    RoutingInvariantViolation { collection: String, hash: i32 },

    // === Topology Errors ===
    #[error("Malformed topology: {0}")]
    MalformedTopology(String),

    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    // === Coordination Store Errors ===
    #[error("Coordination store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Should this be reported back to the client as a bad request?
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnknownCollection(_))
    }

    /// Is this a defect rather than an operational failure?
    ///
    /// Fatal errors must be surfaced, never retried or ignored.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::RoutingInvariantViolation { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedTopology(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
