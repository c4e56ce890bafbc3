//! Server errors.

use thiserror::Error;

use ebbtide_core::ConfigError;
use ebbtide_store::StoreError;

/// Server result type.
pub type ServerResult<T> = Result<T, ServerError>;

/// Server error.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Datastore error.
    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed listen address.
    #[error("Invalid listen address: {0}")]
    Addr(#[from] std::net::AddrParseError),

    /// Configuration selected a database backend we do not have.
    #[error("Unknown database type: {0}")]
    UnknownDbType(String),

    /// Configuration selected a protocol we do not have.
    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    /// The configuration registered nothing to serve.
    #[error("No TAXII services defined")]
    NoServices,
}
