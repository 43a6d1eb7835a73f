//! Error types for the catalog.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
///
/// All of these are treated as fatal by the command layer; the engine
/// never recovers from a broken catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to open catalog: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("binding references unknown container: {0}")]
    UnknownContainer(String),
}
