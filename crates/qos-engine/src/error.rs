//! Engine error type.

use thiserror::Error;

use qos_catalog::CatalogError;
use qos_core::RecordError;
use qos_namespace::NamespaceError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("io error: {0}")]
    Io(String),

    #[error("unknown spec: {0}")]
    UnknownSpec(String),

    #[error("no satisfying placement for spec {0}")]
    Unsatisfiable(String),

    #[error("path already exists: {0}")]
    AlreadyExists(String),

    #[error("can't create directory {path}: {reason}")]
    DirectoryCreate { path: String, reason: String },
}
