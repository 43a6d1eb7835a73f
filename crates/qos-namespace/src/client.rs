//! The `NamespaceClient` capability.

use thiserror::Error;

/// Result type alias for namespace operations.
pub type NamespaceResult<T> = Result<T, NamespaceError>;

/// Errors surfaced by a namespace client.
///
/// Remote failures (including timeouts inside an implementation) all
/// surface as `Io`; the engine treats any fetch error as "container
/// unavailable" and recovers locally.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("path already exists: {0}")]
    AlreadyExists(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("operation not supported by this client: {0}")]
    Unsupported(String),
}

/// A resolved service or resource endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
}

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// The grid namespace operations the engine consumes.
///
/// Implementations are expected to apply their own bounded timeouts to
/// remote operations and surface expiry as [`NamespaceError::Io`].
pub trait NamespaceClient {
    /// Resolve a logical path to a service endpoint.
    fn resolve(&self, path: &str) -> NamespaceResult<Endpoint>;

    /// Whether a node exists at the path.
    fn exists(&self, path: &str) -> NamespaceResult<bool>;

    /// Read a remote file completely into a string.
    fn read_to_string(&self, path: &str) -> NamespaceResult<String>;

    /// Create a directory node; the parent must exist.
    fn mkdir(&self, path: &str) -> NamespaceResult<()>;

    /// Create a directory node and any missing intermediates.
    fn mkdir_parents(&self, path: &str) -> NamespaceResult<()>;

    /// Ask a directory service to create a fresh resource.
    fn create_resource(&self, service: &Endpoint) -> NamespaceResult<Endpoint>;

    /// Link a resource endpoint into the namespace at `path`.
    fn link(&self, path: &str, endpoint: &Endpoint) -> NamespaceResult<()>;

    /// Destroy a resource (cleanup of an orphan after a failed link).
    fn destroy(&self, endpoint: &Endpoint) -> NamespaceResult<()>;

    /// Whether the endpoint is a directory node.
    fn is_directory(&self, endpoint: &Endpoint) -> NamespaceResult<bool>;
}
