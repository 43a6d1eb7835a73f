//! Filesystem-backed namespace client.
//!
//! Lets the CLI work against local spec/status files and local mkdir
//! targets without a grid deployment. Paths are interpreted relative to
//! the process; `local:` prefixes are stripped. Resource creation and
//! linking need a directory service and are unsupported here.

use std::path::Path;

use tracing::debug;

use crate::client::{Endpoint, NamespaceClient, NamespaceError, NamespaceResult};
use crate::path::GridPath;

/// A [`NamespaceClient`] over the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct LocalNamespace;

impl LocalNamespace {
    pub fn new() -> Self {
        Self
    }

    fn os_path(path: &str) -> String {
        GridPath::parse(path).path().to_string()
    }
}

fn io_err(path: &str, e: std::io::Error) -> NamespaceError {
    if e.kind() == std::io::ErrorKind::NotFound {
        NamespaceError::NotFound(path.to_string())
    } else {
        NamespaceError::Io(format!("{path}: {e}"))
    }
}

impl NamespaceClient for LocalNamespace {
    fn resolve(&self, path: &str) -> NamespaceResult<Endpoint> {
        let os = Self::os_path(path);
        if Path::new(&os).exists() {
            Ok(Endpoint::new(os))
        } else {
            Err(NamespaceError::NotFound(path.to_string()))
        }
    }

    fn exists(&self, path: &str) -> NamespaceResult<bool> {
        Ok(Path::new(&Self::os_path(path)).exists())
    }

    fn read_to_string(&self, path: &str) -> NamespaceResult<String> {
        let os = Self::os_path(path);
        debug!(%path, "reading local file");
        std::fs::read_to_string(&os).map_err(|e| io_err(path, e))
    }

    fn mkdir(&self, path: &str) -> NamespaceResult<()> {
        let os = Self::os_path(path);
        std::fs::create_dir(&os).map_err(|e| io_err(path, e))
    }

    fn mkdir_parents(&self, path: &str) -> NamespaceResult<()> {
        let os = Self::os_path(path);
        std::fs::create_dir_all(&os).map_err(|e| io_err(path, e))
    }

    fn create_resource(&self, service: &Endpoint) -> NamespaceResult<Endpoint> {
        Err(NamespaceError::Unsupported(format!(
            "create_resource on {}",
            service.address
        )))
    }

    fn link(&self, path: &str, _endpoint: &Endpoint) -> NamespaceResult<()> {
        Err(NamespaceError::Unsupported(format!("link into {path}")))
    }

    fn destroy(&self, endpoint: &Endpoint) -> NamespaceResult<()> {
        Err(NamespaceError::Unsupported(format!(
            "destroy {}",
            endpoint.address
        )))
    }

    fn is_directory(&self, endpoint: &Endpoint) -> NamespaceResult<bool> {
        Ok(Path::new(&endpoint.address).is_dir())
    }
}
