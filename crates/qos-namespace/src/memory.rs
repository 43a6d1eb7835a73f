//! In-memory namespace for tests.
//!
//! Holds files, directory nodes, and directory services in maps, with
//! knobs to simulate remote failures (unreachable files, failing
//! links). Used across the workspace to exercise the scheduler, the
//! monitor, and the mkdir bridge without a grid deployment.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::client::{Endpoint, NamespaceClient, NamespaceError, NamespaceResult};
use crate::path::GridPath;

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    services: BTreeSet<String>,
    links: BTreeMap<String, String>,
    unreachable: BTreeSet<String>,
    destroyed: Vec<String>,
    fail_link: bool,
    next_resource: u32,
}

/// A [`NamespaceClient`] test double.
#[derive(Debug, Default)]
pub struct InMemoryNamespace {
    inner: Mutex<Inner>,
}

impl InMemoryNamespace {
    pub fn new() -> Self {
        let ns = Self::default();
        ns.inner.lock().unwrap().dirs.insert("/".to_string());
        ns
    }

    pub fn put_file(&self, path: &str, content: &str) {
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_string());
    }

    pub fn put_dir(&self, path: &str) {
        self.inner.lock().unwrap().dirs.insert(path.to_string());
    }

    /// Register a directory service able to create resources.
    pub fn put_service(&self, path: &str) {
        self.inner.lock().unwrap().services.insert(path.to_string());
    }

    /// Make subsequent reads of `path` fail with an I/O error.
    pub fn mark_unreachable(&self, path: &str) {
        self.inner
            .lock()
            .unwrap()
            .unreachable
            .insert(path.to_string());
    }

    pub fn clear_unreachable(&self, path: &str) {
        self.inner.lock().unwrap().unreachable.remove(path);
    }

    /// Make every subsequent `link` fail (orphan-cleanup tests).
    pub fn set_fail_link(&self, fail: bool) {
        self.inner.lock().unwrap().fail_link = fail;
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    /// `(path → linked endpoint address)` pairs recorded so far.
    pub fn links(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .unwrap()
            .links
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Addresses of destroyed resources, in destruction order.
    pub fn destroyed(&self) -> Vec<String> {
        self.inner.lock().unwrap().destroyed.clone()
    }
}

impl NamespaceClient for InMemoryNamespace {
    fn resolve(&self, path: &str) -> NamespaceResult<Endpoint> {
        let key = GridPath::parse(path).path().to_string();
        let inner = self.inner.lock().unwrap();
        if inner.services.contains(&key) || inner.dirs.contains(&key) || inner.files.contains_key(&key)
        {
            Ok(Endpoint::new(key))
        } else {
            Err(NamespaceError::NotFound(path.to_string()))
        }
    }

    fn exists(&self, path: &str) -> NamespaceResult<bool> {
        let key = GridPath::parse(path).path().to_string();
        let inner = self.inner.lock().unwrap();
        Ok(inner.dirs.contains(&key)
            || inner.files.contains_key(&key)
            || inner.services.contains(&key)
            || inner.links.contains_key(&key))
    }

    fn read_to_string(&self, path: &str) -> NamespaceResult<String> {
        let key = GridPath::parse(path).path().to_string();
        let inner = self.inner.lock().unwrap();
        if inner.unreachable.contains(&key) {
            return Err(NamespaceError::Io(format!("{path}: unreachable")));
        }
        inner
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| NamespaceError::NotFound(path.to_string()))
    }

    fn mkdir(&self, path: &str) -> NamespaceResult<()> {
        let parsed = GridPath::parse(path);
        let key = parsed.path().to_string();
        let mut inner = self.inner.lock().unwrap();
        if inner.dirs.contains(&key) {
            return Err(NamespaceError::AlreadyExists(path.to_string()));
        }
        match parsed.parent() {
            Some(parent) if inner.dirs.contains(&parent) => {
                inner.dirs.insert(key);
                Ok(())
            }
            _ => Err(NamespaceError::NotFound(format!("parent of {path}"))),
        }
    }

    fn mkdir_parents(&self, path: &str) -> NamespaceResult<()> {
        let key = GridPath::parse(path).path().to_string();
        let mut inner = self.inner.lock().unwrap();
        let mut node = key.clone();
        let mut chain = vec![key];
        while let Some(parent) = GridPath::parse(&node).parent() {
            chain.push(parent.clone());
            node = parent;
        }
        for dir in chain.into_iter().rev() {
            inner.dirs.insert(dir);
        }
        Ok(())
    }

    fn create_resource(&self, service: &Endpoint) -> NamespaceResult<Endpoint> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.services.contains(&service.address) {
            return Err(NamespaceError::Unsupported(format!(
                "{} is not a directory service",
                service.address
            )));
        }
        inner.next_resource += 1;
        Ok(Endpoint::new(format!(
            "{}#resource-{}",
            service.address, inner.next_resource
        )))
    }

    fn link(&self, path: &str, endpoint: &Endpoint) -> NamespaceResult<()> {
        let key = GridPath::parse(path).path().to_string();
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_link {
            return Err(NamespaceError::Io(format!("link {path}: injected failure")));
        }
        inner.links.insert(key, endpoint.address.clone());
        Ok(())
    }

    fn destroy(&self, endpoint: &Endpoint) -> NamespaceResult<()> {
        self.inner
            .lock()
            .unwrap()
            .destroyed
            .push(endpoint.address.clone());
        Ok(())
    }

    fn is_directory(&self, endpoint: &Endpoint) -> NamespaceResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.dirs.contains(&endpoint.address) || inner.services.contains(&endpoint.address))
    }
}
