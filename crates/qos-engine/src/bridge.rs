//! Namespace bridge — mkdir with QoS-placed backing resources.
//!
//! A plain grid mkdir creates a directory node wherever the parent's
//! service puts it. With a QoS spec (or an explicit RNS service path),
//! the new directory's backing resource is created on a scheduled
//! container's directory service and then linked into the namespace at
//! the requested path.

use std::sync::Arc;

use tracing::{debug, info, warn};

use qos_namespace::{GridPath, NamespaceClient, PathKind};

use crate::error::{EngineError, EngineResult};
use crate::scheduler::{Scheduler, SpecSource};

/// The directory service resource type published by containers.
const RNS_SERVICE_SUFFIX: &str = "Services/EnhancedRNSPortType";

/// Options for a batch of directory creations.
#[derive(Debug, Clone)]
pub struct MkdirRequest {
    /// Create missing intermediate directories.
    pub parents: bool,
    /// Explicit directory service to create resources on.
    pub rns_service: Option<String>,
    /// Spec record files to schedule; the first placement's primary
    /// container hosts the new directories.
    pub specs: Vec<String>,
    /// QoS manager host the request is attributed to.
    pub qos_server: String,
}

impl Default for MkdirRequest {
    fn default() -> Self {
        Self {
            parents: false,
            rns_service: None,
            specs: Vec::new(),
            qos_server: "localhost".to_string(),
        }
    }
}

/// Creates directories across the local filesystem and the grid
/// namespace, scheduling specs when asked to.
pub struct DirectoryBridge {
    scheduler: Scheduler,
    namespace: Arc<dyn NamespaceClient>,
}

impl DirectoryBridge {
    pub fn new(scheduler: Scheduler, namespace: Arc<dyn NamespaceClient>) -> Self {
        Self {
            scheduler,
            namespace,
        }
    }

    /// Create every path in `paths`, failing on the first error.
    pub fn make_directories(&self, request: &MkdirRequest, paths: &[String]) -> EngineResult<()> {
        let service = self.resolve_service(request)?;
        for raw in paths {
            let parsed = GridPath::parse(raw);
            match parsed.kind() {
                PathKind::Local => self.make_local(request, raw, parsed.path())?,
                PathKind::Grid => self.make_grid(request, raw, &parsed, service.as_deref())?,
            }
            info!(path = %raw, "directory created");
        }
        Ok(())
    }

    /// The directory service new resources are created on, if any.
    ///
    /// An explicit `--rns-service` wins; otherwise the specs are
    /// scheduled and the first placement's primary container provides
    /// the service.
    fn resolve_service(&self, request: &MkdirRequest) -> EngineResult<Option<String>> {
        if let Some(service) = &request.rns_service {
            let base = GridPath::parse(service).path().trim_end_matches('/').to_string();
            // Conventionally the directory service hangs under the
            // container's Services node; descend if it is there.
            let conventional = format!("{base}/{RNS_SERVICE_SUFFIX}");
            return if self.namespace.exists(&conventional)? {
                Ok(Some(conventional))
            } else {
                Ok(Some(base))
            };
        }
        if request.specs.is_empty() {
            return Ok(None);
        }
        debug!(server = %request.qos_server, specs = ?request.specs, "scheduling mkdir specs");
        let mut primary_service = None;
        for spec_path in &request.specs {
            let placement = self.scheduler.schedule(&SpecSource::Path(spec_path.clone()))?;
            let Some(primary) = placement.container_ids.first() else {
                return Err(EngineError::Unsatisfiable(spec_path.clone()));
            };
            if primary_service.is_none() {
                let status = self.scheduler.catalog().get_status(primary)?.ok_or_else(|| {
                    qos_catalog::CatalogError::UnknownContainer(primary.clone())
                })?;
                primary_service = Some(format!(
                    "{}/{}",
                    status.network_address.trim_end_matches('/'),
                    RNS_SERVICE_SUFFIX
                ));
            }
        }
        Ok(primary_service)
    }

    fn make_local(&self, request: &MkdirRequest, raw: &str, path: &str) -> EngineResult<()> {
        let result = if request.parents {
            std::fs::create_dir_all(path)
        } else {
            std::fs::create_dir(path)
        };
        result.map_err(|e| EngineError::DirectoryCreate {
            path: raw.to_string(),
            reason: e.to_string(),
        })
    }

    fn make_grid(
        &self,
        request: &MkdirRequest,
        raw: &str,
        parsed: &GridPath,
        service: Option<&str>,
    ) -> EngineResult<()> {
        if self.namespace.exists(raw)? {
            return Err(EngineError::AlreadyExists(raw.to_string()));
        }
        let Some(service) = service else {
            return if request.parents {
                Ok(self.namespace.mkdir_parents(raw)?)
            } else {
                Ok(self.namespace.mkdir(raw)?)
            };
        };

        if request.parents {
            if let Some(parent) = parsed.parent() {
                if !self.namespace.exists(&parent)? {
                    self.namespace.mkdir_parents(&parent)?;
                }
            }
        }

        // Create the resource on the chosen service, then link it in.
        // A failed link leaves an orphan resource, so destroy it.
        let endpoint = self.namespace.resolve(service)?;
        let resource = self.namespace.create_resource(&endpoint)?;
        if let Err(e) = self.namespace.link(raw, &resource) {
            warn!(path = %raw, resource = %resource.address, "link failed, destroying resource");
            if let Err(destroy_err) = self.namespace.destroy(&resource) {
                warn!(resource = %resource.address, error = %destroy_err, "orphan cleanup failed");
            }
            return Err(EngineError::DirectoryCreate {
                path: raw.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qos_catalog::Catalog;
    use qos_core::types::ContainerStatus;
    use qos_namespace::InMemoryNamespace;

    fn bridge_with(containers: &[ContainerStatus]) -> (DirectoryBridge, Arc<InMemoryNamespace>, Catalog) {
        let catalog = Catalog::open_in_memory().unwrap();
        for c in containers {
            catalog.upsert_container(c, true).unwrap();
        }
        let namespace = Arc::new(InMemoryNamespace::new());
        let scheduler = Scheduler::new(catalog.clone(), namespace.clone(), 4);
        (
            DirectoryBridge::new(scheduler, namespace.clone()),
            namespace,
            catalog,
        )
    }

    fn container(id: &str) -> ContainerStatus {
        ContainerStatus {
            container_id: id.to_string(),
            storage_total_mb: 1000,
            data_integrity: 500_000,
            reliability_ppm: 990_000,
            availability_ppm: 990_000,
            cost_per_gb_month: 0.10,
            network_address: format!("/containers/{id}"),
            status_path: format!("/status/{id}"),
            ..ContainerStatus::default()
        }
    }

    const SPEC_TOML: &str = r#"
spec_id = "dir-spec"
availability = 0.99
reserved_size_mb = 100
"#;

    #[test]
    fn plain_grid_mkdir() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");

        bridge
            .make_directories(&MkdirRequest::default(), &["/home/demo".to_string()])
            .unwrap();
        assert!(namespace.has_dir("/home/demo"));
    }

    #[test]
    fn missing_parent_without_parents_flag_fails() {
        let (bridge, _, _) = bridge_with(&[]);
        let err = bridge.make_directories(&MkdirRequest::default(), &["/a/b/c".to_string()]);
        assert!(err.is_err());
    }

    #[test]
    fn parents_flag_creates_intermediates() {
        let (bridge, namespace, _) = bridge_with(&[]);
        let request = MkdirRequest {
            parents: true,
            ..MkdirRequest::default()
        };
        bridge
            .make_directories(&request, &["/a/b/c".to_string()])
            .unwrap();
        assert!(namespace.has_dir("/a"));
        assert!(namespace.has_dir("/a/b"));
        assert!(namespace.has_dir("/a/b/c"));
    }

    #[test]
    fn existing_path_is_rejected() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");
        namespace.put_dir("/home/demo");

        let err = bridge.make_directories(&MkdirRequest::default(), &["/home/demo".to_string()]);
        assert!(matches!(err, Err(EngineError::AlreadyExists(_))));
    }

    #[test]
    fn explicit_rns_service_hosts_the_directory() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");
        namespace.put_service("/Services/RNS");

        let request = MkdirRequest {
            rns_service: Some("/Services/RNS".to_string()),
            ..MkdirRequest::default()
        };
        bridge
            .make_directories(&request, &["/home/demo".to_string()])
            .unwrap();

        let links = namespace.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, "/home/demo");
        assert!(links[0].1.starts_with("/Services/RNS#resource-"));
    }

    #[test]
    fn rns_service_descends_into_conventional_subpath() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");
        namespace.put_service("/containers/c9/Services/EnhancedRNSPortType");

        let request = MkdirRequest {
            rns_service: Some("/containers/c9".to_string()),
            ..MkdirRequest::default()
        };
        bridge
            .make_directories(&request, &["/home/demo".to_string()])
            .unwrap();

        let links = namespace.links();
        assert!(
            links[0]
                .1
                .starts_with("/containers/c9/Services/EnhancedRNSPortType#resource-")
        );
    }

    #[test]
    fn spec_driven_mkdir_links_to_primary_container_service() {
        let (bridge, namespace, catalog) = bridge_with(&[container("c1")]);
        namespace.put_dir("/home");
        namespace.put_file("/specs/dir-spec", SPEC_TOML);
        namespace.put_service("/containers/c1/Services/EnhancedRNSPortType");

        let request = MkdirRequest {
            specs: vec!["/specs/dir-spec".to_string()],
            ..MkdirRequest::default()
        };
        bridge
            .make_directories(&request, &["/home/qdir".to_string()])
            .unwrap();

        let links = namespace.links();
        assert_eq!(links.len(), 1);
        assert!(
            links[0]
                .1
                .starts_with("/containers/c1/Services/EnhancedRNSPortType#resource-")
        );
        // The spec got scheduled as a side effect.
        assert_eq!(catalog.containers_for("dir-spec").unwrap(), vec!["c1".to_string()]);
    }

    #[test]
    fn unsatisfiable_spec_fails_the_mkdir() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");
        namespace.put_file("/specs/dir-spec", SPEC_TOML);

        let request = MkdirRequest {
            specs: vec!["/specs/dir-spec".to_string()],
            ..MkdirRequest::default()
        };
        let err = bridge.make_directories(&request, &["/home/qdir".to_string()]);
        assert!(matches!(err, Err(EngineError::Unsatisfiable(_))));
    }

    #[test]
    fn failed_link_destroys_the_orphan_resource() {
        let (bridge, namespace, _) = bridge_with(&[]);
        namespace.put_dir("/home");
        namespace.put_service("/Services/RNS");
        namespace.set_fail_link(true);

        let request = MkdirRequest {
            rns_service: Some("/Services/RNS".to_string()),
            ..MkdirRequest::default()
        };
        let err = bridge.make_directories(&request, &["/home/demo".to_string()]);

        assert!(matches!(err, Err(EngineError::DirectoryCreate { .. })));
        let destroyed = namespace.destroyed();
        assert_eq!(destroyed.len(), 1);
        assert!(destroyed[0].starts_with("/Services/RNS#resource-"));
    }

    #[test]
    fn local_paths_use_the_filesystem() {
        let (bridge, _, _) = bridge_with(&[]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("made/here");

        let request = MkdirRequest {
            parents: true,
            ..MkdirRequest::default()
        };
        bridge
            .make_directories(&request, &[format!("local:{}", target.display())])
            .unwrap();
        assert!(target.is_dir());
    }
}
