//! Scheduler — resolve a spec, pick a container set, persist the
//! binding.

use std::sync::Arc;

use tracing::{debug, info, warn};

use qos_catalog::Catalog;
use qos_core::{ContainerId, ContainerStatus, QosSpec, parse_spec_record};
use qos_namespace::{GridPath, NamespaceClient, PathKind};
use qos_placement::{estimated_monthly_cost, filter_candidates, find_satisfying};

use crate::error::{EngineError, EngineResult};

/// Where a spec to schedule comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    /// A spec record file, `local:` or grid path.
    Path(String),
    /// A spec already stored in the catalog.
    Id(String),
}

/// The outcome of scheduling one spec.
///
/// An empty `container_ids` means the spec was recorded but no
/// satisfying container set exists right now; the monitor retries on
/// every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Bound containers, primary first.
    pub container_ids: Vec<ContainerId>,
    /// `(Σ cost_per_gb_month) × reserved_size_mb / 1024`.
    pub estimated_monthly_cost: f64,
}

impl Placement {
    pub fn is_empty(&self) -> bool {
        self.container_ids.is_empty()
    }
}

/// Schedules specs against the catalog's container fleet.
#[derive(Clone)]
pub struct Scheduler {
    catalog: Catalog,
    namespace: Arc<dyn NamespaceClient>,
    replication_cap: usize,
}

impl Scheduler {
    pub fn new(
        catalog: Catalog,
        namespace: Arc<dyn NamespaceClient>,
        replication_cap: usize,
    ) -> Self {
        Self {
            catalog,
            namespace,
            replication_cap,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve the spec, search for a satisfying container set of
    /// cardinality 1..=cap, and persist spec plus binding atomically.
    ///
    /// An unsatisfiable spec is not an error: it is stored with an
    /// empty binding and logged, so the monitor keeps retrying it.
    pub fn schedule(&self, source: &SpecSource) -> EngineResult<Placement> {
        let spec = match self.resolve_spec(source) {
            Ok(spec) => spec,
            // Catalog failures are fatal; anything that just means "no
            // usable spec" (unknown id, missing file, parse failure)
            // schedules nothing.
            Err(e @ EngineError::Catalog(_)) => return Err(e),
            Err(e) => {
                warn!(source = ?source, error = %e, "spec unresolvable, nothing scheduled");
                return Ok(Placement {
                    container_ids: Vec::new(),
                    estimated_monthly_cost: 0.0,
                });
            }
        };
        let is_new = self.catalog.get_spec(&spec.spec_id)?.is_none();

        let fleet = self.catalog.list_containers()?;
        let candidates = filter_candidates(&spec, fleet);
        debug!(
            spec = %spec.spec_id,
            candidates = candidates.len(),
            "filtered candidate fleet"
        );

        match find_satisfying(&spec, &candidates, self.replication_cap) {
            Some(indices) => {
                let chosen: Vec<ContainerStatus> =
                    indices.iter().map(|&i| candidates[i].clone()).collect();
                let container_ids: Vec<ContainerId> =
                    chosen.iter().map(|s| s.container_id.clone()).collect();
                let cost = estimated_monthly_cost(&spec, &chosen);
                self.catalog.add_scheduled(&spec, &container_ids, is_new)?;
                info!(
                    spec = %spec.spec_id,
                    containers = ?container_ids,
                    cost_per_month = cost,
                    "spec scheduled"
                );
                Ok(Placement {
                    container_ids,
                    estimated_monthly_cost: cost,
                })
            }
            None => {
                warn!(spec = %spec.spec_id, "no satisfying container set, spec left unbound");
                self.catalog.add_scheduled(&spec, &[], is_new)?;
                Ok(Placement {
                    container_ids: Vec::new(),
                    estimated_monthly_cost: 0.0,
                })
            }
        }
    }

    fn resolve_spec(&self, source: &SpecSource) -> EngineResult<QosSpec> {
        match source {
            SpecSource::Path(raw) => {
                let parsed = GridPath::parse(raw);
                let text = match parsed.kind() {
                    PathKind::Local => std::fs::read_to_string(parsed.path())
                        .map_err(|e| EngineError::Io(format!("{raw}: {e}")))?,
                    PathKind::Grid => self.namespace.read_to_string(raw)?,
                };
                Ok(parse_spec_record(&text, raw)?)
            }
            SpecSource::Id(id) => self
                .catalog
                .get_spec(id)?
                .ok_or_else(|| EngineError::UnknownSpec(id.clone())),
        }
    }
}
