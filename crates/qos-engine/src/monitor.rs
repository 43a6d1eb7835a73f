//! Monitor — refresh container statuses and repair broken placements.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use qos_catalog::Catalog;
use qos_core::parse_status_record;
use qos_namespace::NamespaceClient;
use qos_placement::check_all;

use crate::error::EngineResult;
use crate::scheduler::{Scheduler, SpecSource};

/// Summary of one monitor pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub containers_checked: usize,
    pub containers_unreachable: usize,
    pub specs_rescheduled: usize,
}

/// Periodic reconciliation over the whole catalog.
///
/// Each pass re-reads every container's published status file, merges
/// it into the catalog (preserving the engine-owned reservation
/// counter), then re-verifies every spec against the fresh statuses
/// and reschedules the ones whose placement no longer satisfies them.
pub struct Monitor {
    catalog: Catalog,
    namespace: Arc<dyn NamespaceClient>,
    scheduler: Scheduler,
}

impl Monitor {
    pub fn new(
        catalog: Catalog,
        namespace: Arc<dyn NamespaceClient>,
        replication_cap: usize,
    ) -> Self {
        let scheduler = Scheduler::new(catalog.clone(), namespace.clone(), replication_cap);
        Self {
            catalog,
            namespace,
            scheduler,
        }
    }

    /// One full pass. A pass over a catalog whose placements all still
    /// hold changes nothing.
    pub fn monitor_all(&self) -> EngineResult<MonitorReport> {
        let mut report = MonitorReport::default();

        for container_id in self.catalog.list_container_ids()? {
            let Some(known) = self.catalog.get_status(&container_id)? else {
                continue;
            };
            report.containers_checked += 1;
            // A fetch or parse failure only affects this container;
            // the rest of the pass carries on with its stale status.
            match self.fetch_status(&known.status_path) {
                Ok(mut fresh) => {
                    // The published file never carries the reservation.
                    fresh.storage_reserved_mb = known.storage_reserved_mb;
                    self.catalog.upsert_container(&fresh, false)?;
                    debug!(container = %container_id, "status refreshed");
                }
                Err(e) => {
                    warn!(container = %container_id, error = %e, "status refresh failed");
                    report.containers_unreachable += 1;
                }
            }
        }

        for spec in self.catalog.list_specs()? {
            let bound = self.catalog.containers_for(&spec.spec_id)?;
            let mut statuses = Vec::with_capacity(bound.len());
            for id in &bound {
                if let Some(status) = self.catalog.get_status(id)? {
                    statuses.push(status);
                }
            }
            // A missing binding member counts as a violation; an
            // unbound spec keeps retrying until a placement exists.
            let holds = statuses.len() == bound.len()
                && !bound.is_empty()
                && check_all(&spec, &statuses).satisfied();
            if !holds {
                info!(spec = %spec.spec_id, "placement violated, rescheduling");
                self.scheduler
                    .schedule(&SpecSource::Id(spec.spec_id.clone()))?;
                report.specs_rescheduled += 1;
            }
        }

        info!(
            checked = report.containers_checked,
            unreachable = report.containers_unreachable,
            rescheduled = report.specs_rescheduled,
            "monitor pass complete"
        );
        Ok(report)
    }

    fn fetch_status(&self, status_path: &str) -> EngineResult<qos_core::ContainerStatus> {
        let text = self.namespace.read_to_string(status_path)?;
        Ok(parse_status_record(&text, status_path)?)
    }

    /// Run passes forever at a fixed interval.
    pub fn run(&self, interval: Duration) -> EngineResult<()> {
        loop {
            self.monitor_all()?;
            std::thread::sleep(interval);
        }
    }
}
