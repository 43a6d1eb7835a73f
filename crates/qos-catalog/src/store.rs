//! Catalog — redb-backed store for specs, containers, and bindings.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, Table};
use tracing::debug;

use qos_core::{ContainerId, ContainerStatus, QosSpec, SpecId};

use crate::error::{CatalogError, CatalogResult};
use crate::tables::*;

/// Convert any `Display` error into a `CatalogError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| CatalogError::$variant(e.to_string())
    };
}

/// Thread-safe catalog handle backed by redb.
///
/// One long-lived database handle, one transaction per operation.
#[derive(Clone)]
pub struct Catalog {
    db: Arc<Database>,
}

impl Catalog {
    /// Open (or create) a persistent catalog at the given path.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
            }
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let catalog = Self { db: Arc::new(db) };
        catalog.ensure_tables()?;
        debug!(?path, "catalog opened");
        Ok(catalog)
    }

    /// Create an ephemeral in-memory catalog (for testing).
    pub fn open_in_memory() -> CatalogResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let catalog = Self { db: Arc::new(db) };
        catalog.ensure_tables()?;
        debug!("in-memory catalog opened");
        Ok(catalog)
    }

    /// Destructively reinitialize the catalog: a pre-existing file is
    /// deleted first, then a fresh catalog is created.
    pub fn init(path: &Path) -> CatalogResult<Self> {
        if path.exists() {
            std::fs::remove_file(path).map_err(map_err!(Open))?;
            debug!(?path, "existing catalog deleted");
        }
        Self::open(path)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
        txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Containers ─────────────────────────────────────────────────

    /// Insert a new container status, or replace an existing one.
    ///
    /// `is_new` only distinguishes the add-container path from a
    /// monitor refresh in the logs; callers refreshing an existing
    /// container must have merged the catalog's `storage_reserved_mb`
    /// first.
    pub fn upsert_container(&self, status: &ContainerStatus, is_new: bool) -> CatalogResult<()> {
        let value = serde_json::to_vec(status).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            table
                .insert(status.container_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if is_new {
            debug!(container = %status.container_id, "container status inserted");
        } else {
            debug!(container = %status.container_id, "container status updated");
        }
        Ok(())
    }

    /// Remove a container iff no binding references it.
    ///
    /// Returns `Ok(false)` (and mutates nothing) when bindings exist.
    /// Removing an absent container is a no-op success.
    pub fn remove_container(&self, container_id: &str) -> CatalogResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removable;
        {
            let mut containers = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            let bindings = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
            let exists = containers
                .get(container_id)
                .map_err(map_err!(Read))?
                .is_some();
            if exists {
                let mut bound = false;
                for entry in bindings.iter().map_err(map_err!(Read))? {
                    let (_, value) = entry.map_err(map_err!(Read))?;
                    let ids: Vec<ContainerId> =
                        serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                    if ids.iter().any(|id| id == container_id) {
                        bound = true;
                        break;
                    }
                }
                removable = !bound;
                if removable {
                    containers.remove(container_id).map_err(map_err!(Write))?;
                }
            } else {
                removable = true;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(container = %container_id, removed = removable, "container removal");
        Ok(removable)
    }

    /// Get a container status by id.
    pub fn get_status(&self, container_id: &str) -> CatalogResult<Option<ContainerStatus>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        match table.get(container_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let status: ContainerStatus =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    /// All container ids, in catalog enumeration (key) order.
    pub fn list_container_ids(&self) -> CatalogResult<Vec<ContainerId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    /// All container statuses, in key order.
    pub fn list_containers(&self) -> CatalogResult<Vec<ContainerStatus>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        let mut statuses = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            statuses.push(
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?,
            );
        }
        Ok(statuses)
    }

    // ── Specifications and bindings ────────────────────────────────

    /// Rewrite a spec and its binding atomically, keeping reservation
    /// totals consistent with the bindings.
    ///
    /// In one transaction: the previously stored spec's reservation is
    /// released from every previously bound container, the spec row and
    /// binding list are replaced, and the new reservation is charged to
    /// every newly bound container. Duplicate ids in `container_ids`
    /// are deduplicated, preserving order (first entry = primary). An
    /// empty list wipes the binding (the unsatisfiable-reschedule case).
    pub fn add_scheduled(
        &self,
        spec: &QosSpec,
        container_ids: &[ContainerId],
        is_new: bool,
    ) -> CatalogResult<()> {
        let spec_value = serde_json::to_vec(spec).map_err(map_err!(Serialize))?;

        let mut unique: Vec<ContainerId> = Vec::new();
        for id in container_ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut specs = txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
            let mut containers = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            let mut bindings = txn.open_table(BINDINGS).map_err(map_err!(Table))?;

            // Release the reservation the old binding carried.
            let old_reserved = match specs.get(spec.spec_id.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    let old: QosSpec =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                    Some(old.reserved_size_mb)
                }
                None => None,
            };
            let old_bound: Vec<ContainerId> =
                match bindings.get(spec.spec_id.as_str()).map_err(map_err!(Read))? {
                    Some(guard) => {
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                    }
                    None => Vec::new(),
                };
            if let Some(reserved) = old_reserved {
                for id in &old_bound {
                    adjust_reservation(&mut containers, id, |r| r.saturating_sub(reserved))?;
                }
            }

            // Charge the new reservation. Every id must already be a
            // catalog container.
            for id in &unique {
                if containers.get(id.as_str()).map_err(map_err!(Read))?.is_none() {
                    return Err(CatalogError::UnknownContainer(id.clone()));
                }
                adjust_reservation(&mut containers, id, |r| r + spec.reserved_size_mb)?;
            }

            specs
                .insert(spec.spec_id.as_str(), spec_value.as_slice())
                .map_err(map_err!(Write))?;
            if unique.is_empty() {
                bindings
                    .remove(spec.spec_id.as_str())
                    .map_err(map_err!(Write))?;
            } else {
                let binding_value = serde_json::to_vec(&unique).map_err(map_err!(Serialize))?;
                bindings
                    .insert(spec.spec_id.as_str(), binding_value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if is_new {
            debug!(spec = %spec.spec_id, containers = ?unique, "scheduled spec inserted");
        } else {
            debug!(spec = %spec.spec_id, containers = ?unique, "scheduled spec updated");
        }
        Ok(())
    }

    /// Remove a spec, releasing its reservation on every bound
    /// container and deleting its binding, in one transaction.
    /// Removing an unknown spec is a no-op success.
    pub fn remove_spec(&self, spec_id: &str) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut specs = txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
            let mut containers = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            let mut bindings = txn.open_table(BINDINGS).map_err(map_err!(Table))?;

            let spec: Option<QosSpec> = match specs.get(spec_id).map_err(map_err!(Read))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
            if let Some(spec) = spec {
                let bound: Vec<ContainerId> = match bindings.get(spec_id).map_err(map_err!(Read))?
                {
                    Some(guard) => {
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                    }
                    None => Vec::new(),
                };
                for id in &bound {
                    adjust_reservation(&mut containers, id, |r| {
                        r.saturating_sub(spec.reserved_size_mb)
                    })?;
                }
                bindings.remove(spec_id).map_err(map_err!(Write))?;
                specs.remove(spec_id).map_err(map_err!(Write))?;
                debug!(spec = %spec_id, released_from = ?bound, "spec removed");
            } else {
                debug!(spec = %spec_id, "spec removal was a no-op");
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a spec by id.
    pub fn get_spec(&self, spec_id: &str) -> CatalogResult<Option<QosSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
        match table.get(spec_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let spec: QosSpec =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(spec))
            }
            None => Ok(None),
        }
    }

    /// All spec ids, in key order.
    pub fn list_spec_ids(&self) -> CatalogResult<Vec<SpecId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    /// All specs, in key order.
    pub fn list_specs(&self) -> CatalogResult<Vec<QosSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SPECIFICATIONS).map_err(map_err!(Table))?;
        let mut specs = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            specs.push(
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?,
            );
        }
        Ok(specs)
    }

    /// The ordered container ids a spec is bound to (empty if unbound).
    pub fn containers_for(&self, spec_id: &str) -> CatalogResult<Vec<ContainerId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        match table.get(spec_id).map_err(map_err!(Read))? {
            Some(guard) => {
                Ok(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
            }
            None => Ok(Vec::new()),
        }
    }

    /// The spec ids bound to a container, in key order.
    pub fn specs_on(&self, container_id: &str) -> CatalogResult<Vec<SpecId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        let mut spec_ids = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let ids: Vec<ContainerId> =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if ids.iter().any(|id| id == container_id) {
                spec_ids.push(key.value().to_string());
            }
        }
        Ok(spec_ids)
    }

    /// Every binding as `(spec_id, ordered container ids)`, in key order.
    pub fn list_bindings(&self) -> CatalogResult<Vec<(SpecId, Vec<ContainerId>)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
        let mut all = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let ids: Vec<ContainerId> =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            all.push((key.value().to_string(), ids));
        }
        Ok(all)
    }

    /// Full catalog contents, for the verbose dump and for comparing
    /// catalog states in tests.
    pub fn dump(
        &self,
    ) -> CatalogResult<(Vec<QosSpec>, Vec<ContainerStatus>, Vec<(SpecId, Vec<ContainerId>)>)> {
        Ok((self.list_specs()?, self.list_containers()?, self.list_bindings()?))
    }
}

/// Read-modify-write one container's `storage_reserved_mb` inside an
/// open write transaction.
fn adjust_reservation(
    containers: &mut Table<'_, &str, &[u8]>,
    container_id: &str,
    f: impl FnOnce(u64) -> u64,
) -> CatalogResult<()> {
    let status: Option<ContainerStatus> =
        match containers.get(container_id).map_err(map_err!(Read))? {
            Some(guard) => {
                Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
            }
            None => None,
        };
    // A previously bound container may have been refreshed away; the
    // binding rewrite tolerates that, new bindings are checked upstream.
    if let Some(mut status) = status {
        status.storage_reserved_mb = f(status.storage_reserved_mb);
        let value = serde_json::to_vec(&status).map_err(map_err!(Serialize))?;
        containers
            .insert(container_id, value.as_slice())
            .map_err(map_err!(Write))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spec(id: &str, reserved: u64) -> QosSpec {
        QosSpec {
            spec_id: id.to_string(),
            reserved_size_mb: reserved,
            ..QosSpec::default()
        }
    }

    fn test_status(id: &str) -> ContainerStatus {
        ContainerStatus {
            container_id: id.to_string(),
            storage_total_mb: 1000,
            reliability_ppm: 990_000,
            availability_ppm: 990_000,
            cost_per_gb_month: 0.10,
            ..ContainerStatus::default()
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn container_round_trip() {
        let catalog = Catalog::open_in_memory().unwrap();
        let status = test_status("container1");
        catalog.upsert_container(&status, true).unwrap();
        assert_eq!(catalog.get_status("container1").unwrap(), Some(status));
        assert!(catalog.get_status("container2").unwrap().is_none());
    }

    #[test]
    fn spec_round_trip_through_schedule() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        let spec = test_spec("s1", 100);
        catalog.add_scheduled(&spec, &ids(&["c1"]), true).unwrap();
        assert_eq!(catalog.get_spec("s1").unwrap(), Some(spec));
        assert_eq!(catalog.containers_for("s1").unwrap(), ids(&["c1"]));
    }

    #[test]
    fn schedule_charges_reservation() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog.upsert_container(&test_status("c2"), true).unwrap();

        catalog
            .add_scheduled(&test_spec("s1", 100), &ids(&["c1", "c2"]), true)
            .unwrap();
        catalog
            .add_scheduled(&test_spec("s2", 50), &ids(&["c1"]), true)
            .unwrap();

        assert_eq!(catalog.get_status("c1").unwrap().unwrap().storage_reserved_mb, 150);
        assert_eq!(catalog.get_status("c2").unwrap().unwrap().storage_reserved_mb, 100);
    }

    #[test]
    fn reschedule_moves_reservation() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog.upsert_container(&test_status("c2"), true).unwrap();

        let spec = test_spec("s1", 100);
        catalog.add_scheduled(&spec, &ids(&["c1"]), true).unwrap();
        catalog.add_scheduled(&spec, &ids(&["c2"]), false).unwrap();

        assert_eq!(catalog.get_status("c1").unwrap().unwrap().storage_reserved_mb, 0);
        assert_eq!(catalog.get_status("c2").unwrap().unwrap().storage_reserved_mb, 100);
        assert_eq!(catalog.containers_for("s1").unwrap(), ids(&["c2"]));
    }

    #[test]
    fn remove_spec_releases_reservation() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog
            .add_scheduled(&test_spec("s1", 100), &ids(&["c1"]), true)
            .unwrap();

        catalog.remove_spec("s1").unwrap();

        assert_eq!(catalog.get_status("c1").unwrap().unwrap().storage_reserved_mb, 0);
        assert!(catalog.get_spec("s1").unwrap().is_none());
        assert!(catalog.containers_for("s1").unwrap().is_empty());
        assert!(catalog.list_bindings().unwrap().is_empty());
    }

    #[test]
    fn remove_spec_unknown_is_noop() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.remove_spec("nope").unwrap();
    }

    #[test]
    fn remove_container_blocked_by_binding() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog
            .add_scheduled(&test_spec("s1", 100), &ids(&["c1"]), true)
            .unwrap();

        assert!(!catalog.remove_container("c1").unwrap());
        assert!(catalog.get_status("c1").unwrap().is_some());

        catalog.remove_spec("s1").unwrap();
        assert!(catalog.remove_container("c1").unwrap());
        assert!(catalog.get_status("c1").unwrap().is_none());
    }

    #[test]
    fn remove_absent_container_is_noop_success() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert!(catalog.remove_container("ghost").unwrap());
    }

    #[test]
    fn schedule_rejects_unknown_container() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog.add_scheduled(&test_spec("s1", 100), &ids(&["ghost"]), true);
        assert!(matches!(err, Err(CatalogError::UnknownContainer(_))));
        // Nothing committed.
        assert!(catalog.get_spec("s1").unwrap().is_none());
    }

    #[test]
    fn binding_order_preserved_and_duplicates_collapse() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog.upsert_container(&test_status("c2"), true).unwrap();

        catalog
            .add_scheduled(&test_spec("s1", 100), &ids(&["c2", "c1", "c2"]), true)
            .unwrap();

        // Primary stays first; the duplicate reserves only once.
        assert_eq!(catalog.containers_for("s1").unwrap(), ids(&["c2", "c1"]));
        assert_eq!(catalog.get_status("c2").unwrap().unwrap().storage_reserved_mb, 100);
    }

    #[test]
    fn empty_binding_wipes_relationship() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        let spec = test_spec("s1", 100);
        catalog.add_scheduled(&spec, &ids(&["c1"]), true).unwrap();

        catalog.add_scheduled(&spec, &[], false).unwrap();

        assert!(catalog.containers_for("s1").unwrap().is_empty());
        assert_eq!(catalog.get_status("c1").unwrap().unwrap().storage_reserved_mb, 0);
        // The spec row itself survives.
        assert!(catalog.get_spec("s1").unwrap().is_some());
    }

    #[test]
    fn specs_on_scans_bindings() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.upsert_container(&test_status("c1"), true).unwrap();
        catalog.upsert_container(&test_status("c2"), true).unwrap();
        catalog
            .add_scheduled(&test_spec("s1", 10), &ids(&["c1", "c2"]), true)
            .unwrap();
        catalog
            .add_scheduled(&test_spec("s2", 10), &ids(&["c2"]), true)
            .unwrap();

        assert_eq!(catalog.specs_on("c1").unwrap(), ids(&["s1"]));
        assert_eq!(catalog.specs_on("c2").unwrap(), ids(&["s1", "s2"]));
        assert!(catalog.specs_on("c3").unwrap().is_empty());
    }

    #[test]
    fn enumeration_is_key_ordered() {
        let catalog = Catalog::open_in_memory().unwrap();
        for id in ["charlie", "alpha", "bravo"] {
            catalog.upsert_container(&test_status(id), true).unwrap();
        }
        assert_eq!(
            catalog.list_container_ids().unwrap(),
            ids(&["alpha", "bravo", "charlie"])
        );
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("qos.db");
        {
            let catalog = Catalog::open(&db_path).unwrap();
            catalog.upsert_container(&test_status("c1"), true).unwrap();
        }
        let catalog = Catalog::open(&db_path).unwrap();
        assert!(catalog.get_status("c1").unwrap().is_some());
    }

    #[test]
    fn init_deletes_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("qos.db");
        {
            let catalog = Catalog::open(&db_path).unwrap();
            catalog.upsert_container(&test_status("c1"), true).unwrap();
        }
        let catalog = Catalog::init(&db_path).unwrap();
        assert!(catalog.list_container_ids().unwrap().is_empty());
    }
}
