//! redb table definitions for the catalog.
//!
//! Keys are entity ids; values are JSON-serialized domain types.

use redb::TableDefinition;

/// QoS specifications keyed by `spec_id`.
pub const SPECIFICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("specifications");

/// Container statuses keyed by `container_id`.
pub const CONTAINERS: TableDefinition<&str, &[u8]> = TableDefinition::new("containers");

/// Bindings keyed by `spec_id`; value is the ordered `Vec<ContainerId>`
/// the spec is placed on (first entry = primary).
pub const BINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("bindings");
