//! qos-placement — pure placement decisions for the QoS engine.
//!
//! No I/O and no state: the [`checker`] decides whether a candidate
//! container set satisfies a spec, and the [`search`] enumerates
//! candidate sets up to the replication cap. The scheduler in
//! `qos-engine` wires these to the catalog and namespace.

pub mod checker;
pub mod search;

pub use checker::{CheckReport, Predicate, check_all};
pub use search::{estimated_monthly_cost, filter_candidates, find_satisfying};
