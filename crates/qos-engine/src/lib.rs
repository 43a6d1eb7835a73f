//! qos-engine — the stateful half of the QoS placement engine.
//!
//! Composes the catalog, the pure placement logic, and a namespace
//! client into the three operations clients actually invoke:
//!
//! - [`Scheduler`] resolves a spec and picks (and persists) a
//!   container set for it.
//! - [`Monitor`] refreshes container statuses from their published
//!   status files and reschedules specs whose placement no longer
//!   holds.
//! - [`DirectoryBridge`] creates grid directories whose backing
//!   resource lives on a QoS-scheduled container.

pub mod bridge;
pub mod error;
pub mod monitor;
pub mod scheduler;

pub use bridge::{DirectoryBridge, MkdirRequest};
pub use error::{EngineError, EngineResult};
pub use monitor::{Monitor, MonitorReport};
pub use scheduler::{Placement, Scheduler, SpecSource};
