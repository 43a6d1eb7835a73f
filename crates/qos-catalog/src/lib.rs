//! qos-catalog — durable catalog for the QoS placement engine.
//!
//! Backed by [redb](https://docs.rs/redb), holds the three relations of
//! the engine: specifications, container statuses, and spec→container
//! bindings. Supports on-disk and in-memory backends (the latter for
//! testing).
//!
//! # Architecture
//!
//! Domain types are JSON-serialized into redb's `&[u8]` value columns
//! with `&str` keys. A binding is stored as the ordered container-id
//! list of one spec (first entry = primary), so rescheduling a spec
//! replaces its whole binding in one write. Every mutation runs in a
//! single write transaction; reservation accounting is maintained
//! inside the same transaction that rewrites a binding.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{CatalogError, CatalogResult};
pub use store::Catalog;
