//! qos-namespace — the grid namespace capability consumed by the engine.
//!
//! The engine never speaks the grid protocol itself; it consumes a
//! [`NamespaceClient`] to resolve logical paths, read remote spec and
//! status files, and create/link directory resources. Two
//! implementations ship here:
//!
//! - [`LocalNamespace`] maps the capability onto the local filesystem
//!   (resource creation and linking are unsupported).
//! - [`InMemoryNamespace`] is a test double with injectable files,
//!   directories, services, and failure modes.
//!
//! A real grid protocol client is an external collaborator implementing
//! the same trait.

pub mod client;
pub mod local;
pub mod memory;
pub mod path;

pub use client::{Endpoint, NamespaceClient, NamespaceError, NamespaceResult};
pub use local::LocalNamespace;
pub use memory::InMemoryNamespace;
pub use path::{GridPath, PathKind};
