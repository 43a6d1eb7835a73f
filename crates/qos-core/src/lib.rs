//! qos-core — shared types for the QoS placement engine.
//!
//! Defines the domain entities ([`QosSpec`], [`ContainerStatus`]), the
//! parts-per-million probability encoding ([`ppm`]), the on-disk TOML
//! record formats for spec and status files ([`records`]), and engine
//! configuration ([`config`]).

pub mod config;
pub mod ppm;
pub mod records;
pub mod types;

pub use config::EngineConfig;
pub use records::{RecordError, parse_spec_record, parse_status_record};
pub use types::*;
