//! On-disk record formats for spec and status files.
//!
//! Remote spec and status files are TOML documents. The boundary
//! records here mirror the file layout (probabilities as fractions or
//! legacy decimal digits, every non-identifying key optional); parsing
//! converts them into the domain types with probabilities in ppm.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ppm;
use crate::types::{BandwidthClass, ContainerStatus, LatencyClass, QosSpec};

/// Errors from parsing or rendering record files.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render record: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("record field out of range: {0}")]
    Range(String),

    #[error("io error: {0}")]
    Io(String),
}

/// A QoS spec file as written by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecRecord {
    pub spec_id: String,
    /// Availability as a fraction (`0.99`) or legacy digits (`99`).
    pub availability: Option<f64>,
    /// Reliability, same encodings.
    pub reliability: Option<f64>,
    pub reserved_size_mb: Option<u64>,
    pub used_size_mb: Option<u64>,
    pub data_integrity: Option<u32>,
    pub bandwidth: Option<BandwidthClass>,
    pub latency: Option<LatencyClass>,
    pub physical_locations: Option<String>,
}

/// A container status file as published by containers.
///
/// `storage_reserved_mb` is deliberately absent: containers do not know
/// about reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub container_id: String,
    pub storage_total_mb: Option<u64>,
    pub path_to_switch: Option<String>,
    pub cores_available: Option<u32>,
    pub storage_rbw_mbps: Option<f64>,
    pub storage_wbw_mbps: Option<f64>,
    pub storage_r_latency_us: Option<u32>,
    pub storage_w_latency_us: Option<u32>,
    pub storage_raid_level: Option<u8>,
    pub cost_per_gb_month: Option<f64>,
    pub data_integrity: Option<u32>,
    pub storage_used_mb: Option<u64>,
    /// Measured reliability as a fraction.
    pub reliability: Option<f64>,
    /// Measured availability as a fraction.
    pub availability: Option<f64>,
    pub storage_rbw_dyn_mbps: Option<f64>,
    pub storage_wbw_dyn_mbps: Option<f64>,
    pub physical_location: Option<String>,
    pub network_address: Option<String>,
    pub status_path: Option<String>,
}

/// Probability fields accept two encodings: a fraction in `0.0..=1.0`,
/// or the legacy whole number of digits after `0.` (`99` → 0.99,
/// `999` → 0.999). Anything else is out of range.
fn probability_to_ppm(field: &str, value: f64) -> Result<u32, RecordError> {
    if (0.0..=1.0).contains(&value) {
        return Ok(ppm::from_fraction(value));
    }
    if value > 1.0 && value < f64::from(ppm::SCALE) && value.fract() == 0.0 {
        return Ok(ppm::from_decimal_digits(value as u32));
    }
    Err(RecordError::Range(format!("{field} = {value}")))
}

/// Parse a spec file into a domain [`QosSpec`].
///
/// `spec_path` records where the file came from, for audit.
pub fn parse_spec_record(text: &str, spec_path: &str) -> Result<QosSpec, RecordError> {
    let record: SpecRecord = toml::from_str(text)?;
    let defaults = QosSpec::default();
    Ok(QosSpec {
        spec_id: record.spec_id,
        availability_ppm: match record.availability {
            Some(f) => probability_to_ppm("availability", f)?,
            None => defaults.availability_ppm,
        },
        reliability_ppm: match record.reliability {
            Some(f) => probability_to_ppm("reliability", f)?,
            None => defaults.reliability_ppm,
        },
        reserved_size_mb: record.reserved_size_mb.unwrap_or(defaults.reserved_size_mb),
        used_size_mb: record.used_size_mb.unwrap_or(defaults.used_size_mb),
        data_integrity: record.data_integrity.unwrap_or(defaults.data_integrity),
        bandwidth: record.bandwidth.unwrap_or_default(),
        latency: record.latency.unwrap_or_default(),
        physical_locations: record.physical_locations.unwrap_or_default(),
        spec_path: spec_path.to_string(),
    })
}

/// Parse a status file into a domain [`ContainerStatus`].
///
/// The returned status has `storage_reserved_mb = 0`; the caller merges
/// the catalog's reservation when refreshing an existing container.
pub fn parse_status_record(text: &str, status_path: &str) -> Result<ContainerStatus, RecordError> {
    let record: StatusRecord = toml::from_str(text)?;
    Ok(ContainerStatus {
        container_id: record.container_id,
        storage_total_mb: record.storage_total_mb.unwrap_or(0),
        path_to_switch: record.path_to_switch.unwrap_or_default(),
        cores_available: record.cores_available.unwrap_or(0),
        storage_rbw_mbps: record.storage_rbw_mbps.unwrap_or(0.0),
        storage_wbw_mbps: record.storage_wbw_mbps.unwrap_or(0.0),
        storage_r_latency_us: record.storage_r_latency_us.unwrap_or(0),
        storage_w_latency_us: record.storage_w_latency_us.unwrap_or(0),
        storage_raid_level: record.storage_raid_level.unwrap_or(0),
        cost_per_gb_month: record.cost_per_gb_month.unwrap_or(0.0),
        data_integrity: record.data_integrity.unwrap_or(0),
        storage_reserved_mb: 0,
        storage_used_mb: record.storage_used_mb.unwrap_or(0),
        reliability_ppm: match record.reliability {
            Some(f) => probability_to_ppm("reliability", f)?,
            None => 0,
        },
        availability_ppm: match record.availability {
            Some(f) => probability_to_ppm("availability", f)?,
            None => 0,
        },
        storage_rbw_dyn_mbps: record.storage_rbw_dyn_mbps.unwrap_or(0.0),
        storage_wbw_dyn_mbps: record.storage_wbw_dyn_mbps.unwrap_or(0.0),
        physical_location: record.physical_location.unwrap_or_default(),
        network_address: record.network_address.unwrap_or_default(),
        // The file may name its own canonical path; fall back to where
        // we actually read it from.
        status_path: record.status_path.unwrap_or_else(|| status_path.to_string()),
    })
}

/// Render a status back into its file form (for publishing tools and
/// round-trip tests).
pub fn status_to_toml(status: &ContainerStatus) -> Result<String, RecordError> {
    let record = StatusRecord {
        container_id: status.container_id.clone(),
        storage_total_mb: Some(status.storage_total_mb),
        path_to_switch: Some(status.path_to_switch.clone()),
        cores_available: Some(status.cores_available),
        storage_rbw_mbps: Some(status.storage_rbw_mbps),
        storage_wbw_mbps: Some(status.storage_wbw_mbps),
        storage_r_latency_us: Some(status.storage_r_latency_us),
        storage_w_latency_us: Some(status.storage_w_latency_us),
        storage_raid_level: Some(status.storage_raid_level),
        cost_per_gb_month: Some(status.cost_per_gb_month),
        data_integrity: Some(status.data_integrity),
        storage_used_mb: Some(status.storage_used_mb),
        reliability: Some(ppm::fraction(status.reliability_ppm)),
        availability: Some(ppm::fraction(status.availability_ppm)),
        storage_rbw_dyn_mbps: Some(status.storage_rbw_dyn_mbps),
        storage_wbw_dyn_mbps: Some(status.storage_wbw_dyn_mbps),
        physical_location: Some(status.physical_location.clone()),
        network_address: Some(status.network_address.clone()),
        status_path: Some(status.status_path.clone()),
    };
    Ok(toml::to_string_pretty(&record)?)
}

/// Render a spec back into its file form.
pub fn spec_to_toml(spec: &QosSpec) -> Result<String, RecordError> {
    let record = SpecRecord {
        spec_id: spec.spec_id.clone(),
        availability: Some(ppm::fraction(spec.availability_ppm)),
        reliability: Some(ppm::fraction(spec.reliability_ppm)),
        reserved_size_mb: Some(spec.reserved_size_mb),
        used_size_mb: Some(spec.used_size_mb),
        data_integrity: Some(spec.data_integrity),
        bandwidth: Some(spec.bandwidth),
        latency: Some(spec.latency),
        physical_locations: Some(spec.physical_locations.clone()),
    };
    Ok(toml::to_string_pretty(&record)?)
}
