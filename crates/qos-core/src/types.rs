//! Domain entities for the QoS placement engine.
//!
//! A [`QosSpec`] is a client's declared storage requirement; a
//! [`ContainerStatus`] is the static/dynamic picture of one storage
//! container. Both are serde value records, JSON-serialized into the
//! catalog's value columns. Probabilities are parts-per-million (see
//! [`crate::ppm`]).

use serde::{Deserialize, Serialize};

/// Globally unique identifier for a QoS specification.
pub type SpecId = String;

/// Globally unique identifier for a storage container.
pub type ContainerId = String;

/// Throughput class required by a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthClass {
    High,
    #[default]
    Low,
}

/// Latency class required by a spec. `Low` means the placement must be
/// location-local to the spec's preferred physical locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    #[default]
    High,
    Low,
}

/// A declared client storage requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QosSpec {
    pub spec_id: SpecId,
    /// Required availability, parts-per-million (990_000 = 0.99).
    pub availability_ppm: u32,
    /// Required reliability, parts-per-million.
    pub reliability_ppm: u32,
    /// Capacity request in megabytes.
    pub reserved_size_mb: u64,
    /// Currently consumed capacity in megabytes (`<= reserved_size_mb`).
    pub used_size_mb: u64,
    /// Data integrity requirement, 0..=1_000_000, higher = stronger.
    pub data_integrity: u32,
    pub bandwidth: BandwidthClass,
    pub latency: LatencyClass,
    /// `;`-separated path fragments like `/region/zone/rack`, consulted
    /// only for `Low` latency specs.
    pub physical_locations: String,
    /// Path of the originating spec file, kept for audit.
    pub spec_path: String,
}

impl Default for QosSpec {
    fn default() -> Self {
        Self {
            spec_id: String::new(),
            availability_ppm: 990_000,
            reliability_ppm: 990_000,
            reserved_size_mb: 100,
            used_size_mb: 0,
            data_integrity: 0,
            bandwidth: BandwidthClass::Low,
            latency: LatencyClass::High,
            physical_locations: String::new(),
            spec_path: String::new(),
        }
    }
}

/// Static and dynamic status of one storage container.
///
/// `storage_reserved_mb` is owned by the engine, not the container: a
/// remote status file never carries a meaningful value for it, and the
/// monitor preserves the catalog's copy on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerStatus {
    pub container_id: ContainerId,
    // static
    pub storage_total_mb: u64,
    pub path_to_switch: String,
    pub cores_available: u32,
    /// Max read bandwidth, MB/s.
    pub storage_rbw_mbps: f64,
    /// Max write bandwidth, MB/s.
    pub storage_wbw_mbps: f64,
    /// Min read latency, microseconds.
    pub storage_r_latency_us: u32,
    /// Min write latency, microseconds.
    pub storage_w_latency_us: u32,
    /// RAID level, 0..=6.
    pub storage_raid_level: u8,
    pub cost_per_gb_month: f64,
    /// 0..=1_000_000, higher = stronger.
    pub data_integrity: u32,
    // dynamic
    /// Megabytes reserved by bound specs. Engine-owned.
    pub storage_reserved_mb: u64,
    pub storage_used_mb: u64,
    /// Measured reliability, parts-per-million.
    pub reliability_ppm: u32,
    /// Measured availability, parts-per-million.
    pub availability_ppm: u32,
    /// 10-minute average read bandwidth in use, MB/s.
    pub storage_rbw_dyn_mbps: f64,
    /// 10-minute average write bandwidth in use, MB/s.
    pub storage_wbw_dyn_mbps: f64,
    // extra
    /// Physical location path like `/region/zone/rack`.
    pub physical_location: String,
    /// Namespace path of the container's directory service.
    pub network_address: String,
    /// Namespace path of the container's published status file.
    pub status_path: String,
}

impl Default for ContainerStatus {
    fn default() -> Self {
        Self {
            container_id: String::new(),
            storage_total_mb: 0,
            path_to_switch: String::new(),
            cores_available: 0,
            storage_rbw_mbps: 0.0,
            storage_wbw_mbps: 0.0,
            storage_r_latency_us: 0,
            storage_w_latency_us: 0,
            storage_raid_level: 0,
            cost_per_gb_month: 0.0,
            data_integrity: 0,
            storage_reserved_mb: 0,
            storage_used_mb: 0,
            reliability_ppm: 0,
            availability_ppm: 0,
            storage_rbw_dyn_mbps: 0.0,
            storage_wbw_dyn_mbps: 0.0,
            physical_location: String::new(),
            network_address: String::new(),
            status_path: String::new(),
        }
    }
}

impl ContainerStatus {
    /// Megabytes not yet consumed by stored data.
    pub fn free_space_mb(&self) -> u64 {
        self.storage_total_mb.saturating_sub(self.storage_used_mb)
    }
}
