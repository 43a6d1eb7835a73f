//! Satisfiability checker — six pure predicates over a spec and an
//! ordered candidate set.
//!
//! The first container in the set is the **primary**: it alone carries
//! the bandwidth and latency requirements. Reliability and availability
//! compose probabilistically across the whole set. `check_all` runs
//! every predicate even after a failure so callers see the full list of
//! violated requirements.

use tracing::debug;

use qos_core::ppm;
use qos_core::{BandwidthClass, ContainerStatus, LatencyClass, QosSpec};

/// Minimum spare read and write bandwidth the primary must offer for a
/// `High`-bandwidth spec, MB/s.
pub const BANDWIDTH_FLOOR_MBPS: f64 = 5.0;

/// The individual requirements a placement can violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Space,
    DataIntegrity,
    Reliability,
    Availability,
    Bandwidth,
    Latency,
}

impl Predicate {
    pub fn name(self) -> &'static str {
        match self {
            Predicate::Space => "space",
            Predicate::DataIntegrity => "data_integrity",
            Predicate::Reliability => "reliability",
            Predicate::Availability => "availability",
            Predicate::Bandwidth => "bandwidth",
            Predicate::Latency => "latency",
        }
    }
}

/// Outcome of a full check: every violated predicate, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub failed: Vec<Predicate>,
}

impl CheckReport {
    pub fn satisfied(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Every container must have enough free space for the spec's
/// outstanding reservation. An empty set fails.
pub fn check_space(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    if statuses.is_empty() {
        return false;
    }
    let needed = spec.reserved_size_mb.saturating_sub(spec.used_size_mb);
    statuses.iter().all(|s| s.free_space_mb() >= needed)
}

/// Every container must meet the spec's data integrity requirement.
pub fn check_dataintegrity(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    statuses.iter().all(|s| s.data_integrity >= spec.data_integrity)
}

/// The set's combined success probability must reach the spec's
/// reliability target: `1 − ∏(1 − r_c) ≥ r_spec`.
pub fn check_reliability(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    let combined_failure: f64 = statuses
        .iter()
        .map(|s| 1.0 - ppm::fraction(s.reliability_ppm))
        .product();
    1.0 - combined_failure >= ppm::fraction(spec.reliability_ppm)
}

/// Same composition over measured availability.
pub fn check_availability(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    let combined_unavailable: f64 = statuses
        .iter()
        .map(|s| 1.0 - ppm::fraction(s.availability_ppm))
        .product();
    1.0 - combined_unavailable >= ppm::fraction(spec.availability_ppm)
}

/// For a `High`-bandwidth spec the primary must have spare read and
/// write bandwidth above the floor. Replicas are not consulted: the
/// client only ever talks to the primary.
pub fn check_bandwidth(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    if spec.bandwidth == BandwidthClass::Low {
        return true;
    }
    let Some(primary) = statuses.first() else {
        return false;
    };
    let free_rbw = primary.storage_rbw_mbps - primary.storage_rbw_dyn_mbps;
    let free_wbw = primary.storage_wbw_mbps - primary.storage_wbw_dyn_mbps;
    free_rbw >= BANDWIDTH_FLOOR_MBPS && free_wbw >= BANDWIDTH_FLOOR_MBPS
}

/// For a `Low`-latency spec the primary must sit in the same first two
/// location levels as the spec's first preferred location.
pub fn check_latency(spec: &QosSpec, statuses: &[ContainerStatus]) -> bool {
    if spec.latency == LatencyClass::High {
        return true;
    }
    let Some(primary) = statuses.first() else {
        return false;
    };
    let Some(wanted) = spec.physical_locations.split(';').next() else {
        return false;
    };
    match (location_prefix(wanted), location_prefix(&primary.physical_location)) {
        (Some(spec_prefix), Some(container_prefix)) => spec_prefix == container_prefix,
        _ => false,
    }
}

/// The first two non-empty `/`-delimited segments of a location path.
fn location_prefix(location: &str) -> Option<(String, String)> {
    let mut segments = location.trim().split('/').filter(|s| !s.is_empty());
    let first = segments.next()?;
    let second = segments.next()?;
    Some((first.to_string(), second.to_string()))
}

/// Check whether the ordered container set satisfies the spec.
///
/// All six predicates are evaluated in order; every failure is logged
/// with the spec id and collected in the report. An empty set is never
/// satisfiable.
pub fn check_all(spec: &QosSpec, statuses: &[ContainerStatus]) -> CheckReport {
    let mut report = CheckReport::default();
    if statuses.is_empty() {
        report.failed = vec![
            Predicate::Space,
            Predicate::DataIntegrity,
            Predicate::Reliability,
            Predicate::Availability,
            Predicate::Bandwidth,
            Predicate::Latency,
        ];
        debug!(spec = %spec.spec_id, "check failed: empty candidate set");
        return report;
    }
    let checks: [(Predicate, fn(&QosSpec, &[ContainerStatus]) -> bool); 6] = [
        (Predicate::Space, check_space),
        (Predicate::DataIntegrity, check_dataintegrity),
        (Predicate::Reliability, check_reliability),
        (Predicate::Availability, check_availability),
        (Predicate::Bandwidth, check_bandwidth),
        (Predicate::Latency, check_latency),
    ];
    for (predicate, check) in checks {
        if !check(spec, statuses) {
            debug!(
                spec = %spec.spec_id,
                predicate = predicate.name(),
                "requirement not satisfied"
            );
            report.failed.push(predicate);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> QosSpec {
        QosSpec {
            spec_id: "s1".to_string(),
            availability_ppm: 990_000,
            reliability_ppm: 990_000,
            reserved_size_mb: 100,
            used_size_mb: 0,
            data_integrity: 5,
            bandwidth: BandwidthClass::Low,
            latency: LatencyClass::High,
            ..QosSpec::default()
        }
    }

    fn status(id: &str) -> ContainerStatus {
        ContainerStatus {
            container_id: id.to_string(),
            storage_total_mb: 1000,
            storage_used_mb: 0,
            data_integrity: 5,
            reliability_ppm: 990_000,
            availability_ppm: 990_000,
            ..ContainerStatus::default()
        }
    }

    #[test]
    fn empty_set_fails_everything() {
        let report = check_all(&spec(), &[]);
        assert!(!report.satisfied());
    }

    #[test]
    fn single_good_container_satisfies() {
        let report = check_all(&spec(), &[status("c1")]);
        assert!(report.satisfied(), "failed: {:?}", report.failed);
    }

    #[test]
    fn space_accounts_for_consumed_portion() {
        let mut s = spec();
        s.reserved_size_mb = 150;
        s.used_size_mb = 100;
        let mut c = status("c1");
        c.storage_total_mb = 100;
        c.storage_used_mb = 40;
        // free 60 >= outstanding 50
        assert!(check_space(&s, &[c.clone()]));
        c.storage_used_mb = 60;
        assert!(!check_space(&s, std::slice::from_ref(&c)));
    }

    #[test]
    fn one_weak_container_fails_integrity_for_whole_set() {
        let mut weak = status("c2");
        weak.data_integrity = 1;
        let report = check_all(&spec(), &[status("c1"), weak]);
        assert_eq!(report.failed, vec![Predicate::DataIntegrity]);
    }

    #[test]
    fn availability_composes_across_replicas() {
        let mut s = spec();
        s.availability_ppm = 999_000; // 0.999

        // One 0.99 container is not enough.
        assert!(!check_availability(&s, &[status("c1")]));
        // Two compose to 1 - 0.01^2 = 0.9999 >= 0.999.
        assert!(check_availability(&s, &[status("c1"), status("c2")]));
    }

    #[test]
    fn reliability_composes_the_same_way() {
        let mut s = spec();
        s.reliability_ppm = 999_000;
        assert!(!check_reliability(&s, &[status("c1")]));
        assert!(check_reliability(&s, &[status("c1"), status("c2")]));
    }

    #[test]
    fn bandwidth_checks_primary_only() {
        let mut s = spec();
        s.bandwidth = BandwidthClass::High;

        let mut starved = status("c1");
        starved.storage_rbw_mbps = 10.0;
        starved.storage_rbw_dyn_mbps = 8.0; // 2 MB/s spare < floor
        starved.storage_wbw_mbps = 50.0;

        let mut fast = status("c2");
        fast.storage_rbw_mbps = 100.0;
        fast.storage_wbw_mbps = 100.0;

        assert!(!check_bandwidth(&s, &[starved.clone(), fast.clone()]));
        // Same pair with the fast container as primary passes.
        assert!(check_bandwidth(&s, &[fast, starved]));
    }

    #[test]
    fn low_bandwidth_spec_skips_the_check() {
        let mut starved = status("c1");
        starved.storage_rbw_mbps = 0.0;
        assert!(check_bandwidth(&spec(), &[starved]));
    }

    #[test]
    fn latency_matches_first_two_location_levels() {
        let mut s = spec();
        s.latency = LatencyClass::Low;
        s.physical_locations = "/uva/cs/rack1;/uva/ee/rack9".to_string();

        let mut near = status("c1");
        near.physical_location = "/uva/cs/rack7".to_string();
        assert!(check_latency(&s, &[near]));

        let mut far = status("c2");
        far.physical_location = "/uva/ee/rack9".to_string();
        assert!(!check_latency(&s, &[far]));
    }

    #[test]
    fn latency_fails_closed_on_malformed_locations() {
        let mut s = spec();
        s.latency = LatencyClass::Low;
        s.physical_locations = "/uva".to_string(); // only one level
        let mut c = status("c1");
        c.physical_location = "/uva/cs/rack1".to_string();
        assert!(!check_latency(&s, &[c]));
    }

    #[test]
    fn all_failures_are_surfaced_together() {
        let mut s = spec();
        s.reserved_size_mb = 5000;
        s.data_integrity = 999;
        s.availability_ppm = 999_999;
        let report = check_all(&s, &[status("c1")]);
        assert!(report.failed.contains(&Predicate::Space));
        assert!(report.failed.contains(&Predicate::DataIntegrity));
        assert!(report.failed.contains(&Predicate::Availability));
    }
}
