//! Candidate filtering and the bounded combinatorial search.
//!
//! The search enumerates repetition-free subsets of the filtered
//! candidate list in strictly increasing index order, smallest
//! cardinality first and in lexicographic index order within a
//! cardinality, and returns the first subset the checker accepts.
//! Deterministic by construction; the winner is the first satisfying
//! set, not the cheapest. Repeats are excluded on purpose: one
//! container failing is not two independent failures, so a duplicated
//! entry would inflate the composed availability and reliability.

use tracing::debug;

use qos_core::{ContainerStatus, QosSpec};

use crate::checker::{check_all, check_dataintegrity, check_space};

/// Per-container filter applied before the combinatorial stage.
///
/// Drops containers that can never be part of a satisfying set: dead
/// availability or reliability, not enough space on their own, or
/// insufficient data integrity.
pub fn filter_candidates(spec: &QosSpec, statuses: Vec<ContainerStatus>) -> Vec<ContainerStatus> {
    statuses
        .into_iter()
        .filter(|status| {
            let single = std::slice::from_ref(status);
            let keep = status.availability_ppm > 0
                && status.reliability_ppm > 0
                && check_space(spec, single)
                && check_dataintegrity(spec, single);
            if !keep {
                debug!(
                    spec = %spec.spec_id,
                    container = %status.container_id,
                    "candidate filtered out"
                );
            }
            keep
        })
        .collect()
}

/// Find the first satisfying candidate subset, by ascending
/// cardinality up to `cap`. Returns strictly increasing indices into
/// `candidates`, so every returned container is distinct.
pub fn find_satisfying(
    spec: &QosSpec,
    candidates: &[ContainerStatus],
    cap: usize,
) -> Option<Vec<usize>> {
    let mut picked: Vec<usize> = Vec::with_capacity(cap);
    for cardinality in 1..=cap.min(candidates.len()) {
        if extend(spec, candidates, cardinality, 0, &mut picked) {
            return Some(picked);
        }
    }
    None
}

/// Depth-first extension of the current index subset. Indices are
/// strictly increasing, so each subset is tried exactly once and no
/// container is counted twice.
fn extend(
    spec: &QosSpec,
    candidates: &[ContainerStatus],
    cardinality: usize,
    from: usize,
    picked: &mut Vec<usize>,
) -> bool {
    if picked.len() == cardinality {
        let set: Vec<ContainerStatus> = picked.iter().map(|&i| candidates[i].clone()).collect();
        return check_all(spec, &set).satisfied();
    }
    for i in from..candidates.len() {
        picked.push(i);
        if extend(spec, candidates, cardinality, i + 1, picked) {
            return true;
        }
        picked.pop();
    }
    false
}

/// Estimated monthly cost of a placement:
/// `(Σ cost_per_gb_month) × reserved_size_mb / 1024`.
pub fn estimated_monthly_cost(spec: &QosSpec, statuses: &[ContainerStatus]) -> f64 {
    let total_rate: f64 = statuses.iter().map(|s| s.cost_per_gb_month).sum();
    total_rate * spec.reserved_size_mb as f64 / 1024.0
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
            data_integrity: 5,
            ..QosSpec::default()
        }
    }

    fn status(id: &str, availability_ppm: u32) -> ContainerStatus {
        ContainerStatus {
            container_id: id.to_string(),
            storage_total_mb: 1000,
            data_integrity: 5,
            reliability_ppm: 990_000,
            availability_ppm,
            cost_per_gb_month: 0.10,
            ..ContainerStatus::default()
        }
    }

    #[test]
    fn filter_drops_dead_and_full_containers() {
        let spec = spec();
        let dead = status("dead", 0);
        let mut full = status("full", 990_000);
        full.storage_used_mb = 950;
        let mut weak = status("weak", 990_000);
        weak.data_integrity = 0;
        let good = status("good", 990_000);

        let kept = filter_candidates(&spec, vec![dead, full, weak, good]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].container_id, "good");
    }

    #[test]
    fn empty_candidate_list_is_unsatisfiable() {
        assert!(find_satisfying(&spec(), &[], 4).is_none());
    }

    #[test]
    fn prefers_lowest_cardinality_and_lowest_index() {
        let candidates = vec![status("a", 990_000), status("b", 990_000)];
        let found = find_satisfying(&spec(), &candidates, 4).unwrap();
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn composes_a_distinct_pair_when_one_is_not_enough() {
        let mut s = spec();
        s.availability_ppm = 999_000;
        let candidates = vec![status("a", 990_000), status("b", 990_000)];

        // 0.99 alone < 0.999; the pair composes to 1 - 0.01^2 = 0.9999.
        let found = find_satisfying(&s, &candidates, 4).unwrap();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn never_counts_one_container_twice() {
        // A lone 0.99 container cannot reach 0.999 no matter the cap;
        // a repeated pick would wrongly compose it with itself.
        let mut s = spec();
        s.availability_ppm = 999_000;
        let candidates = vec![status("a", 990_000)];

        assert!(find_satisfying(&s, &candidates, 4).is_none());
    }

    #[test]
    fn cardinality_cap_is_enforced() {
        // Each container offers 0.5; five are needed for 0.96
        // (1 - 0.5^4 = 0.9375 falls short, 1 - 0.5^5 = 0.96875 passes).
        let mut s = spec();
        s.availability_ppm = 960_000;
        s.reliability_ppm = 1;
        let candidates: Vec<ContainerStatus> = (0..10)
            .map(|i| {
                let mut c = status(&format!("c{i}"), 500_000);
                c.reliability_ppm = 990_000;
                c
            })
            .collect();

        assert!(find_satisfying(&s, &candidates, 4).is_none());
        assert!(find_satisfying(&s, &candidates, 5).is_some());
    }

    #[test]
    fn search_is_deterministic() {
        let mut s = spec();
        s.availability_ppm = 999_000;
        let candidates = vec![
            status("a", 100_000),
            status("b", 990_000),
            status("c", 990_000),
        ];
        let first = find_satisfying(&s, &candidates, 4).unwrap();
        let second = find_satisfying(&s, &candidates, 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cost_formula() {
        let s = spec(); // reserved 100 MB
        let set = vec![status("a", 990_000), status("b", 990_000)];
        let cost = estimated_monthly_cost(&s, &set);
        assert!((cost - 0.20 * 100.0 / 1024.0).abs() < 1e-9);
    }
}
