use std::collections::{BTreeMap, BTreeSet};

use bench_log_compare::samples::MAX_COEFFICIENT_OF_VARIATION;
use bench_log_compare::{compare, PerformanceResult, Sample, SampleStatistics};
use proptest::prelude::*;

fn to_samples(runtimes: &[u64]) -> Vec<Sample> {
    runtimes
        .iter()
        .enumerate()
        .map(|(i, &r)| Sample::new(i as u64, 1, r))
        .collect()
}

fn summary(name: &str, min: u64) -> PerformanceResult {
    PerformanceResult::from_row(&format!("1,{name},1,{min},{min},{min},0,{min}")).unwrap()
}

fn result_map(entries: &BTreeMap<String, u64>) -> BTreeMap<String, PerformanceResult> {
    entries
        .iter()
        .map(|(name, &min)| (name.clone(), summary(name, min)))
        .collect()
}

proptest! {
    #[test]
    fn accepted_samples_stay_within_cv_bound(runtimes in prop::collection::vec(0u64..200_000, 1..80)) {
        let mut stats = SampleStatistics::new("T");
        for sample in to_samples(&runtimes) {
            stats.add(sample);
            if stats.count() >= 2 {
                prop_assert!(stats.cv() <= MAX_COEFFICIENT_OF_VARIATION);
            }
            prop_assert!(stats.count() >= 1);
        }
    }

    #[test]
    fn accepted_samples_stay_sorted(runtimes in prop::collection::vec(0u64..200_000, 1..80)) {
        let stats = SampleStatistics::from_samples("T", to_samples(&runtimes));
        prop_assert!(stats.samples().windows(2).all(|w| w[0].runtime <= w[1].runtime));
    }

    #[test]
    fn every_sample_is_accounted_for(runtimes in prop::collection::vec(0u64..200_000, 0..80)) {
        let stats = SampleStatistics::from_samples("T", to_samples(&runtimes));
        prop_assert_eq!(stats.num_samples(), runtimes.len());

        let data: Vec<u64> = stats.all_samples().iter().map(|s| s.runtime).collect();
        prop_assert_eq!(data, runtimes);
    }

    #[test]
    fn aggregate_matches_accepted_samples(runtimes in prop::collection::vec(1u64..200_000, 1..80)) {
        let stats = SampleStatistics::from_samples("T", to_samples(&runtimes));
        let n = stats.count() as f64;
        let mean = stats.samples().iter().map(|s| s.runtime as f64).sum::<f64>() / n;
        prop_assert!((stats.mean() - mean).abs() <= mean * 1e-9 + 1e-9);
    }

    #[test]
    fn bulk_construction_matches_incremental(runtimes in prop::collection::vec(0u64..200_000, 0..80)) {
        let samples = to_samples(&runtimes);
        let bulk = SampleStatistics::from_samples("T", samples.clone());
        let mut incremental = SampleStatistics::new("T");
        for sample in samples {
            incremental.add(sample);
        }
        prop_assert_eq!(bulk.count(), incremental.count());
        prop_assert_eq!(bulk.mean(), incremental.mean());
        prop_assert_eq!(bulk.sd(), incremental.sd());
    }

    #[test]
    fn comparator_partition_is_exhaustive_and_disjoint(
        old in prop::collection::btree_map("[A-Z][a-z]{0,3}", 0u64..1_000, 0..20),
        new in prop::collection::btree_map("[A-Z][a-z]{0,3}", 0u64..1_000, 0..20),
        threshold in 0.0f64..1.0,
    ) {
        let old_results = result_map(&old);
        let new_results = result_map(&new);
        let tc = compare(&old_results, &new_results, threshold);

        let compared: Vec<&str> = tc
            .increased
            .iter()
            .chain(&tc.decreased)
            .chain(&tc.unchanged)
            .map(|c| c.name)
            .collect();
        let compared_set: BTreeSet<&str> = compared.iter().copied().collect();
        prop_assert_eq!(compared.len(), compared_set.len());

        let common: BTreeSet<&str> = old
            .keys()
            .filter(|k| new.contains_key(*k))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(compared_set, common);

        let added: BTreeSet<&str> = tc.added.iter().map(|r| r.name.as_str()).collect();
        let only_new: BTreeSet<&str> = new
            .keys()
            .filter(|k| !old.contains_key(*k))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(added, only_new);

        let removed: BTreeSet<&str> = tc.removed.iter().map(|r| r.name.as_str()).collect();
        let only_old: BTreeSet<&str> = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(removed, only_old);

        for cmp in &tc.decreased {
            prop_assert!(cmp.ratio < 1.0 - threshold);
        }
        for cmp in &tc.increased {
            prop_assert!(cmp.ratio > 1.0 + threshold);
        }
    }
}
