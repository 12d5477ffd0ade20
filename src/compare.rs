//! Classification of a new result set against a baseline.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::result::PerformanceResult;

/// Added to both minimums so a runtime optimised down to 0 does not divide by zero.
const EPSILON: f64 = 0.001;

/// Old and new results of the same test, compared by their minimum runtimes.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultComparison<'a> {
    pub name: &'a str,
    pub old: &'a PerformanceResult,
    pub new: &'a PerformanceResult,
    /// Speedup of new over old: `old.min / new.min`.
    pub ratio: f64,
    /// Runtime change of new relative to old, in percent.
    pub delta: f64,
    /// Either minimum lies strictly inside the other result's `(min, max)` range.
    pub is_dubious: bool,
}

impl<'a> ResultComparison<'a> {
    /// # Panics
    ///
    /// Panics when the two results belong to different tests.
    pub fn new(old: &'a PerformanceResult, new: &'a PerformanceResult) -> Self {
        assert_eq!(
            old.name, new.name,
            "cannot compare results of different tests"
        );
        Self::compute(old, new)
    }

    pub fn try_new(old: &'a PerformanceResult, new: &'a PerformanceResult) -> Result<Self> {
        if old.name != new.name {
            return Err(Error::name_mismatch(&old.name, &new.name));
        }
        Ok(Self::compute(old, new))
    }

    fn compute(old: &'a PerformanceResult, new: &'a PerformanceResult) -> Self {
        let old_min = old.min as f64 + EPSILON;
        let new_min = new.min as f64 + EPSILON;

        Self {
            name: &old.name,
            old,
            new,
            ratio: old_min / new_min,
            delta: (new_min / old_min - 1.0) * 100.0,
            is_dubious: (old.min < new.min && new.min < old.max)
                || (new.min < old.min && old.min < new.max),
        }
    }
}

/// Outcome of comparing two result sets.
#[derive(Clone, Debug, Default)]
pub struct TestComparator<'a> {
    /// Only in the new set, by name.
    pub added: Vec<&'a PerformanceResult>,
    /// Only in the old set, by name.
    pub removed: Vec<&'a PerformanceResult>,
    /// Faster in the new set, largest improvement first.
    pub increased: Vec<ResultComparison<'a>>,
    /// Slower in the new set, worst regression first.
    pub decreased: Vec<ResultComparison<'a>>,
    /// Within the threshold, by name.
    pub unchanged: Vec<ResultComparison<'a>>,
}

impl<'a> TestComparator<'a> {
    /// Partitions tests by speedup ratio: below `1 - delta_threshold` is a
    /// regression, above `1 + delta_threshold` an improvement.
    pub fn new(
        old_results: &'a BTreeMap<String, PerformanceResult>,
        new_results: &'a BTreeMap<String, PerformanceResult>,
        delta_threshold: f64,
    ) -> Self {
        let mut comparator = Self::default();

        // BTreeMap iteration is already ordered by name.
        for (name, new) in new_results {
            match old_results.get(name) {
                Some(old) => {
                    let cmp = ResultComparison::new(old, new);
                    if cmp.ratio < 1.0 - delta_threshold {
                        comparator.decreased.push(cmp);
                    } else if cmp.ratio > 1.0 + delta_threshold {
                        comparator.increased.push(cmp);
                    } else {
                        comparator.unchanged.push(cmp);
                    }
                }
                None => comparator.added.push(new),
            }
        }
        comparator.removed = old_results
            .iter()
            .filter(|(name, _)| !new_results.contains_key(*name))
            .map(|(_, old)| old)
            .collect();

        comparator
            .decreased
            .sort_by(|a, b| b.delta.total_cmp(&a.delta).then_with(|| by_name(a, b)));
        comparator
            .increased
            .sort_by(|a, b| a.delta.total_cmp(&b.delta).then_with(|| by_name(a, b)));

        info!(
            added = comparator.added.len(),
            removed = comparator.removed.len(),
            regressions = comparator.decreased.len(),
            improvements = comparator.increased.len(),
            unchanged = comparator.unchanged.len(),
            "compared results"
        );
        comparator
    }

    /// Regressions followed by improvements.
    pub fn changed(&self) -> impl Iterator<Item = &ResultComparison<'a>> {
        self.decreased.iter().chain(self.increased.iter())
    }
}

fn by_name(a: &ResultComparison<'_>, b: &ResultComparison<'_>) -> Ordering {
    a.name.cmp(b.name)
}

/// Shorthand for [`TestComparator::new`].
pub fn compare<'a>(
    old_results: &'a BTreeMap<String, PerformanceResult>,
    new_results: &'a BTreeMap<String, PerformanceResult>,
    delta_threshold: f64,
) -> TestComparator<'a> {
    TestComparator::new(old_results, new_results, delta_threshold)
}
