//! Running, outlier-filtered statistics over the raw timing samples of one test.
//!
//! Samples are folded in with Welford's online mean/variance update. After
//! every insertion the coefficient of variation of the accepted set is checked
//! against [`MAX_COEFFICIENT_OF_VARIATION`]:
//!
//! - a new sample above the mean that pushes the set over the limit is rejected
//!   on the spot and recorded as an anomaly;
//! - otherwise the set is purged: every sample above `max - sd` is moved to the
//!   anomalies and the aggregate is rebuilt from the survivors, repeating until
//!   the set is quiet again.
//!
//! Rejected samples are never dropped; they stay available through
//! [`SampleStatistics::anomalies`] and [`SampleStatistics::all_samples`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coefficient of variation the accepted sample set is held under.
pub const MAX_COEFFICIENT_OF_VARIATION: f64 = 0.05;

/// One measured execution reported by the benchmark driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    /// Sequence number of the sample within its run.
    pub index: u64,
    /// Inner-loop repetitions folded into this measurement.
    pub num_iters: u64,
    /// Runtime in microseconds.
    pub runtime: u64,
}

impl Sample {
    pub fn new(index: u64, num_iters: u64, runtime: u64) -> Self {
        Self {
            index,
            num_iters,
            runtime,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s({}, {}, {})", self.index, self.num_iters, self.runtime)
    }
}

/// Welford accumulator: sample count, running mean and sum of squared deviations.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct RunningStats {
    count: u64,
    mean: f64,
    sum_sq: f64,
}

impl RunningStats {
    fn push(self, x: f64) -> Self {
        let count = self.count + 1;
        let mean = self.mean + (x - self.mean) / count as f64;
        let sum_sq = self.sum_sq + (x - self.mean) * (x - mean);
        Self {
            count,
            mean,
            sum_sq,
        }
    }

    fn replay(samples: &[Sample]) -> Self {
        samples
            .iter()
            .fold(Self::default(), |acc, s| acc.push(s.runtime as f64))
    }

    fn sd(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.sum_sq.max(0.0) / (self.count - 1) as f64).sqrt()
        }
    }
}

/// Outlier-filtered sample population of a single performance test.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleStatistics {
    name: String,
    /// Accepted samples, ascending by runtime.
    samples: Vec<Sample>,
    anomalies: Vec<Sample>,
    stats: RunningStats,
}

impl SampleStatistics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
            anomalies: Vec::new(),
            stats: RunningStats::default(),
        }
    }

    /// Builds the statistics by feeding every sample through [`add`](Self::add) in order.
    pub fn from_samples<I>(name: impl Into<String>, samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut stats = Self::new(name);
        for sample in samples {
            stats.add(sample);
        }
        stats
    }

    /// Adds a sample, then applies the anomaly rejection policy.
    pub fn add(&mut self, sample: Sample) {
        let previous = self.stats;
        let position = self.insert(sample);

        if self.cv() <= MAX_COEFFICIENT_OF_VARIATION {
            return;
        }

        if sample.runtime as f64 > self.mean() {
            self.samples.remove(position);
            self.stats = previous;
            debug!(test = %self.name, %sample, "rejected anomalous sample");
            self.anomalies.push(sample);
        } else {
            self.purge();
        }
    }

    /// Folds in another run of the same test: its accepted samples go through
    /// [`add`](Self::add) and its anomalies are kept as anomalies.
    pub fn absorb(&mut self, other: &SampleStatistics) {
        for sample in &other.samples {
            self.add(*sample);
        }
        self.anomalies.extend_from_slice(&other.anomalies);
    }

    fn insert(&mut self, sample: Sample) -> usize {
        self.stats = self.stats.push(sample.runtime as f64);
        // Insert after equal runtimes so ties keep arrival order.
        let position = self.samples.partition_point(|s| s.runtime <= sample.runtime);
        self.samples.insert(position, sample);
        position
    }

    /// Moves every sample above `max - sd` to the anomalies and rebuilds the
    /// aggregate from the rest, until the coefficient of variation settles.
    ///
    /// At least one sample is always retained and each pass strictly shrinks
    /// the accepted set, so the loop terminates.
    fn purge(&mut self) {
        while self.samples.len() > 1 && self.cv() > MAX_COEFFICIENT_OF_VARIATION {
            let ceiling = self.max().unwrap_or_default() as f64 - self.sd();
            let keep = self
                .samples
                .partition_point(|s| s.runtime as f64 <= ceiling)
                .clamp(1, self.samples.len() - 1);

            let purged = self.samples.split_off(keep);
            debug!(
                test = %self.name,
                purged = purged.len(),
                retained = self.samples.len(),
                ceiling,
                "purged anomalies"
            );
            self.anomalies.extend(purged);
            self.stats = RunningStats::replay(&self.samples);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepted samples, ascending by runtime.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Rejected samples in the order they were rejected.
    pub fn anomalies(&self) -> &[Sample] {
        &self.anomalies
    }

    /// Number of accepted samples.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples seen, accepted or not.
    pub fn num_samples(&self) -> usize {
        self.samples.len() + self.anomalies.len()
    }

    /// Accepted samples and anomalies together, ordered by sequence index.
    pub fn all_samples(&self) -> Vec<Sample> {
        let mut all: Vec<Sample> = self
            .samples
            .iter()
            .chain(self.anomalies.iter())
            .copied()
            .collect();
        all.sort_by_key(|s| s.index);
        all
    }

    pub fn min(&self) -> Option<u64> {
        self.samples.first().map(|s| s.runtime)
    }

    pub fn max(&self) -> Option<u64> {
        self.samples.last().map(|s| s.runtime)
    }

    /// Runtime at index `count / 2`; the upper median for even counts.
    pub fn median(&self) -> Option<u64> {
        self.samples.get(self.samples.len() / 2).map(|s| s.runtime)
    }

    pub fn mean(&self) -> f64 {
        self.stats.mean
    }

    /// Sample standard deviation; 0 with fewer than two samples.
    pub fn sd(&self) -> f64 {
        self.stats.sd()
    }

    /// Coefficient of variation, `sd / mean`.
    pub fn cv(&self) -> f64 {
        if self.stats.mean == 0.0 {
            0.0
        } else {
            self.sd() / self.stats.mean
        }
    }

    pub fn range(&self) -> u64 {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    /// Range as a fraction of the mean.
    pub fn spread(&self) -> f64 {
        if self.stats.mean == 0.0 {
            0.0
        } else {
            self.range() as f64 / self.stats.mean
        }
    }
}

impl fmt::Display for SampleStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min(), self.max(), self.median()) {
            (Some(min), Some(max), Some(median)) => write!(
                f,
                "{} n={} min={} max={} range={} sd={:.0} mean={:.0} median={} cv={:.2}% spread={:.2}%",
                self.name,
                self.count(),
                min,
                max,
                self.range(),
                self.sd(),
                self.mean(),
                median,
                self.cv() * 100.0,
                self.spread() * 100.0
            ),
            _ => write!(f, "{} n=0", self.name),
        }
    }
}
