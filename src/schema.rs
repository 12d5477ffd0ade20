use serde::{Deserialize, Serialize};

use crate::config::CompareConfig;
use crate::samples::SampleStatistics;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub tool_version: String,
    pub old_branch: String,
    pub new_branch: String,
    pub delta_threshold: f64,
    pub changes_only: bool,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

impl RunMeta {
    pub fn new(config: &CompareConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            old_branch: config.old_branch.clone(),
            new_branch: config.new_branch.clone(),
            delta_threshold: config.delta_threshold,
            changes_only: config.changes_only,
            timestamp_utc: now_utc(),
            git_sha: git_sha_short(),
        }
    }
}

fn now_utc() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

/// A single test result, as listed in the added/removed sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    pub name: String,
    pub num_samples: u64,
    pub min: u64,
    pub max: u64,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub median: Option<u64>,
    pub max_rss: Option<u64>,
    /// Display values: TEST, MIN, MAX, MEAN, MAX_RSS.
    pub columns: Vec<String>,
}

/// An old/new pair of the same test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub name: String,
    pub old_min: u64,
    pub new_min: u64,
    pub ratio: f64,
    pub delta_percent: f64,
    pub is_dubious: bool,
    /// Display values: TEST, OLD, NEW, DELTA, SPEEDUP.
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub run: RunMeta,
    pub regressions: Vec<ComparisonEntry>,
    pub improvements: Vec<ComparisonEntry>,
    /// Empty when only changes were requested.
    pub unchanged: Vec<ComparisonEntry>,
    pub added: Vec<ResultEntry>,
    pub removed: Vec<ResultEntry>,
}

/// Runtimes of every sample of one test in sequence order, for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub name: String,
    /// Iteration count of the fastest accepted sample.
    pub num_iters: u64,
    pub data: Vec<u64>,
    pub anomalies: usize,
}

impl From<&SampleStatistics> for SampleSeries {
    fn from(stats: &SampleStatistics) -> Self {
        Self {
            name: stats.name().to_string(),
            num_iters: stats.samples().first().map_or(0, |s| s.num_iters),
            data: stats.all_samples().iter().map(|s| s.runtime).collect(),
            anomalies: stats.anomalies().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Sample;

    #[test]
    fn test_sample_series() {
        let stats = SampleStatistics::from_samples(
            "AngryPhonebook",
            [
                Sample::new(0, 78, 11812),
                Sample::new(1, 90, 13898),
                Sample::new(2, 91, 11467),
            ],
        );
        let series = SampleSeries::from(&stats);
        assert_eq!(series.name, "AngryPhonebook");
        assert_eq!(series.num_iters, 91);
        assert_eq!(series.data, vec![11812, 13898, 11467]);
        assert_eq!(series.anomalies, 1);

        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["data"][1], 13898);
    }

    #[test]
    fn test_run_meta_carries_config() {
        let cfg = CompareConfig {
            old_branch: "main".into(),
            new_branch: "feature".into(),
            ..Default::default()
        };
        let meta = RunMeta::new(&cfg);
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert_eq!((meta.old_branch.as_str(), meta.new_branch.as_str()), ("main", "feature"));
        assert!(meta.timestamp_utc.starts_with("unix:"));
    }
}
