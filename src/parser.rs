//! Line-oriented parser for benchmark driver logs.
//!
//! Recognised line shapes, tried in this order (first match wins):
//!
//! ```text
//! 1,AngryPhonebook,3,11467,13898,12392,1315,11812[,10510336]   summary row (comma, tab or space delimited)
//!     Measuring with scale 78.                                 iteration scale for following samples
//!     Sample 0,11812                                           raw sample: index, runtime
//! 0\t78\t11812                                                 raw sample: index, iterations, runtime
//! ```
//!
//! Everything else (headers, totals, tool chatter, blank lines) is skipped.
//! Raw samples accumulate until the next summary row, which takes ownership of
//! them as a [`SampleStatistics`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::result::PerformanceResult;
use crate::samples::{Sample, SampleStatistics};

/// Test name to (possibly merged) result.
pub type ResultMap = BTreeMap<String, PerformanceResult>;

struct LinePatterns {
    summary: Regex,
    scale: Regex,
    sample: Regex,
    legacy_sample: Regex,
}

static PATTERNS: LazyLock<LinePatterns> = LazyLock::new(|| {
    let num = r"[\d.]+";
    let sep = r"[, \t]+";
    let summary = format!(r"^\d+{sep}\w+(?:{sep}{num}){{6}}(?:{sep}\d+)?");
    LinePatterns {
        summary: Regex::new(&summary).expect("summary pattern"),
        scale: Regex::new(r"^\s*Measuring with scale (\d+)").expect("scale pattern"),
        sample: Regex::new(r"^\s*Sample (\d+),(\d+)").expect("sample pattern"),
        legacy_sample: Regex::new(r"^(\d+)\t(\d+)\t(\d+)").expect("legacy sample pattern"),
    }
});

/// Classification of one log line.
#[derive(Clone, Debug, PartialEq)]
pub enum LogLine {
    Summary(PerformanceResult),
    ScaleChange(u64),
    Sample { index: u64, runtime: u64 },
    LegacySample(Sample),
    Unrecognized,
}

impl LogLine {
    pub fn parse(line: &str) -> Self {
        let p = &*PATTERNS;

        if let Some(m) = p.summary.find(line) {
            // A row whose numbers do not parse is skipped, not re-tried as another shape.
            return PerformanceResult::from_row(m.as_str())
                .map_or(LogLine::Unrecognized, LogLine::Summary);
        }
        if let Some(c) = p.scale.captures(line) {
            return c[1]
                .parse()
                .map_or(LogLine::Unrecognized, LogLine::ScaleChange);
        }
        if let Some(c) = p.sample.captures(line) {
            return match (c[1].parse(), c[2].parse()) {
                (Ok(index), Ok(runtime)) => LogLine::Sample { index, runtime },
                _ => LogLine::Unrecognized,
            };
        }
        if let Some(c) = p.legacy_sample.captures(line) {
            return match (c[1].parse(), c[2].parse(), c[3].parse()) {
                (Ok(i), Ok(n), Ok(r)) => LogLine::LegacySample(Sample::new(i, n, r)),
                _ => LogLine::Unrecognized,
            };
        }
        LogLine::Unrecognized
    }
}

/// Accumulates results from log lines in a single in-order pass.
#[derive(Debug)]
pub struct LogParser {
    results: Vec<PerformanceResult>,
    pending: Vec<Sample>,
    num_iters: u64,
}

impl Default for LogParser {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            pending: Vec::new(),
            num_iters: 1,
        }
    }
}

impl LogParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) {
        match LogLine::parse(line) {
            LogLine::Summary(result) => self.finish_result(result),
            LogLine::ScaleChange(n) => self.num_iters = n,
            LogLine::Sample { index, runtime } => {
                self.pending.push(Sample::new(index, self.num_iters, runtime))
            }
            LogLine::LegacySample(sample) => self.pending.push(sample),
            LogLine::Unrecognized => trace!(line, "skipping"),
        }
    }

    fn finish_result(&mut self, mut result: PerformanceResult) {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            result.samples = Some(SampleStatistics::from_samples(&result.name, pending));
        }
        self.num_iters = 1;
        debug!(test = %result.name, min = result.min, max = result.max, "parsed result");
        self.results.push(result);
    }

    /// Results in the order their summary rows appeared.
    pub fn into_results(self) -> Vec<PerformanceResult> {
        self.results
    }

    /// Parses `lines` into results in log order, without merging duplicates.
    pub fn parse_results<I, S>(lines: I) -> Vec<PerformanceResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parser = Self::new();
        for line in lines {
            parser.feed(line.as_ref());
        }
        parser.into_results()
    }
}

/// Inserts `result`, merging it into an existing result of the same name.
pub fn add_or_merge(results: &mut ResultMap, result: PerformanceResult) {
    match results.get_mut(&result.name) {
        Some(existing) => existing.merge(&result),
        None => {
            results.insert(result.name.clone(), result);
        }
    }
}

pub fn results_from_lines<I, S>(lines: I) -> ResultMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut results = ResultMap::new();
    for result in LogParser::parse_results(lines) {
        add_or_merge(&mut results, result);
    }
    results
}

pub fn results_from_str(log: &str) -> ResultMap {
    results_from_lines(log.lines())
}

/// Streams a log file line by line.
pub fn results_from_file<P: AsRef<Path>>(path: P) -> Result<ResultMap> {
    results_from_files(std::iter::once(path))
}

/// Parses several log files as if they were concatenated in the given order.
pub fn results_from_files<I, P>(paths: I) -> Result<ResultMap>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut results = ResultMap::new();
    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        let mut parser = LogParser::new();
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| Error::io(path, e))?;
            if read == 0 {
                break;
            }
            // Garbled bytes only spoil their own line.
            let line = String::from_utf8_lossy(&buf);
            parser.feed(line.trim_end_matches(['\n', '\r']));
        }

        let parsed = parser.into_results();
        info!(path = %path.display(), results = parsed.len(), "parsed log");
        for result in parsed {
            add_or_merge(&mut results, result);
        }
    }
    Ok(results)
}
