use std::fmt;

use tracing::debug;

use crate::samples::SampleStatistics;

/// Aggregate statistics of one performance test as reported by a summary row:
///
/// `#,TEST,SAMPLES,MIN(μs),MAX(μs),MEAN(μs),SD(μs),MEDIAN(μs)[,MAX_RSS(B)]`
///
/// The trailing `MAX_RSS` column is only present for runs instrumented to
/// measure memory use.
#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceResult {
    pub name: String,
    pub num_samples: u64,
    pub min: u64,
    pub max: u64,
    /// `None` once a merge made the value unrecoverable.
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub median: Option<u64>,
    pub max_rss: Option<u64>,
    /// Raw samples, present when the log carried per-sample lines.
    pub samples: Option<SampleStatistics>,
}

impl PerformanceResult {
    /// Builds a result from the columns of a summary row. Column 0 (the
    /// ordinal) is ignored; rows with fewer than 8 columns or with
    /// non-numeric values yield `None`.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Option<Self> {
        if columns.len() < 8 {
            return None;
        }
        let col = |i: usize| columns[i].as_ref().trim();

        let name = col(1);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            num_samples: parse_int(col(2))?,
            min: parse_int(col(3))?,
            max: parse_int(col(4))?,
            mean: Some(parse_int(col(5))? as f64),
            sd: Some(col(6).parse::<f64>().ok().filter(|v| v.is_finite())?),
            median: Some(parse_int(col(7))?),
            max_rss: match columns.get(8).map(|c| c.as_ref().trim()) {
                Some(c) if !c.is_empty() => Some(parse_int(c)?),
                _ => None,
            },
            samples: None,
        })
    }

    /// Parses a summary row split on commas, or on whitespace when the row is
    /// not comma separated.
    pub fn from_row(row: &str) -> Option<Self> {
        let columns: Vec<&str> = row.split(',').collect();
        if columns.len() >= 8 {
            Self::from_columns(&columns)
        } else {
            Self::from_columns(&row.split_whitespace().collect::<Vec<_>>())
        }
    }

    /// Builds a result whose summary numbers are all derived from `samples`.
    pub fn from_statistics(samples: SampleStatistics) -> Self {
        Self {
            name: samples.name().to_string(),
            num_samples: samples.num_samples() as u64,
            min: samples.min().unwrap_or_default(),
            max: samples.max().unwrap_or_default(),
            mean: Some(samples.mean()),
            sd: Some(samples.sd()),
            median: samples.median(),
            max_rss: None,
            samples: Some(samples),
        }
    }

    pub fn with_samples(mut self, samples: SampleStatistics) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Folds another run of the same test into this one.
    ///
    /// `min` and `max` become the extrema of both runs and the sample counts
    /// are summed. When both sides carry raw samples, the other side's samples
    /// are absorbed into ours and `mean`, `sd` and `median` are recomputed
    /// from the combined set. Otherwise those three become unavailable.
    pub fn merge(&mut self, other: &PerformanceResult) {
        debug_assert_eq!(self.name, other.name);

        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.num_samples += other.num_samples;

        match (self.samples.as_mut(), other.samples.as_ref()) {
            (Some(ours), Some(theirs)) => {
                ours.absorb(theirs);
                self.mean = Some(ours.mean());
                self.sd = Some(ours.sd());
                self.median = ours.median();
                debug!(test = %self.name, samples = self.num_samples, "merged raw samples");
            }
            _ => {
                self.mean = None;
                self.sd = None;
                self.median = None;
                self.samples = None;
                debug!(test = %self.name, min = self.min, max = self.max, "merged summary rows");
            }
        }

        self.max_rss = match (self.max_rss, other.max_rss) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Integer column; decimal values are truncated.
fn parse_int(s: &str) -> Option<u64> {
    s.parse::<u64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v < u64::MAX as f64)
            .map(|v| v as u64)
    })
}

impl fmt::Display for PerformanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "<PerformanceResult name:{:?} samples:{} min:{} max:{} mean:{} sd:{} median:{}>",
            self.name,
            self.num_samples,
            self.min,
            self.max,
            opt(&self.mean),
            opt(&self.sd),
            opt(&self.median)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Sample;

    #[test]
    fn test_from_row() {
        let r = PerformanceResult::from_row("1,AngryPhonebook,20,10664,12933,11035,576,10884").unwrap();
        assert_eq!(r.name, "AngryPhonebook");
        assert_eq!(
            (r.num_samples, r.min, r.max, r.mean, r.sd, r.median),
            (20, 10664, 12933, Some(11035.0), Some(576.0), Some(10884))
        );
        assert_eq!(r.max_rss, None);
        assert!(r.samples.is_none());

        let r = PerformanceResult::from_row("1,AngryPhonebook,1,12045,12045,12045,0,12045,10510336").unwrap();
        assert_eq!(r.max_rss, Some(10510336));
    }

    #[test]
    fn test_from_row_whitespace_delimited() {
        let r = PerformanceResult::from_row("3 Array2D        20    2060    2188     2099      0       2099   20915200")
            .unwrap();
        assert_eq!(r.name, "Array2D");
        assert_eq!((r.min, r.max, r.median), (2060, 2188, Some(2099)));
        assert_eq!(r.max_rss, Some(20915200));
    }

    #[test]
    fn test_from_row_rejects_short_or_garbled_rows() {
        assert!(PerformanceResult::from_row("1,Short,3,4").is_none());
        assert!(PerformanceResult::from_row("1,Bad,x,1,2,3,4,5").is_none());
        assert!(PerformanceResult::from_row("1,,3,1,2,3,4,5").is_none());
    }

    #[test]
    fn test_display() {
        let r = PerformanceResult::from_row("1,AngryPhonebook,20,10664,12933,11035,576,10884").unwrap();
        assert_eq!(
            r.to_string(),
            "<PerformanceResult name:\"AngryPhonebook\" samples:20 min:10664 max:12933 mean:11035 sd:576 median:10884>"
        );
    }

    #[test]
    fn test_merge_summary_rows() {
        let rows = [
            "1,AngryPhonebook,1,12045,12045,12045,0,12045,10510336",
            "1,AngryPhonebook,1,12325,12325,12325,0,12325,10510336",
            "1,AngryPhonebook,1,11616,11616,11616,0,11616,10502144",
            "1,AngryPhonebook,1,12270,12270,12270,0,12270,10498048",
        ];
        let results: Vec<_> = rows
            .iter()
            .map(|row| PerformanceResult::from_row(row).unwrap())
            .collect();

        let mut r = results[0].clone();
        assert_eq!((r.min, r.max), (12045, 12045));
        r.merge(&results[1]);
        assert_eq!((r.min, r.max), (12045, 12325));
        r.merge(&results[2]);
        assert_eq!((r.min, r.max), (11616, 12325));
        r.merge(&results[3]);
        assert_eq!((r.min, r.max), (11616, 12325));

        assert_eq!(r.num_samples, 4);
        assert_eq!((r.mean, r.sd, r.median), (None, None, None));
        assert_eq!(r.max_rss, Some(10510336));
    }

    #[test]
    fn test_merge_reconciles_samples() {
        let first = SampleStatistics::from_samples(
            "ArrayAppend",
            [Sample::new(0, 1, 200), Sample::new(1, 1, 204)],
        );
        let second = SampleStatistics::from_samples(
            "ArrayAppend",
            [Sample::new(0, 1, 202), Sample::new(1, 1, 198)],
        );
        let mut r = PerformanceResult::from_row("1,ArrayAppend,2,200,204,202,2.8,204")
            .unwrap()
            .with_samples(first);
        let other = PerformanceResult::from_row("1,ArrayAppend,2,198,202,200,2.8,202")
            .unwrap()
            .with_samples(second);

        r.merge(&other);
        assert_eq!(r.num_samples, 4);
        assert_eq!((r.min, r.max), (198, 204));
        assert_eq!(r.mean, Some(201.0));
        assert_eq!(r.median, Some(202));
        assert!(r.sd.unwrap() > 0.0);
    }

    #[test]
    fn test_from_statistics_matches_summary_row() {
        let samples = [369900, 381039, 371043]
            .into_iter()
            .enumerate()
            .map(|(i, runtime)| Sample::new(i as u64, 1, runtime));
        let stats = SampleStatistics::from_samples("Array2D", samples);
        let derived = PerformanceResult::from_statistics(stats);
        let row = PerformanceResult::from_row("3,Array2D,3,369900,381039,373994,6127,371043").unwrap();

        assert_eq!(derived.num_samples, row.num_samples);
        assert_eq!((derived.min, derived.max), (row.min, row.max));
        assert_eq!(derived.median, row.median);
        assert!((derived.mean.unwrap() - row.mean.unwrap()).abs() < 1.0);
        assert!((derived.sd.unwrap() - row.sd.unwrap()).abs() < 1.0);
    }
}
