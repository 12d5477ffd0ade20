use clap::ValueEnum;

pub mod compare;
pub mod config;
pub mod error;
pub mod parser;
pub mod report;
pub mod result;
pub mod samples;
pub mod schema;

pub use compare::{compare, ResultComparison, TestComparator};
pub use config::CompareConfig;
pub use error::{Error, Result};
pub use parser::{results_from_file, results_from_files, results_from_str, LogParser, ResultMap};
pub use result::PerformanceResult;
pub use samples::{Sample, SampleStatistics};

/// Output encoding of the comparison report.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum ReportFormat {
    /// GitHub-flavoured markdown with collapsible sections.
    #[default]
    Markdown,
    /// Plain fixed-width text, suitable for commit messages.
    Git,
    /// Standalone styled HTML document.
    Html,
    /// Machine-readable JSON.
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Git => "git",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
        }
    }
}
