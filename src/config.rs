use crate::error::{Error, Result};
use crate::ReportFormat;

/// Default relative change below which a test counts as unchanged.
pub const DEFAULT_DELTA_THRESHOLD: f64 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub struct CompareConfig {
    pub delta_threshold: f64,
    pub changes_only: bool,
    pub format: ReportFormat,
    pub old_branch: String,
    pub new_branch: String,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            delta_threshold: DEFAULT_DELTA_THRESHOLD,
            changes_only: false,
            format: ReportFormat::Markdown,
            old_branch: "OLD_MIN".to_string(),
            new_branch: "NEW_MIN".to_string(),
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.delta_threshold.is_finite() || self.delta_threshold < 0.0 {
            return Err(Error::InvalidThreshold(self.delta_threshold));
        }
        Ok(())
    }
}
