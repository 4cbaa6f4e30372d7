use serde::{Deserialize, Serialize};

/// Classified issue totals across a set of analysis results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueCounts {
    pub high: i32,
    pub medium: i32,
    pub low: i32,
}

impl IssueCounts {
    pub fn total(&self) -> i32 {
        self.high + self.medium + self.low
    }
}

/// Final aggregate computed when a job reaches a terminal state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    pub issue_counts: IssueCounts,
    pub risk_score: i64,
    pub risk_message: String,
    pub best_practices: Vec<String>,
    pub files_analyzed: i32,
}
