use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "low")]
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parse a severity label case-insensitively.
    ///
    /// The remote model is instructed to emit lower-case labels but is not
    /// trusted to; anything outside the known set maps to `None` so callers
    /// can drop it from counts instead of inventing a level.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn numeric_value(&self) -> i32 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }
}

/// A single finding reported for one file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub title: String,
    /// Lower-cased on ingestion; may hold an unrecognized label, in which
    /// case the issue is listed but excluded from severity counts.
    pub severity: String,
    pub description: String,
    pub line: Option<i64>,
    pub recommendation: String,
    /// Attached by the analyzer, not part of the raw model response
    pub file: String,
}

impl Issue {
    /// Classified severity, if the label is one of the known levels
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::from_str(&self.severity)
    }
}
