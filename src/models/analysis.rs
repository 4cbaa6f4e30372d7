use serde::{Deserialize, Serialize};

use super::Issue;

/// Overall verdict for one analyzed file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    /// Clamped to 0..=100 on ingestion
    pub risk_score: i64,
    pub message: String,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            risk_score: 0,
            message: String::new(),
        }
    }
}

/// Code-quality metrics reported by the model, free-form scale
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeMetrics {
    pub complexity: Option<i64>,
    pub maintainability: Option<i64>,
}

/// Per-file analysis outcome
///
/// Produced exactly once per discovered file and owned by the job's result
/// list. Every failure mode lands here as `success: false` with `error`
/// populated; the analyzer never propagates a per-file error upward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub file: String,
    pub language: String,
    pub success: bool,
    pub issues: Vec<Issue>,
    pub summary: Summary,
    pub metrics: CodeMetrics,
    pub best_practices: Vec<String>,
    pub error: Option<String>,
}

impl AnalysisResult {
    /// A file that was counted but never analyzed (empty, oversized)
    pub fn skipped(file: &str, language: &str, reason: &str) -> Self {
        Self {
            file: file.to_string(),
            language: language.to_string(),
            success: false,
            issues: Vec::new(),
            summary: Summary::default(),
            metrics: CodeMetrics::default(),
            best_practices: Vec::new(),
            error: Some(reason.to_string()),
        }
    }

    /// A file whose analysis failed outright (fetch error, retries exhausted)
    pub fn failed(file: &str, language: &str, error: &str) -> Self {
        Self::skipped(file, language, error)
    }
}
