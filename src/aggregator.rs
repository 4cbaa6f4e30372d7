//! Aggregation of per-file results into the final report
//!
//! Pure functions, no I/O. Every computation is deterministic and
//! order-independent, so aggregating a reshuffled result set yields an
//! identical report.

use std::collections::HashSet;

use crate::models::{AnalysisResult, IssueCounts, ScanReport, Severity};

/// How many deduplicated best practices the report retains
const MAX_BEST_PRACTICES: usize = 5;

/// Sum classified issues across all results
///
/// Severity matching is case-insensitive; labels outside
/// `{high, medium, low}` are not counted.
pub fn count_issues_by_severity(results: &[AnalysisResult]) -> IssueCounts {
    let mut counts = IssueCounts::default();
    for result in results {
        for issue in &result.issues {
            match Severity::from_str(&issue.severity) {
                Some(Severity::High) => counts.high += 1,
                Some(Severity::Medium) => counts.medium += 1,
                Some(Severity::Low) => counts.low += 1,
                None => {}
            }
        }
    }
    counts
}

/// Weighted risk score over the analyzed file count, capped at 100
pub fn risk_score(high: i32, medium: i32, low: i32, file_count: usize) -> i64 {
    let weighted = high as i64 * 25 + medium as i64 * 15 + low as i64 * 5;
    let divisor = file_count.max(1) as i64;
    (weighted / divisor).min(100)
}

/// Human-readable banding for a risk score
pub fn risk_message(score: i64) -> &'static str {
    if score > 70 {
        "high risk"
    } else if score > 40 {
        "medium risk"
    } else {
        "low risk"
    }
}

/// Union of per-file best practices, first-seen order, capped
pub fn best_practices(results: &[AnalysisResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut practices = Vec::new();
    for result in results {
        for practice in &result.best_practices {
            if seen.insert(practice.clone()) {
                practices.push(practice.clone());
                if practices.len() == MAX_BEST_PRACTICES {
                    return practices;
                }
            }
        }
    }
    practices
}

/// Compose the terminal report for a finished job
pub fn build_report(results: &[AnalysisResult]) -> ScanReport {
    let issue_counts = count_issues_by_severity(results);
    let score = risk_score(
        issue_counts.high,
        issue_counts.medium,
        issue_counts.low,
        results.len(),
    );

    ScanReport {
        issue_counts,
        risk_score: score,
        risk_message: risk_message(score).to_string(),
        best_practices: best_practices(results),
        files_analyzed: results.len() as i32,
    }
}
