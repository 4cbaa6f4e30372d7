use serde::{Deserialize, Serialize};

use super::{AnalysisResult, IssueCounts, ScanReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Completed and failed are terminal; no transition leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Represents one scan job's full lifecycle state
///
/// Created `pending` by the scan request, exclusively mutated by the
/// orchestrator for the job's lifetime, and read by status pollers as
/// cloned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanJob {
    pub id: i64,
    pub repository_id: i64,
    pub status: String,
    pub progress_percent: i32,
    pub total_files: i32,
    pub processed_files: i32,
    pub issue_counts: IssueCounts,
    pub results: Vec<AnalysisResult>,
    pub report: Option<ScanReport>,
    pub error: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl ScanJob {
    pub fn new(id: i64, repository_id: i64) -> Self {
        Self {
            id,
            repository_id,
            status: JobStatus::Pending.as_str().to_string(),
            progress_percent: 0,
            total_files: 0,
            processed_files: 0,
            issue_counts: IssueCounts::default(),
            results: Vec::new(),
            report: None,
            error: None,
            started_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }

    pub fn get_status(&self) -> Option<JobStatus> {
        JobStatus::from_str(&self.status)
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status.as_str().to_string();
    }

    pub fn is_terminal(&self) -> bool {
        self.get_status().map(|s| s.is_terminal()).unwrap_or(false)
    }

    /// Record one finished file and recompute visible progress
    pub fn record_result(&mut self, result: AnalysisResult, counted: IssueCounts) {
        self.processed_files += 1;
        self.issue_counts.high += counted.high;
        self.issue_counts.medium += counted.medium;
        self.issue_counts.low += counted.low;
        self.progress_percent = if self.total_files > 0 {
            (self.processed_files as f64 / self.total_files as f64 * 100.0).floor() as i32
        } else {
            100
        };
        self.results.push(result);
    }

    pub fn complete(&mut self, report: ScanReport) {
        self.report = Some(report);
        self.completed_at = Some(chrono::Utc::now().to_rfc3339());
        self.set_status(JobStatus::Completed);
    }

    pub fn fail(&mut self, error: &str) {
        self.error = Some(error.to_string());
        self.completed_at = Some(chrono::Utc::now().to_rfc3339());
        self.set_status(JobStatus::Failed);
    }
}
