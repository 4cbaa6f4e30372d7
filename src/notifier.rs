//! Scan notifications
//!
//! Terminal job transitions raise a notification. Delivery is best-effort
//! and decoupled from the orchestration loop: the orchestrator drops a
//! payload into a channel and moves on, a worker task forwards it to the
//! notifier collaborator, and a delivery failure is logged and discarded;
//! it can never fail a scan.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use std::sync::Arc;

use crate::models::ScanJob;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ScanCompleted,
    ScanFailed,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ScanCompleted => "scan_completed",
            NotificationKind::ScanFailed => "scan_failed",
        }
    }
}

/// Payload handed to the notifier collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub repository_id: i64,
    pub job_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

impl Notification {
    /// Build the completion notification from a terminal job snapshot
    pub fn scan_completed(job: &ScanJob) -> Self {
        let (score, message) = job
            .report
            .as_ref()
            .map(|r| (r.risk_score, r.risk_message.clone()))
            .unwrap_or((0, "low risk".to_string()));

        Self {
            repository_id: job.repository_id,
            job_id: job.id,
            kind: NotificationKind::ScanCompleted,
            title: "Scan completed".to_string(),
            message: format!(
                "Analyzed {} files: {} ({} issues)",
                job.processed_files,
                message,
                job.issue_counts.total()
            ),
            metadata: serde_json::json!({
                "risk_score": score,
                "high": job.issue_counts.high,
                "medium": job.issue_counts.medium,
                "low": job.issue_counts.low,
            }),
        }
    }

    /// Build the failure notification from a terminal job snapshot
    pub fn scan_failed(job: &ScanJob) -> Self {
        Self {
            repository_id: job.repository_id,
            job_id: job.id,
            kind: NotificationKind::ScanFailed,
            title: "Scan failed".to_string(),
            message: job
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
            metadata: serde_json::json!({
                "processed_files": job.processed_files,
                "total_files": job.total_files,
            }),
        }
    }
}

/// Outbound notification delivery
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Default notifier that writes to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        log::info!(
            "[{}] job {} repo {}: {} - {}",
            notification.kind.as_str(),
            notification.job_id,
            notification.repository_id,
            notification.title,
            notification.message
        );
        Ok(())
    }
}

/// Channel-backed dispatch between the orchestrator and the notifier
pub struct NotificationHub {
    tx: async_channel::Sender<Notification>,
    #[allow(dead_code)]
    worker_handle: JoinHandle<()>,
}

impl NotificationHub {
    /// Spawn the delivery worker around a notifier implementation
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = async_channel::unbounded::<Notification>();

        let worker_handle = tokio::spawn(async move {
            while let Ok(notification) = rx.recv().await {
                let job_id = notification.job_id;
                if let Err(e) = notifier.notify(notification).await {
                    log::warn!("notification delivery failed for job {}: {}", job_id, e);
                }
            }
        });

        Self { tx, worker_handle }
    }

    /// Fire and forget; an undeliverable payload is logged, never an error
    pub fn send(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            log::warn!("notification dropped: {}", e);
        }
    }
}
