//! Scan orchestration
//!
//! Owns the job state machine: `pending → processing → {completed,
//! failed}`, both end states terminal. One job processes its files in
//! fixed-size batches, strictly sequentially: the rate limiter is the real
//! parallelism bottleneck, so intra-job concurrency would only thrash it.
//! Separate repositories scan concurrently, contending on nothing but the
//! shared limiter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::sleep;

use crate::aggregator;
use crate::analyzer::Analyzer;
use crate::config::ScanConfig;
use crate::discovery::FileDiscoverer;
use crate::jobs::JobStore;
use crate::models::{JobStatus, ScanJob};
use crate::notifier::{Notification, NotificationHub};
use crate::persistence::JobPersistence;
use crate::rate_limiter::{BucketKind, RateLimiter};

/// Scan request errors
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("a scan is already running for repository {repository_id} (job {job_id})")]
    AlreadyRunning { repository_id: i64, job_id: i64 },
}

/// The pipeline owner, wired together by the process entry point
///
/// Everything is injected (no module-level state) so tests assemble a
/// service from stubs and the product assembles one from real
/// collaborators.
pub struct ScanService {
    config: ScanConfig,
    jobs: Arc<JobStore>,
    discoverer: Arc<FileDiscoverer>,
    analyzer: Arc<Analyzer>,
    limiter: Arc<RateLimiter>,
    persistence: Arc<dyn JobPersistence>,
    notifications: Arc<NotificationHub>,
    cancel_flags: Mutex<HashMap<i64, Arc<AtomicBool>>>,
}

impl ScanService {
    pub fn new(
        config: ScanConfig,
        jobs: Arc<JobStore>,
        discoverer: Arc<FileDiscoverer>,
        analyzer: Arc<Analyzer>,
        limiter: Arc<RateLimiter>,
        persistence: Arc<dyn JobPersistence>,
        notifications: Arc<NotificationHub>,
    ) -> Self {
        Self {
            config,
            jobs,
            discoverer,
            analyzer,
            limiter,
            persistence,
            notifications,
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Start a scan and return its job id immediately
    ///
    /// A repository with a live (`pending`/`processing`) job is rejected;
    /// the running job's id travels in the error so callers can poll it
    /// instead.
    pub fn start_scan(self: &Arc<Self>, repository_id: i64, root: &str) -> Result<i64, ScanError> {
        let job = self
            .jobs
            .create(repository_id)
            .map_err(|job_id| ScanError::AlreadyRunning {
                repository_id,
                job_id,
            })?;

        let cancel = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .lock()
            .unwrap()
            .insert(job.id, cancel.clone());

        let service = Arc::clone(self);
        let root = root.to_string();
        let job_id = job.id;
        tokio::spawn(async move {
            service.run_job(job_id, &root, cancel).await;
        });

        log::info!(
            "started scan job {} for repository {}",
            job_id,
            repository_id
        );
        Ok(job_id)
    }

    /// Snapshot a job for a status poller; never errors
    pub fn status(&self, job_id: i64) -> Option<ScanJob> {
        self.jobs.snapshot(job_id)
    }

    /// Request cooperative cancellation
    ///
    /// Honored at the next batch boundary; an in-flight file and its retry
    /// loop always run to completion. Returns false when the job is gone or
    /// already terminal.
    pub fn cancel(&self, job_id: i64) -> bool {
        let live = self
            .jobs
            .snapshot(job_id)
            .map(|j| !j.is_terminal())
            .unwrap_or(false);
        if !live {
            return false;
        }
        match self.cancel_flags.lock().unwrap().get(&job_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Drive one job from discovery to a terminal state
    async fn run_job(&self, job_id: i64, root: &str, cancel: Arc<AtomicBool>) {
        self.jobs
            .update(job_id, |j| j.set_status(JobStatus::Processing));

        let tasks = match self.discoverer.discover(root).await {
            Ok(tasks) => tasks,
            Err(e) => {
                self.finish_failure(job_id, &format!("file discovery failed: {}", e))
                    .await;
                return;
            }
        };

        let total = tasks.len();
        self.jobs.update(job_id, |j| j.total_files = total as i32);
        log::info!("job {}: discovered {} files", job_id, total);

        for (batch_index, batch) in tasks.chunks(self.config.batch_size).enumerate() {
            if batch_index > 0 {
                sleep(self.config.batch_delay).await;
            }

            if cancel.load(Ordering::SeqCst) {
                log::info!(
                    "job {}: cancelled at batch boundary {}",
                    job_id,
                    batch_index
                );
                self.finish_failure(job_id, "scan cancelled").await;
                return;
            }

            for task in batch {
                let result = self.analyzer.analyze(task).await;
                let counted = aggregator::count_issues_by_severity(std::slice::from_ref(&result));
                self.jobs
                    .update(job_id, move |j| j.record_result(result, counted));
            }

            self.checkpoint(job_id).await;

            if self.quota_exhausted().await {
                self.finish_failure(
                    job_id,
                    "analysis service quota exhausted; aborting remaining batches",
                )
                .await;
                return;
            }
        }

        let results = self
            .jobs
            .snapshot(job_id)
            .map(|j| j.results)
            .unwrap_or_default();
        let report = aggregator::build_report(&results);
        self.jobs.update(job_id, move |j| j.complete(report));
        self.checkpoint(job_id).await;

        if let Some(snapshot) = self.jobs.snapshot(job_id) {
            log::info!(
                "job {}: completed, {} files, {} issues",
                job_id,
                snapshot.processed_files,
                snapshot.issue_counts.total()
            );
            self.notifications
                .send(Notification::scan_completed(&snapshot));
        }
        self.clear_cancel_flag(job_id);
    }

    /// Whether the shared limiter is in its quota cooldown
    ///
    /// Checked at batch boundaries: once the remote service has signaled
    /// exhaustion, every remaining file would burn its retry budget against
    /// a refusing limiter, so the job aborts instead of grinding through.
    async fn quota_exhausted(&self) -> bool {
        self.limiter.is_exhausted(BucketKind::Minute).await
            || self.limiter.is_exhausted(BucketKind::Day).await
    }

    /// Transition to `failed`, persist, and notify with a failure payload
    async fn finish_failure(&self, job_id: i64, error: &str) {
        log::warn!("job {}: failed: {}", job_id, error);
        self.jobs.update(job_id, |j| j.fail(error));
        self.checkpoint(job_id).await;

        if let Some(snapshot) = self.jobs.snapshot(job_id) {
            self.notifications
                .send(Notification::scan_failed(&snapshot));
        }
        self.clear_cancel_flag(job_id);
    }

    /// Hand the current snapshot to the persistence collaborator
    async fn checkpoint(&self, job_id: i64) {
        if let Some(snapshot) = self.jobs.snapshot(job_id) {
            if let Err(e) = self.persistence.save(&snapshot).await {
                log::warn!("job {}: snapshot save failed: {}", job_id, e);
            }
        }
    }

    fn clear_cancel_flag(&self, job_id: i64) {
        self.cancel_flags.lock().unwrap().remove(&job_id);
    }
}
