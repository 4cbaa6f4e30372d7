//! In-memory job table
//!
//! One entry per scan job, written only by the orchestrator and read by
//! status pollers as cloned snapshots, so a poll never observes a job mid-
//! mutation. State lives for the process lifetime: a restart loses every
//! job, and durable history is the persistence collaborator's concern.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::models::ScanJob;

pub struct JobStore {
    jobs: RwLock<HashMap<i64, ScanJob>>,
    next_id: AtomicI64,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a pending job for a repository, unless one is already live
    ///
    /// The check and the insert hold the same write lock, so two
    /// concurrent requests for one repository cannot both win.
    pub fn create(&self, repository_id: i64) -> Result<ScanJob, i64> {
        let mut jobs = self.jobs.write().unwrap();
        if let Some(existing) = jobs
            .values()
            .find(|j| j.repository_id == repository_id && !j.is_terminal())
        {
            return Err(existing.id);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = ScanJob::new(id, repository_id);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    /// Snapshot a job for a status poller
    pub fn snapshot(&self, job_id: i64) -> Option<ScanJob> {
        self.jobs.read().unwrap().get(&job_id).cloned()
    }

    /// Mutate a job in place; returns false when the job is gone
    pub fn update<F>(&self, job_id: i64, f: F) -> bool
    where
        F: FnOnce(&mut ScanJob),
    {
        let mut jobs = self.jobs.write().unwrap();
        match jobs.get_mut(&job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    /// The live (non-terminal) job for a repository, if any
    pub fn active_job_for_repository(&self, repository_id: i64) -> Option<i64> {
        self.jobs
            .read()
            .unwrap()
            .values()
            .find(|j| j.repository_id == repository_id && !j.is_terminal())
            .map(|j| j.id)
    }

    /// Evict terminal jobs that finished longer than `retention` ago
    ///
    /// The table grows without bound unless the owner calls this; the core
    /// schedules no eviction of its own. Returns how many jobs were
    /// evicted.
    pub fn prune_finished(&self, retention: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - retention;
        let mut jobs = self.jobs.write().unwrap();
        let before = jobs.len();
        jobs.retain(|_, job| {
            let finished_before_cutoff = job.is_terminal()
                && job
                    .completed_at
                    .as_deref()
                    .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&chrono::Utc) < cutoff)
                    .unwrap_or(false);
            !finished_before_cutoff
        });
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;

    #[test]
    fn test_create_assigns_increasing_ids() {
        let store = JobStore::new();
        let a = store.create(1).unwrap();
        let b = store.create(2).unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_create_rejects_duplicate_live_job() {
        let store = JobStore::new();
        let job = store.create(1).unwrap();

        let err = store.create(1).unwrap_err();
        assert_eq!(err, job.id);

        // A different repository is unaffected
        assert!(store.create(2).is_ok());
    }

    #[test]
    fn test_create_allows_rescan_after_terminal() {
        let store = JobStore::new();
        let job = store.create(1).unwrap();

        store.update(job.id, |j| j.fail("boom"));
        assert!(store.create(1).is_ok());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = JobStore::new();
        let job = store.create(1).unwrap();

        let snapshot = store.snapshot(job.id).unwrap();
        store.update(job.id, |j| j.set_status(JobStatus::Processing));

        assert_eq!(snapshot.status, "pending");
        assert_eq!(store.snapshot(job.id).unwrap().status, "processing");
    }

    #[test]
    fn test_update_missing_job_returns_false() {
        let store = JobStore::new();
        assert!(!store.update(99, |j| j.fail("nope")));
        assert!(store.snapshot(99).is_none());
    }

    #[test]
    fn test_active_job_lookup() {
        let store = JobStore::new();
        let job = store.create(5).unwrap();

        assert_eq!(store.active_job_for_repository(5), Some(job.id));
        assert_eq!(store.active_job_for_repository(6), None);

        store.update(job.id, |j| {
            j.complete(crate::aggregator::build_report(&[]))
        });
        assert_eq!(store.active_job_for_repository(5), None);
    }

    #[test]
    fn test_prune_finished_evicts_only_old_terminal_jobs() {
        let store = JobStore::new();
        let done = store.create(1).unwrap();
        let live = store.create(2).unwrap();

        store.update(done.id, |j| {
            j.fail("old failure");
            // Finished two hours ago
            j.completed_at =
                Some((chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339());
        });

        let evicted = store.prune_finished(chrono::Duration::hours(1));
        assert_eq!(evicted, 1);
        assert!(store.snapshot(done.id).is_none());
        assert!(store.snapshot(live.id).is_some());
    }

    #[test]
    fn test_prune_keeps_recently_finished_jobs() {
        let store = JobStore::new();
        let job = store.create(1).unwrap();
        store.update(job.id, |j| j.fail("fresh failure"));

        assert_eq!(store.prune_finished(chrono::Duration::hours(1)), 0);
        assert!(store.snapshot(job.id).is_some());
    }
}
