//! Job snapshot persistence
//!
//! The pipeline hands job snapshots to this seam at batch checkpoints and
//! terminal transitions. Durability and retention are the collaborator's
//! concern; the core never reads its own writes back during a scan.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::ScanJob;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobPersistence: Send + Sync {
    async fn save(&self, job: &ScanJob) -> anyhow::Result<()>;
    async fn load(&self, job_id: i64) -> anyhow::Result<Option<ScanJob>>;
}

/// Discards snapshots; the default when the product wires no storage
pub struct NullPersistence;

#[async_trait]
impl JobPersistence for NullPersistence {
    async fn save(&self, job: &ScanJob) -> anyhow::Result<()> {
        log::debug!("discarding snapshot of job {} ({})", job.id, job.status);
        Ok(())
    }

    async fn load(&self, _job_id: i64) -> anyhow::Result<Option<ScanJob>> {
        Ok(None)
    }
}

/// Keeps the latest snapshot per job in memory
pub struct MemoryPersistence {
    snapshots: Mutex<HashMap<i64, ScanJob>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobPersistence for MemoryPersistence {
    async fn save(&self, job: &ScanJob) -> anyhow::Result<()> {
        self.snapshots.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn load(&self, job_id: i64) -> anyhow::Result<Option<ScanJob>> {
        Ok(self.snapshots.lock().unwrap().get(&job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_persistence_accepts_and_returns_nothing() {
        let p = NullPersistence;
        let job = ScanJob::new(1, 1);

        p.save(&job).await.unwrap();
        assert!(p.load(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_persistence_keeps_latest_snapshot() {
        let p = MemoryPersistence::new();
        let mut job = ScanJob::new(1, 1);

        p.save(&job).await.unwrap();
        job.fail("late failure");
        p.save(&job).await.unwrap();

        let loaded = p.load(1).await.unwrap().unwrap();
        assert_eq!(loaded.status, "failed");
        assert_eq!(p.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_persistence_misses_unknown_job() {
        let p = MemoryPersistence::new();
        assert!(p.load(42).await.unwrap().is_none());
    }
}
