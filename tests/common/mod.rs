//! Common test helpers for integration tests
//!
//! Provides isolated fixture repositories on disk, a scriptable analysis
//! service, collaborator test doubles, and a fully wired `ScanService`
//! with fast pacing so suites run against virtual time.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use repoguard::{
    AnalysisService, AnalysisServiceError, Analyzer, ContentStore, ContentStoreError,
    FileDiscoverer, JobStore, LocalContentStore, MemoryPersistence, Notification,
    NotificationHub, Notifier, RateLimiter, RateLimiterConfig, RetryConfig, RetryExecutor,
    ScanConfig, ScanJob, ScanService,
};

/// Fixture repository in a temporary directory
pub struct TestRepo {
    dir: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories as needed
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn store(&self) -> Arc<LocalContentStore> {
        Arc::new(LocalContentStore::new(self.dir.path()).unwrap())
    }
}

type Responder = Box<dyn Fn() -> Result<String, AnalysisServiceError> + Send + Sync>;

/// Analysis service double scripted per file path
///
/// Rules match on a substring of the submitted prompt (the prompt embeds
/// the file path); the first match wins, otherwise the default responder
/// answers.
pub struct ScriptedAnalysis {
    rules: Vec<(String, Responder)>,
    default: Responder,
    calls: AtomicU32,
}

impl ScriptedAnalysis {
    pub fn always(response: &str) -> Self {
        let response = response.to_string();
        Self {
            rules: Vec::new(),
            default: Box::new(move || Ok(response.clone())),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_failing<F>(f: F) -> Self
    where
        F: Fn() -> AnalysisServiceError + Send + Sync + 'static,
    {
        Self {
            rules: Vec::new(),
            default: Box::new(move || Err(f())),
            calls: AtomicU32::new(0),
        }
    }

    /// Add a path-matched rule
    pub fn on(mut self, path_fragment: &str, response: &str) -> Self {
        let response = response.to_string();
        self.rules.push((
            path_fragment.to_string(),
            Box::new(move || Ok(response.clone())),
        ));
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn submit(&self, prompt: &str) -> Result<String, AnalysisServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (fragment, responder) in &self.rules {
            if prompt.contains(fragment.as_str()) {
                return responder();
            }
        }
        (self.default)()
    }
}

/// Delegating store that fails content fetches for matching refs
pub struct FailingFetchStore {
    inner: Arc<LocalContentStore>,
    fail_fragment: String,
}

impl FailingFetchStore {
    pub fn new(inner: Arc<LocalContentStore>, fail_fragment: &str) -> Self {
        Self {
            inner,
            fail_fragment: fail_fragment.to_string(),
        }
    }
}

#[async_trait]
impl ContentStore for FailingFetchStore {
    async fn list_dir(
        &self,
        path: &str,
    ) -> Result<Vec<repoguard::content::TreeEntry>, ContentStoreError> {
        self.inner.list_dir(path).await
    }

    async fn get_content(&self, content_ref: &str) -> Result<Vec<u8>, ContentStoreError> {
        if content_ref.contains(&self.fail_fragment) {
            return Err(ContentStoreError::FetchFailed {
                content_ref: content_ref.to_string(),
                reason: "simulated fetch failure".to_string(),
            });
        }
        self.inner.get_content(content_ref).await
    }
}

/// Notifier double that records every delivery
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(notification);
        Ok(())
    }
}

/// A fully wired scan service plus handles to its collaborator doubles
pub struct Harness {
    pub service: Arc<ScanService>,
    pub limiter: Arc<RateLimiter>,
    pub persistence: Arc<MemoryPersistence>,
    pub notifier: Arc<CollectingNotifier>,
}

/// Pacing tuned so paused-clock tests finish instantly
pub fn fast_config() -> ScanConfig {
    ScanConfig {
        batch_size: 5,
        batch_delay: Duration::from_millis(200),
        ..ScanConfig::default()
    }
}

/// A limiter with enough headroom that admission never paces the test
pub fn open_limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::with_config(RateLimiterConfig {
        max_requests_per_minute: 10_000,
        max_requests_per_day: 100_000,
        enabled: true,
    }))
}

pub fn build_harness(
    store: Arc<dyn ContentStore>,
    analysis: Arc<ScriptedAnalysis>,
    config: ScanConfig,
) -> Harness {
    build_harness_with_limiter(store, analysis, config, open_limiter())
}

pub fn build_harness_with_limiter(
    store: Arc<dyn ContentStore>,
    analysis: Arc<ScriptedAnalysis>,
    config: ScanConfig,
    limiter: Arc<RateLimiter>,
) -> Harness {
    let retry = RetryExecutor::with_config(
        limiter.clone(),
        RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 10,
            backoff_multiplier: 2.0,
        },
    );
    let analyzer = Arc::new(
        Analyzer::new(store.clone(), analysis, retry)
            .with_max_content_bytes(config.max_content_bytes),
    );
    let discoverer =
        Arc::new(FileDiscoverer::new(store).with_max_file_bytes(config.max_discover_bytes));
    let persistence = Arc::new(MemoryPersistence::new());
    let notifier = Arc::new(CollectingNotifier::new());
    let notifications = Arc::new(NotificationHub::new(notifier.clone()));

    let service = Arc::new(ScanService::new(
        config,
        Arc::new(JobStore::new()),
        discoverer,
        analyzer,
        limiter.clone(),
        persistence.clone(),
        notifications,
    ));

    Harness {
        service,
        limiter,
        persistence,
        notifier,
    }
}

/// Poll a job to its terminal state under virtual time
pub async fn wait_terminal(service: &Arc<ScanService>, job_id: i64) -> ScanJob {
    for _ in 0..20_000 {
        let snapshot = service.status(job_id).expect("job must exist");
        if snapshot.is_terminal() {
            return snapshot;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

/// Wait for the notification hub worker to drain deliveries
pub async fn wait_notifications(notifier: &Arc<CollectingNotifier>, count: usize) {
    for _ in 0..1_000 {
        if notifier.notifications().len() >= count {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} notifications, saw {:?}",
        count,
        notifier.notifications()
    );
}

/// Canned response with a single issue at the given severity
pub fn issue_response(severity: &str) -> String {
    format!(
        r#"{{"summary":{{"riskScore":60,"message":"issues found"}},
            "issues":[{{"title":"Finding","severity":"{}","description":"problem","line":1,"recommendation":"fix it"}}],
            "metrics":{{"complexity":3,"maintainability":70}},
            "bestPractices":["validate inputs"]}}"#,
        severity
    )
}

/// Canned clean-file response
pub fn clean_response() -> String {
    r#"{"summary":{"riskScore":5,"message":"clean"},"issues":[],"metrics":{"complexity":1,"maintainability":95},"bestPractices":[]}"#
        .to_string()
}
