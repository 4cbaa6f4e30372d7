use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use repoguard::{
    Analyzer, FileDiscoverer, GeminiClient, JobStore, LocalContentStore, LogNotifier,
    NotificationHub, NullPersistence, RateLimiter, RetryExecutor, ScanConfig, ScanService,
};

// Minimal CLI helper to run repoguard scans from the terminal.
// Usage: cargo run --bin repo_scan -- <repository_path>
// Requires GEMINI_API_KEY in the environment or a .env file.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    repoguard::utils::load_env().ok();
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let repo_path = PathBuf::from(
        args.next()
            .expect("usage: repo_scan <repository_path>"),
    );

    if !repo_path.exists() {
        anyhow::bail!("repository path does not exist: {}", repo_path.display());
    }

    let config = ScanConfig::from_env();

    let store = Arc::new(LocalContentStore::new(&repo_path)?);
    let limiter = Arc::new(RateLimiter::new());
    let retry = RetryExecutor::new(limiter.clone());
    let client = Arc::new(GeminiClient::new()?);

    let analyzer = Arc::new(
        Analyzer::new(store.clone(), client, retry).with_max_content_bytes(config.max_content_bytes),
    );
    let discoverer =
        Arc::new(FileDiscoverer::new(store).with_max_file_bytes(config.max_discover_bytes));
    let notifications = Arc::new(NotificationHub::new(Arc::new(LogNotifier)));

    let service = Arc::new(ScanService::new(
        config,
        Arc::new(JobStore::new()),
        discoverer,
        analyzer,
        limiter,
        Arc::new(NullPersistence),
        notifications,
    ));

    let start = Instant::now();
    let job_id = service.start_scan(1, "")?;
    println!("started scan job {} for {}", job_id, repo_path.display());

    let job = loop {
        let snapshot = service
            .status(job_id)
            .expect("job vanished from the store");

        println!(
            "status={} progress={}% files={}/{} issues(h/m/l)={}/{}/{}",
            snapshot.status,
            snapshot.progress_percent,
            snapshot.processed_files,
            snapshot.total_files,
            snapshot.issue_counts.high,
            snapshot.issue_counts.medium,
            snapshot.issue_counts.low,
        );

        if snapshot.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    };

    let elapsed = start.elapsed();
    println!();

    match (job.report, job.error) {
        (Some(report), _) => {
            println!(
                "scan completed in {:.1}s: {} (risk score {})",
                elapsed.as_secs_f64(),
                report.risk_message,
                report.risk_score
            );
            println!(
                "issues: {} high, {} medium, {} low across {} files",
                report.issue_counts.high,
                report.issue_counts.medium,
                report.issue_counts.low,
                report.files_analyzed
            );
            if !report.best_practices.is_empty() {
                println!("recommended practices:");
                for practice in &report.best_practices {
                    println!("  - {}", practice);
                }
            }
        }
        (None, Some(error)) => {
            println!("scan failed after {:.1}s: {}", elapsed.as_secs_f64(), error);
        }
        (None, None) => {
            println!("scan ended without a report");
        }
    }

    Ok(())
}
