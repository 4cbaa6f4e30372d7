//! Per-file analysis
//!
//! Fetches a file's content, runs it through the remote model under
//! admission control and retry, and parses the response defensively. A
//! single file's total failure never escapes this module; it degrades to
//! an [`AnalysisResult`] with `success: false`.

pub mod gemini;
pub mod prompt;
pub mod response;
pub mod service;

use std::sync::Arc;

use crate::content::ContentStore;
use crate::discovery::language_for_path;
use crate::models::{AnalysisResult, FileTask};
use crate::retry::RetryExecutor;

pub use gemini::GeminiClient;
pub use prompt::build_analysis_prompt;
pub use response::{finalize, parse_response, ParsedAnalysis, RawAnalysis};
pub use service::{AnalysisService, AnalysisServiceError};

/// Hard cap on content handed to the remote model. Larger files are counted
/// as processed but never analyzed; this bounds cost and avoids burning
/// quota on input the model handles poorly anyway.
pub const MAX_CONTENT_BYTES: usize = 100_000;

pub struct Analyzer {
    store: Arc<dyn ContentStore>,
    service: Arc<dyn AnalysisService>,
    retry: RetryExecutor,
    max_content_bytes: usize,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn ContentStore>,
        service: Arc<dyn AnalysisService>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            store,
            service,
            retry,
            max_content_bytes: MAX_CONTENT_BYTES,
        }
    }

    pub fn with_max_content_bytes(mut self, max: usize) -> Self {
        self.max_content_bytes = max;
        self
    }

    /// Analyze one discovered file
    ///
    /// Every outcome is an `AnalysisResult`; fetch failures, oversized
    /// content, exhausted retries, and unparseable responses all land in
    /// the result with `success: false` and the reason recorded.
    pub async fn analyze(&self, task: &FileTask) -> AnalysisResult {
        let language = language_for_path(&task.path);

        let bytes = match self.store.get_content(&task.content_ref).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("content fetch failed for {}: {}", task.path, e);
                return AnalysisResult::failed(
                    &task.path,
                    language,
                    &format!("content fetch failed: {}", e),
                );
            }
        };

        if bytes.is_empty() {
            return AnalysisResult::skipped(&task.path, language, "skipped: empty file");
        }
        if bytes.len() > self.max_content_bytes {
            return AnalysisResult::skipped(
                &task.path,
                language,
                &format!(
                    "skipped: {} bytes exceeds the {}-byte analysis cap",
                    bytes.len(),
                    self.max_content_bytes
                ),
            );
        }

        let code = String::from_utf8_lossy(&bytes);
        let prompt = build_analysis_prompt(&task.path, language, &code);

        let response_text = match self.retry.execute(|| self.service.submit(&prompt)).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("analysis failed for {}: {}", task.path, e);
                return AnalysisResult::failed(
                    &task.path,
                    language,
                    &format!("analysis failed: {}", e),
                );
            }
        };

        match parse_response(&response_text) {
            ParsedAnalysis::Structured(raw) => finalize(raw, &task.path, language),
            ParsedAnalysis::Recovered(raw) => {
                log::debug!("recovered malformed response for {}", task.path);
                finalize(raw, &task.path, language)
            }
            ParsedAnalysis::Unusable { reason } => AnalysisResult::failed(
                &task.path,
                language,
                &format!("unparseable analysis response: {}", reason),
            ),
        }
    }
}
