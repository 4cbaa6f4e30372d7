//! Repository content access
//!
//! The pipeline never talks to a concrete source-control vendor; it reads
//! trees and file contents through the [`ContentStore`] seam. A subtree
//! listing failure is surfaced per call so discovery can prune just that
//! subtree instead of aborting the scan.

pub mod local;

use async_trait::async_trait;

pub use local::LocalContentStore;

/// Content store errors
#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("listing failed for {path}: {reason}")]
    ListFailed { path: String, reason: String },
    #[error("content fetch failed for {content_ref}: {reason}")]
    FetchFailed {
        content_ref: String,
        reason: String,
    },
    #[error("path escapes the store root: {0}")]
    OutsideRoot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File {
        size_bytes: u64,
        /// Opaque retrieval handle passed back to `get_content`
        content_ref: String,
    },
}

/// One entry of a single-level directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    /// Repository-relative path
    pub path: String,
    pub kind: EntryKind,
}

/// Read access to a repository tree
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List one directory level; the empty path is the repository root
    async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>, ContentStoreError>;

    /// Fetch the bytes behind a content ref produced by `list_dir`
    async fn get_content(&self, content_ref: &str) -> Result<Vec<u8>, ContentStoreError>;
}
