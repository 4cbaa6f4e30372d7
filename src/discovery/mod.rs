//! Repository file discovery
//!
//! Walks a repository tree through the content store and produces the flat,
//! order-stable task list the orchestrator batches over. Content itself is
//! never fetched here; discovery stays cheap so a scan's cost is bounded by
//! what the analyzer actually reads.

pub mod constants;
pub mod language;

use std::sync::Arc;

use crate::content::{ContentStore, ContentStoreError, EntryKind, TreeEntry};
use crate::models::FileTask;

pub use constants::{BINARY_EXTENSIONS, MAX_DISCOVER_BYTES, SKIP_DIRECTORIES};
pub use language::language_for_path;

/// Discovery errors. Only a failure to list the repository root itself is
/// fatal; subtree failures degrade to partial results.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to list repository root: {0}")]
    RootListing(#[source] ContentStoreError),
}

pub struct FileDiscoverer {
    store: Arc<dyn ContentStore>,
    max_file_bytes: u64,
}

impl FileDiscoverer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            max_file_bytes: MAX_DISCOVER_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max: u64) -> Self {
        self.max_file_bytes = max;
        self
    }

    /// Enumerate every analyzable file under `root`
    ///
    /// Depth-first, entries sorted per directory, so the same tree state
    /// always yields the same list. A listing failure below the root logs
    /// a warning and prunes only that subtree.
    pub async fn discover(&self, root: &str) -> Result<Vec<FileTask>, DiscoveryError> {
        let mut tasks = Vec::new();
        let mut stack: Vec<String> = Vec::new();

        let entries = self
            .store
            .list_dir(root)
            .await
            .map_err(DiscoveryError::RootListing)?;
        self.collect(entries, &mut tasks, &mut stack);

        while let Some(dir) = stack.pop() {
            match self.store.list_dir(&dir).await {
                Ok(entries) => self.collect(entries, &mut tasks, &mut stack),
                Err(e) => {
                    log::warn!("skipping unreadable subtree {}: {}", dir, e);
                }
            }
        }

        Ok(tasks)
    }

    fn collect(&self, mut entries: Vec<TreeEntry>, tasks: &mut Vec<FileTask>, stack: &mut Vec<String>) {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subdirs = Vec::new();
        for entry in entries {
            match entry.kind {
                EntryKind::Directory => {
                    if should_skip_directory(&entry.name) {
                        continue;
                    }
                    subdirs.push(entry.path);
                }
                EntryKind::File {
                    size_bytes,
                    content_ref,
                } => {
                    if !should_scan_file(&entry.name, size_bytes, self.max_file_bytes) {
                        continue;
                    }
                    tasks.push(FileTask {
                        path: entry.path,
                        size_bytes,
                        content_ref,
                    });
                }
            }
        }

        // Reverse so the stack pops subdirectories in sorted order
        for dir in subdirs.into_iter().rev() {
            stack.push(dir);
        }
    }
}

/// Directories that never contain first-party source
fn should_skip_directory(name: &str) -> bool {
    SKIP_DIRECTORIES.contains(&name) || name.starts_with('.')
}

/// Hidden files, binary assets, and oversized files are not scannable
fn should_scan_file(name: &str, size_bytes: u64, max_bytes: u64) -> bool {
    if name.starts_with('.') {
        return false;
    }
    if size_bytes == 0 || size_bytes > max_bytes {
        return false;
    }
    let lower = name.to_ascii_lowercase();
    !BINARY_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}
