//! Local-filesystem content store
//!
//! Backs the terminal scan driver and the integration tests. Content refs
//! are absolute paths; every path handed back in is checked against the
//! store root so a crafted ref cannot read outside the repository.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use super::{ContentStore, ContentStoreError, EntryKind, TreeEntry};

pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Create a store rooted at an existing directory
    pub fn new(root: &Path) -> Result<Self, ContentStoreError> {
        let root = root
            .canonicalize()
            .map_err(|e| ContentStoreError::NotFound(format!("{}: {}", root.display(), e)))?;
        if !root.is_dir() {
            return Err(ContentStoreError::NotFound(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Resolve a repository-relative path, refusing escapes from the root
    fn resolve(&self, rel: &str) -> Result<PathBuf, ContentStoreError> {
        let joined = if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        };
        let resolved = joined
            .canonicalize()
            .map_err(|_| ContentStoreError::NotFound(rel.to_string()))?;
        if !resolved.starts_with(&self.root) {
            return Err(ContentStoreError::OutsideRoot(rel.to_string()));
        }
        Ok(resolved)
    }

    fn relative(&self, abs: &Path) -> String {
        abs.strip_prefix(&self.root)
            .unwrap_or(abs)
            .to_string_lossy()
            .to_string()
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>, ContentStoreError> {
        let dir = self.resolve(path)?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ContentStoreError::ListFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            let rel = self.relative(entry.path());

            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else if entry.file_type().is_file() {
                let size_bytes = entry
                    .metadata()
                    .map_err(|e| ContentStoreError::ListFailed {
                        path: path.to_string(),
                        reason: e.to_string(),
                    })?
                    .len();
                EntryKind::File {
                    size_bytes,
                    content_ref: entry.path().to_string_lossy().to_string(),
                }
            } else {
                // Symlinks and specials are not scannable
                continue;
            };

            entries.push(TreeEntry {
                name,
                path: rel,
                kind,
            });
        }

        Ok(entries)
    }

    async fn get_content(&self, content_ref: &str) -> Result<Vec<u8>, ContentStoreError> {
        let path = PathBuf::from(content_ref)
            .canonicalize()
            .map_err(|_| ContentStoreError::NotFound(content_ref.to_string()))?;
        if !path.starts_with(&self.root) {
            return Err(ContentStoreError::OutsideRoot(content_ref.to_string()));
        }
        std::fs::read(&path).map_err(|e| ContentStoreError::FetchFailed {
            content_ref: content_ref.to_string(),
            reason: e.to_string(),
        })
    }
}
