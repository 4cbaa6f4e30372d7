use serde::{Deserialize, Serialize};

/// One unit of analysis work produced by discovery
///
/// Content is not fetched at discovery time; `content_ref` is an opaque
/// retrieval handle resolved by the content store when the file is analyzed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileTask {
    pub path: String,
    pub size_bytes: u64,
    pub content_ref: String,
}
