//! Discovery constants and configuration
//!
//! Centralized constants used across discovery modules

/// Directories to skip during repository traversal
///
/// These directories are commonly used for dependencies, build artifacts,
/// caches, and version control. Scanning them would waste analysis quota
/// and produce noise findings.
pub const SKIP_DIRECTORIES: &[&str] = &[
    // Dependencies
    "node_modules",
    "vendor",
    // Bundled/static assets
    "assets",
    "public",
    "static",
    // Version control
    ".git",
    // Python virtual environments and caches
    "venv",
    ".venv",
    "__pycache__",
    ".pytest_cache",
    ".tox",
    // Build outputs
    "dist",
    "build",
    "out",
    "target",
    // Package manager and tooling
    ".cargo",
    ".next",
    ".cache",
    "coverage",
];

/// File extensions that never contain analyzable source
pub const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "pdf", "zip", "tar", "gz", "bz2", "7z",
    "woff", "woff2", "ttf", "eot", "mp3", "mp4", "mov", "avi", "exe", "dll", "so", "dylib",
    "class", "pyc", "wasm", "lock", "min.js", "min.css",
];

/// Files larger than this are dropped at listing time
pub const MAX_DISCOVER_BYTES: u64 = 1_048_576;
