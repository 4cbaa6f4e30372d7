//! Language detection from file extensions
//!
//! The analysis prompt names the file's language so the model applies the
//! right review conventions. Detection is a static suffix table; anything
//! unknown is treated as plain text rather than rejected.

use std::path::Path;

/// Map a file path to a language label
pub fn language_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "javascript",
        "ts" | "mts" => "typescript",
        "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "rs" => "rust",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "html" | "htm" => "html",
        "css" | "scss" | "less" => "css",
        "vue" => "vue",
        "dart" => "dart",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "md" | "markdown" => "markdown",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("src/app.py", "python")]
    #[case("lib/index.js", "javascript")]
    #[case("components/App.tsx", "typescript")]
    #[case("main.go", "go")]
    #[case("server.rb", "ruby")]
    #[case("Handler.java", "java")]
    #[case("core.rs", "rust")]
    #[case("schema.sql", "sql")]
    #[case("styles.scss", "css")]
    fn test_known_extensions(#[case] path: &str, #[case] language: &str) {
        assert_eq!(language_for_path(path), language);
    }

    #[test]
    fn test_extension_case_is_ignored() {
        assert_eq!(language_for_path("APP.PY"), "python");
    }

    #[test]
    fn test_unknown_extension_maps_to_text() {
        assert_eq!(language_for_path("data.xyz"), "text");
        assert_eq!(language_for_path("Makefile"), "text");
        assert_eq!(language_for_path(""), "text");
    }
}
