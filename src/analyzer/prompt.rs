//! Analysis prompt construction
//!
//! The model is instructed to answer with nothing but a JSON object in a
//! fixed shape. It frequently decorates the payload anyway; the response
//! module handles that.

/// Build the per-file analysis prompt
///
/// # Arguments
/// * `file_path` - Repository-relative path, included for context
/// * `language` - Language label from the extension table
/// * `code` - Full file contents
pub fn build_analysis_prompt(file_path: &str, language: &str, code: &str) -> String {
    format!(
        "You are a senior software engineer performing a code quality and security review.\n\n\
         Analyze the following {language} file for security vulnerabilities, bugs, and \
         maintainability problems.\n\n\
         **File**: {file_path}\n\n\
         **Code**:\n```{language}\n{code}\n```\n\n\
         Respond with ONLY a JSON object matching exactly this schema, no explanation, \
         no markdown:\n\
         {{\n\
         \x20 \"summary\": {{\n\
         \x20   \"riskScore\": 0,\n\
         \x20   \"message\": \"one-sentence overall assessment\"\n\
         \x20 }},\n\
         \x20 \"issues\": [\n\
         \x20   {{\n\
         \x20     \"title\": \"short issue title\",\n\
         \x20     \"severity\": \"high\",\n\
         \x20     \"description\": \"what is wrong and why it matters\",\n\
         \x20     \"line\": 42,\n\
         \x20     \"recommendation\": \"how to fix it\"\n\
         \x20   }}\n\
         \x20 ],\n\
         \x20 \"metrics\": {{\n\
         \x20   \"complexity\": 0,\n\
         \x20   \"maintainability\": 0\n\
         \x20 }},\n\
         \x20 \"bestPractices\": [\"general practice worth adopting\"]\n\
         }}\n\n\
         Rules:\n\
         - riskScore is an integer from 0 (clean) to 100 (critical)\n\
         - severity is one of: high, medium, low\n\
         - line may be null when the issue is file-wide\n\
         - issues must be an empty array when the file is clean\n\
         - complexity and maintainability are integers from 0 to 100"
    )
}
