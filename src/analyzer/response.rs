//! Defensive parsing of analysis responses
//!
//! The model is told to return bare JSON, but real responses arrive wrapped
//! in prose, fenced in Markdown, or slightly malformed. Parsing proceeds in
//! stages (bound the payload, parse, repair, parse again, and finally fall
//! back to regex field extraction) so a recoverable response never costs a
//! file its analysis.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::models::{AnalysisResult, CodeMetrics, Issue, Summary};

/// Raw response shape, every field optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAnalysis {
    pub summary: Option<RawSummary>,
    pub issues: Vec<RawIssue>,
    pub metrics: Option<RawMetrics>,
    pub best_practices: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSummary {
    pub risk_score: Option<i64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIssue {
    pub title: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub line: Option<i64>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMetrics {
    pub complexity: Option<i64>,
    pub maintainability: Option<i64>,
}

/// Outcome of the staged parse
///
/// Tagged so callers must handle the unusable path explicitly instead of
/// treating a half-parsed response as data.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnalysis {
    /// The payload parsed as-is
    Structured(RawAnalysis),
    /// The payload parsed only after repair or regex extraction
    Recovered(RawAnalysis),
    /// Nothing salvageable
    Unusable { reason: String },
}

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").unwrap());
static BAD_BACKSLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\\([^"\\/bfnrtu])"#).unwrap());

static RISK_SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""riskScore"\s*:\s*(\d+)"#).unwrap());
static SUMMARY_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""message"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static ISSUE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());
static ISSUE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static ISSUE_SEVERITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""severity"\s*:\s*"([A-Za-z]+)""#).unwrap());
static ISSUE_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""description"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static ISSUE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""line"\s*:\s*(\d+)"#).unwrap());
static ISSUE_RECOMMENDATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""recommendation"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap());
static BEST_PRACTICES_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""bestPractices"\s*:\s*\[([^\]]*)\]"#).unwrap());
static QUOTED_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).unwrap());

/// Parse a model response into the raw analysis shape
pub fn parse_response(text: &str) -> ParsedAnalysis {
    let candidate = extract_payload(text);
    let candidate = match candidate {
        Some(c) => c,
        None => {
            return ParsedAnalysis::Unusable {
                reason: "no JSON object in response".to_string(),
            }
        }
    };

    if let Ok(raw) = serde_json::from_str::<RawAnalysis>(&candidate) {
        if is_meaningful(&raw) {
            return ParsedAnalysis::Structured(raw);
        }
    }

    let repaired = repair_json(&candidate);
    if let Ok(raw) = serde_json::from_str::<RawAnalysis>(&repaired) {
        if is_meaningful(&raw) {
            return ParsedAnalysis::Recovered(raw);
        }
    }

    match extract_fields(text) {
        Some(raw) => ParsedAnalysis::Recovered(raw),
        None => ParsedAnalysis::Unusable {
            reason: "JSON parse failed and no fields were extractable".to_string(),
        },
    }
}

/// An object that carried none of the expected sections is not a usable
/// analysis even when it is valid JSON. serde ignores unknown fields, so
/// an unrelated object would otherwise parse to a hollow result.
fn is_meaningful(raw: &RawAnalysis) -> bool {
    raw.summary.is_some()
        || !raw.issues.is_empty()
        || raw.metrics.is_some()
        || !raw.best_practices.is_empty()
}

/// Strip fences and prose, bounding the payload to the outermost braces
fn extract_payload(text: &str) -> Option<String> {
    let inner = match FENCED_BLOCK.captures(text) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(text),
        None => text,
    };

    let start = inner.find('{')?;
    let end = inner.rfind('}')?;
    if end < start {
        return None;
    }
    Some(inner[start..=end].to_string())
}

/// Repair the JSON defects this service actually produces
fn repair_json(payload: &str) -> String {
    let fixed = CONTROL_CHARS.replace_all(payload, "");
    let fixed = BAD_BACKSLASH.replace_all(&fixed, r"\\$1");
    TRAILING_COMMA.replace_all(&fixed, "$1").to_string()
}

/// Last-resort field extraction from an unparseable response
fn extract_fields(text: &str) -> Option<RawAnalysis> {
    let risk_score = RISK_SCORE
        .captures(text)
        .and_then(|c| c[1].parse::<i64>().ok());
    let message = SUMMARY_MESSAGE
        .captures(text)
        .map(|c| unescape(&c[1]));

    let mut issues = Vec::new();
    for object in ISSUE_OBJECT.find_iter(text) {
        let object = object.as_str();
        let severity = match ISSUE_SEVERITY.captures(object) {
            Some(c) => c[1].to_string(),
            None => continue,
        };
        issues.push(RawIssue {
            title: ISSUE_TITLE.captures(object).map(|c| unescape(&c[1])),
            severity: Some(severity),
            description: ISSUE_DESCRIPTION.captures(object).map(|c| unescape(&c[1])),
            line: ISSUE_LINE.captures(object).and_then(|c| c[1].parse().ok()),
            recommendation: ISSUE_RECOMMENDATION
                .captures(object)
                .map(|c| unescape(&c[1])),
        });
    }

    let best_practices: Vec<String> = BEST_PRACTICES_ARRAY
        .captures(text)
        .map(|c| {
            QUOTED_STRING
                .captures_iter(&c[1])
                .map(|s| unescape(&s[1]))
                .collect()
        })
        .unwrap_or_default();

    if risk_score.is_none() && issues.is_empty() && best_practices.is_empty() {
        return None;
    }

    Some(RawAnalysis {
        summary: Some(RawSummary {
            risk_score,
            message,
        }),
        issues,
        metrics: None,
        best_practices,
    })
}

fn unescape(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\\\", "\\").replace("\\n", "\n")
}

/// Convert a raw analysis into the per-file result, normalizing as we go
///
/// Severity labels are lower-cased; unrecognized labels survive on the
/// issue but are excluded from counts downstream. The risk score is
/// clamped to 0..=100.
pub fn finalize(raw: RawAnalysis, file: &str, language: &str) -> AnalysisResult {
    let summary = raw.summary.unwrap_or_default();
    let issues = raw
        .issues
        .into_iter()
        .filter_map(|i| {
            let severity = i.severity?.to_lowercase();
            Some(Issue {
                title: i.title.unwrap_or_else(|| "Untitled issue".to_string()),
                severity,
                description: i.description.unwrap_or_default(),
                line: i.line,
                recommendation: i.recommendation.unwrap_or_default(),
                file: file.to_string(),
            })
        })
        .collect();

    let metrics = raw.metrics.unwrap_or_default();

    AnalysisResult {
        file: file.to_string(),
        language: language.to_string(),
        success: true,
        issues,
        summary: Summary {
            risk_score: summary.risk_score.unwrap_or(0).clamp(0, 100),
            message: summary.message.unwrap_or_default(),
        },
        metrics: CodeMetrics {
            complexity: metrics.complexity,
            maintainability: metrics.maintainability,
        },
        best_practices: raw.best_practices,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{
        "summary": {"riskScore": 55, "message": "needs attention"},
        "issues": [
            {"title": "SQL injection", "severity": "high", "description": "raw query", "line": 12, "recommendation": "use parameters"}
        ],
        "metrics": {"complexity": 7, "maintainability": 60},
        "bestPractices": ["validate inputs"]
    }"#;

    #[test]
    fn test_bare_json_is_structured() {
        let parsed = parse_response(CLEAN);
        match parsed {
            ParsedAnalysis::Structured(raw) => {
                assert_eq!(raw.summary.unwrap().risk_score, Some(55));
                assert_eq!(raw.issues.len(), 1);
                assert_eq!(raw.best_practices, vec!["validate inputs"]);
            }
            other => panic!("expected structured, got {:?}", other),
        }
    }

    #[test]
    fn test_fenced_response_matches_bare_payload() {
        let fenced = format!("Sure! Here is the analysis:\n```json\n{}\n```\nHope it helps.", CLEAN);

        let bare = parse_response(CLEAN);
        let wrapped = parse_response(&fenced);

        let raw_bare = match bare {
            ParsedAnalysis::Structured(raw) => raw,
            other => panic!("expected structured, got {:?}", other),
        };
        let raw_wrapped = match wrapped {
            ParsedAnalysis::Structured(raw) => raw,
            other => panic!("expected structured, got {:?}", other),
        };
        assert_eq!(raw_bare, raw_wrapped);

        assert_eq!(
            finalize(raw_bare, "a.py", "python"),
            finalize(raw_wrapped, "a.py", "python")
        );
    }

    #[test]
    fn test_prose_around_bare_json_is_bounded_away() {
        let noisy = format!("The file has problems. {} Let me know!", CLEAN);
        assert!(matches!(
            parse_response(&noisy),
            ParsedAnalysis::Structured(_)
        ));
    }

    #[test]
    fn test_trailing_commas_are_repaired() {
        let broken = r#"{
            "summary": {"riskScore": 20, "message": "ok",},
            "issues": [],
            "bestPractices": ["pin versions",],
        }"#;
        match parse_response(broken) {
            ParsedAnalysis::Recovered(raw) => {
                assert_eq!(raw.summary.unwrap().risk_score, Some(20));
                assert_eq!(raw.best_practices, vec!["pin versions"]);
            }
            other => panic!("expected recovered, got {:?}", other),
        }
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let broken = "{\"summary\": {\"riskScore\": 10, \"message\": \"fine\u{0007}\"}, \"issues\": []}";
        assert!(matches!(
            parse_response(broken),
            ParsedAnalysis::Recovered(_)
        ));
    }

    #[test]
    fn test_stray_backslashes_are_escaped() {
        let broken = r#"{"summary": {"riskScore": 5, "message": "path C:\Users\app"}, "issues": []}"#;
        match parse_response(broken) {
            ParsedAnalysis::Recovered(raw) => {
                assert_eq!(raw.summary.unwrap().risk_score, Some(5));
            }
            other => panic!("expected recovered, got {:?}", other),
        }
    }

    #[test]
    fn test_regex_fallback_salvages_fields() {
        // Unbalanced braces defeat the JSON parser outright
        let broken = r#"riskScore": 80, "message": "bad shape"
            {"title": "Hardcoded key", "severity": "High", "description": "secret in code", "line": 3, "recommendation": "use env"}
            "bestPractices": ["rotate secrets", "scan dependencies"]"#;
        match parse_response(broken) {
            ParsedAnalysis::Recovered(raw) => {
                assert_eq!(raw.summary.as_ref().unwrap().risk_score, Some(80));
                assert_eq!(raw.issues.len(), 1);
                assert_eq!(raw.issues[0].severity.as_deref(), Some("High"));
                assert_eq!(raw.issues[0].line, Some(3));
                assert_eq!(
                    raw.best_practices,
                    vec!["rotate secrets", "scan dependencies"]
                );
            }
            other => panic!("expected recovered, got {:?}", other),
        }
    }

    #[test]
    fn test_hopeless_response_is_unusable() {
        assert!(matches!(
            parse_response("I could not analyze this file, sorry."),
            ParsedAnalysis::Unusable { .. }
        ));
        assert!(matches!(
            parse_response(""),
            ParsedAnalysis::Unusable { .. }
        ));
    }

    #[test]
    fn test_finalize_normalizes_severity_and_clamps_score() {
        let raw = RawAnalysis {
            summary: Some(RawSummary {
                risk_score: Some(250),
                message: Some("overrun".to_string()),
            }),
            issues: vec![
                RawIssue {
                    title: Some("Issue A".to_string()),
                    severity: Some("HIGH".to_string()),
                    ..Default::default()
                },
                RawIssue {
                    title: Some("Issue B".to_string()),
                    severity: Some("Catastrophic".to_string()),
                    ..Default::default()
                },
                RawIssue {
                    // No severity at all: dropped entirely
                    title: Some("Issue C".to_string()),
                    ..Default::default()
                },
            ],
            metrics: None,
            best_practices: Vec::new(),
        };

        let result = finalize(raw, "src/x.py", "python");
        assert!(result.success);
        assert_eq!(result.summary.risk_score, 100);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].severity, "high");
        assert_eq!(result.issues[1].severity, "catastrophic");
        assert!(result.issues.iter().all(|i| i.file == "src/x.py"));
    }

    #[test]
    fn test_finalize_defaults_missing_sections() {
        let result = finalize(RawAnalysis::default(), "y.js", "javascript");
        assert!(result.success);
        assert_eq!(result.summary.risk_score, 0);
        assert!(result.issues.is_empty());
        assert!(result.best_practices.is_empty());
        assert_eq!(result.metrics, crate::models::CodeMetrics::default());
    }
}
