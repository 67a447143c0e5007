//! Navigation parser.
//!
//! Locates a trailing `<navigation>` directive block in response text,
//! extracts typed forks from it, and strips the block from the content. The
//! block body is a private wire format between the prompt layer and this
//! parser: a JSON fork array, a `{"forks": [...]}` wrapper, or plain marker
//! lines as a fallback.

use super::ids::next_fork_id;
use crate::stream::{ForkKind, JourneyFork};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Case-insensitive, non-greedy; only the first block is honored.
static NAV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<navigation>(.*?)</navigation>").expect("navigation regex"));

/// Result of a navigation parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNavigation {
    pub forks: Vec<JourneyFork>,
    /// The input with the navigation block stripped out, trimmed.
    pub clean_content: String,
}

/// Extracts the navigation block from `raw_content`, if any.
///
/// Absent block: the content comes back unchanged. Malformed JSON inside the
/// block never surfaces as an error; it falls through to the structured-text
/// path.
pub fn parse_navigation(raw_content: &str) -> ParsedNavigation {
    if raw_content.trim().is_empty() {
        return ParsedNavigation {
            forks: Vec::new(),
            clean_content: String::new(),
        };
    }

    let Some(caps) = NAV_RE.captures(raw_content) else {
        return ParsedNavigation {
            forks: Vec::new(),
            clean_content: raw_content.to_string(),
        };
    };

    let whole = caps.get(0).expect("regex match has group 0");
    let body = caps.get(1).expect("navigation body").as_str().trim();

    let forks = if body.is_empty() {
        Vec::new()
    } else {
        parse_json_forks(body).unwrap_or_else(|| parse_text_forks(body))
    };

    let mut clean = String::with_capacity(raw_content.len());
    clean.push_str(&raw_content[..whole.start()]);
    clean.push_str(&raw_content[whole.end()..]);

    ParsedNavigation {
        forks,
        clean_content: clean.trim().to_string(),
    }
}

/// Structured JSON path: a fork array, or an object wrapping one under
/// `forks`. Returns `None` when the body is not JSON of either shape.
fn parse_json_forks(body: &str) -> Option<Vec<JourneyFork>> {
    let value: Value = serde_json::from_str(body).ok()?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => match obj.remove("forks") {
            Some(Value::Array(entries)) => entries,
            _ => return None,
        },
        _ => return None,
    };

    Some(entries.iter().filter_map(normalize_fork).collect())
}

/// Normalizes one raw fork object from the JSON path.
fn normalize_fork(raw: &Value) -> Option<JourneyFork> {
    let obj = raw.as_object()?;

    let str_field = |key: &str| -> Option<String> {
        obj.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let label = str_field("label")
        .or_else(|| str_field("text"))
        .unwrap_or_else(|| "Continue".to_string());

    let kind = str_field("type")
        .map(|raw| ForkKind::parse_or_pivot(&raw))
        .unwrap_or(ForkKind::Pivot);

    let query_payload = str_field("query")
        .or_else(|| str_field("queryPayload"))
        .unwrap_or_else(|| label.clone());

    Some(JourneyFork {
        id: str_field("id").unwrap_or_else(next_fork_id),
        label,
        kind,
        target_id: str_field("targetId"),
        query_payload: Some(query_payload),
        context: str_field("context"),
    })
}

/// Structured-text fallback: one fork per non-empty line, leading `→`, `->`,
/// `-`, or `•` markers stripped.
fn parse_text_forks(body: &str) -> Vec<JourneyFork> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let label = strip_marker(line).trim();
            if label.is_empty() {
                return None;
            }
            Some(JourneyFork {
                id: next_fork_id(),
                label: label.to_string(),
                kind: infer_kind(label),
                target_id: None,
                query_payload: Some(label.to_string()),
                context: None,
            })
        })
        .collect()
}

fn strip_marker(line: &str) -> &str {
    for marker in ["→", "->", "-", "•"] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest;
        }
    }
    line
}

/// Infers the fork kind from label text. This path can never produce
/// `Challenge`; challenges require the explicit JSON shape.
fn infer_kind(label: &str) -> ForkKind {
    let lower = label.to_lowercase();
    if lower.contains("deep") || lower.contains("more about") || lower.contains("explain") {
        ForkKind::DeepDive
    } else if lower.contains("try")
        || lower.contains("apply")
        || lower.contains("how to")
        || lower.contains("implement")
    {
        ForkKind::Apply
    } else {
        ForkKind::Pivot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_empty_result() {
        let result = parse_navigation("");
        assert!(result.forks.is_empty());
        assert_eq!(result.clean_content, "");
    }

    #[test]
    fn content_without_block_passes_through() {
        let content = "This is a regular response without navigation.";
        let result = parse_navigation(content);

        assert!(result.forks.is_empty());
        assert_eq!(result.clean_content, content);
    }

    #[test]
    fn extracts_json_fork_array() {
        let content = "Here is the response.\n\n<navigation>\n[\n  {\"id\": \"fork-1\", \"label\": \"Learn more\", \"type\": \"deep_dive\"},\n  {\"id\": \"fork-2\", \"label\": \"Try it out\", \"type\": \"apply\"}\n]\n</navigation>";
        let result = parse_navigation(content);

        assert_eq!(result.forks.len(), 2);
        assert_eq!(result.forks[0].label, "Learn more");
        assert_eq!(result.forks[0].kind, ForkKind::DeepDive);
        assert_eq!(result.forks[1].label, "Try it out");
        assert_eq!(result.forks[1].kind, ForkKind::Apply);
        assert_eq!(result.clean_content, "Here is the response.");
    }

    #[test]
    fn extracts_json_forks_wrapper_object() {
        let content = "Response text.\n\n<navigation>\n{\n  \"forks\": [\n    {\"id\": \"f1\", \"label\": \"Option A\", \"type\": \"pivot\"}\n  ]\n}\n</navigation>";
        let result = parse_navigation(content);

        assert_eq!(result.forks.len(), 1);
        assert_eq!(result.forks[0].label, "Option A");
        assert_eq!(result.forks[0].kind, ForkKind::Pivot);
    }

    #[test]
    fn extracts_structured_text_lines() {
        let content = "Here is information about the topic.\n\n<navigation>\n→ Dive deeper into this concept\n→ Apply this to your project\n→ Explore a related topic\n</navigation>";
        let result = parse_navigation(content);

        assert_eq!(result.forks.len(), 3);
        assert_eq!(result.forks[0].label, "Dive deeper into this concept");
        assert_eq!(result.forks[1].label, "Apply this to your project");
        assert_eq!(result.forks[2].label, "Explore a related topic");
        assert_eq!(result.clean_content, "Here is information about the topic.");
    }

    #[test]
    fn handles_bullet_and_dash_markers() {
        let content = "Response.\n\n<navigation>\n• First option\n- Second option\n</navigation>";
        let result = parse_navigation(content);

        assert_eq!(result.forks.len(), 2);
        assert_eq!(result.forks[0].label, "First option");
        assert_eq!(result.forks[1].label, "Second option");
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        let content = "Text.\n\n<NAVIGATION>\n→ Option\n</NAVIGATION>";
        let result = parse_navigation(content);

        assert_eq!(result.forks.len(), 1);
        assert_eq!(result.clean_content, "Text.");
    }

    #[test]
    fn preserves_multiline_clean_content() {
        let content =
            "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.\n\n<navigation>\n→ Option\n</navigation>";
        let result = parse_navigation(content);

        assert!(result.clean_content.contains("First paragraph."));
        assert!(result.clean_content.contains("Second paragraph."));
        assert!(result.clean_content.contains("Third paragraph."));
        assert!(!result.clean_content.contains("navigation"));
    }

    // Fork type inference

    #[test]
    fn infers_deep_dive_from_keywords() {
        for label in ["Deep dive into this", "Tell me more about X", "Explain the concept"] {
            let content = format!("<navigation>→ {}</navigation>", label);
            let result = parse_navigation(&content);
            assert_eq!(result.forks[0].kind, ForkKind::DeepDive, "label: {label}");
        }
    }

    #[test]
    fn infers_apply_from_keywords() {
        for label in ["Try this approach", "How to implement this", "Implement the feature"] {
            let content = format!("<navigation>→ {}</navigation>", label);
            let result = parse_navigation(&content);
            assert_eq!(result.forks[0].kind, ForkKind::Apply, "label: {label}");
        }
    }

    #[test]
    fn defaults_inference_to_pivot() {
        let result = parse_navigation("<navigation>→ Explore something else</navigation>");
        assert_eq!(result.forks[0].kind, ForkKind::Pivot);
    }

    // Fork normalization (JSON path)

    #[test]
    fn label_becomes_query_payload_when_query_absent() {
        let result =
            parse_navigation("<navigation>\n[{\"id\": \"f1\", \"label\": \"The Label\"}]\n</navigation>");
        assert_eq!(result.forks[0].query_payload.as_deref(), Some("The Label"));
    }

    #[test]
    fn query_field_takes_precedence() {
        let result = parse_navigation(
            "<navigation>\n[{\"id\": \"f1\", \"label\": \"Short Label\", \"query\": \"Full query text\"}]\n</navigation>",
        );
        assert_eq!(result.forks[0].query_payload.as_deref(), Some("Full query text"));
    }

    #[test]
    fn query_payload_field_is_honored() {
        let result = parse_navigation(
            "<navigation>\n[{\"id\": \"f1\", \"label\": \"Label\", \"queryPayload\": \"Custom payload\"}]\n</navigation>",
        );
        assert_eq!(result.forks[0].query_payload.as_deref(), Some("Custom payload"));
    }

    #[test]
    fn generates_id_when_absent() {
        let result = parse_navigation("<navigation>\n[{\"label\": \"No ID Fork\"}]\n</navigation>");
        assert!(result.forks[0].id.contains("fork_"));
    }

    #[test]
    fn text_field_is_label_fallback() {
        let result =
            parse_navigation("<navigation>\n[{\"id\": \"f1\", \"text\": \"Text as label\"}]\n</navigation>");
        assert_eq!(result.forks[0].label, "Text as label");
    }

    #[test]
    fn label_defaults_to_continue() {
        let result =
            parse_navigation("<navigation>\n[{\"id\": \"f1\", \"type\": \"pivot\"}]\n</navigation>");
        assert_eq!(result.forks[0].label, "Continue");
    }

    #[test]
    fn preserves_target_id_and_context() {
        let result = parse_navigation(
            "<navigation>\n[{\"id\": \"f1\", \"label\": \"Go\", \"targetId\": \"target-123\", \"context\": \"Some context\"}]\n</navigation>",
        );
        assert_eq!(result.forks[0].target_id.as_deref(), Some("target-123"));
        assert_eq!(result.forks[0].context.as_deref(), Some("Some context"));
    }

    #[test]
    fn normalizes_invalid_type_to_pivot() {
        let result = parse_navigation(
            "<navigation>\n[{\"id\": \"f1\", \"label\": \"Go\", \"type\": \"invalid_type\"}]\n</navigation>",
        );
        assert_eq!(result.forks[0].kind, ForkKind::Pivot);
    }

    #[test]
    fn challenge_is_reachable_via_json_only() {
        let result = parse_navigation(
            "<navigation>\n[{\"id\": \"f1\", \"label\": \"Push back\", \"type\": \"challenge\"}]\n</navigation>",
        );
        assert_eq!(result.forks[0].kind, ForkKind::Challenge);

        let text = parse_navigation("<navigation>→ Push back on this claim</navigation>");
        assert_ne!(text.forks[0].kind, ForkKind::Challenge);
    }

    // Edge cases

    #[test]
    fn empty_block_yields_no_forks() {
        let result = parse_navigation("Text.<navigation></navigation>");
        assert!(result.forks.is_empty());
        assert_eq!(result.clean_content, "Text.");
    }

    #[test]
    fn whitespace_only_block_yields_no_forks() {
        let result = parse_navigation("Text.<navigation>\n\n   </navigation>");
        assert!(result.forks.is_empty());
    }

    #[test]
    fn malformed_json_falls_back_to_text_parsing() {
        let result = parse_navigation("<navigation>\n{not valid json}\n</navigation>");
        // The single brace line survives as a fork label rather than erroring.
        assert_eq!(result.forks.len(), 1);
    }

    #[test]
    fn block_at_start_of_content() {
        let result = parse_navigation("<navigation>→ Option</navigation>\n\nMain content here.");
        assert_eq!(result.forks.len(), 1);
        assert_eq!(result.clean_content, "Main content here.");
    }

    #[test]
    fn block_in_middle_of_content() {
        let result = parse_navigation("Before.\n\n<navigation>→ Option</navigation>\n\nAfter.");
        assert_eq!(result.forks.len(), 1);
        assert!(result.clean_content.contains("Before."));
        assert!(result.clean_content.contains("After."));
    }

    #[test]
    fn only_first_block_is_honored() {
        let result = parse_navigation(
            "<navigation>→ First</navigation>\nMiddle.\n<navigation>→ Second</navigation>",
        );
        assert_eq!(result.forks.len(), 1);
        assert_eq!(result.forks[0].label, "First");
        // The second block remains in the content.
        assert!(result.clean_content.contains("Second"));
    }
}
