//! Rhetorical parser.
//!
//! Extracts inline span annotations from raw response text: bold-delimited
//! concepts and arrow-prefixed action lines. Pure; the content is passed
//! through unchanged. Navigation-block stripping is a separate parser and
//! must run first in the pipeline.

use super::ids::next_span_id;
use crate::stream::{RhetoricalSpan, SpanKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// `**...**` pairs, non-greedy so adjacent pairs don't merge. Concepts do not
/// span lines.
static CONCEPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("concept regex"));

/// Lines whose trimmed form starts with `→ ` or `-> `. The span range covers
/// the whole matched line; the captured text excludes the arrow prefix.
static ACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(?:→|->)[ \t]+(.+)$").expect("action regex"));

/// Result of a rhetorical parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRhetoric {
    /// Spans sorted ascending by `start_index`. Overlap is not resolved.
    pub spans: Vec<RhetoricalSpan>,
    /// The input, unchanged. Callers own any content transformation.
    pub content: String,
}

/// Extracts rhetorical spans from `content`.
///
/// Concept and action extraction run independently; the pooled spans are
/// sorted ascending by `start_index`. Indices are byte offsets into
/// `content` and cover the full matched range including syntax markers.
pub fn parse(content: &str) -> ParsedRhetoric {
    if content.is_empty() {
        return ParsedRhetoric {
            spans: Vec::new(),
            content: String::new(),
        };
    }

    let mut spans = Vec::new();

    for caps in CONCEPT_RE.captures_iter(content) {
        let whole = caps.get(0).expect("regex match has group 0");
        let inner = caps.get(1).expect("concept capture");
        spans.push(RhetoricalSpan {
            id: next_span_id(),
            text: inner.as_str().to_string(),
            kind: SpanKind::Concept,
            start_index: whole.start(),
            end_index: whole.end(),
            confidence: 1.0,
            concept_id: None,
        });
    }

    for caps in ACTION_RE.captures_iter(content) {
        let whole = caps.get(0).expect("regex match has group 0");
        let text = caps.get(1).expect("action capture");
        spans.push(RhetoricalSpan {
            id: next_span_id(),
            text: text.as_str().to_string(),
            kind: SpanKind::Action,
            start_index: whole.start(),
            end_index: whole.end(),
            confidence: 1.0,
            concept_id: None,
        });
    }

    spans.sort_by_key(|s| s.start_index);

    ParsedRhetoric {
        spans,
        content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_spans() {
        let result = parse("");
        assert!(result.spans.is_empty());
        assert_eq!(result.content, "");
    }

    #[test]
    fn plain_text_yields_no_spans() {
        let result = parse("Nothing notable here.");
        assert!(result.spans.is_empty());
        assert_eq!(result.content, "Nothing notable here.");
    }

    #[test]
    fn extracts_single_concept_span() {
        let result = parse("The **Grove** is distributed AI.");

        assert_eq!(result.spans.len(), 1);
        let span = &result.spans[0];
        assert_eq!(span.kind, SpanKind::Concept);
        assert_eq!(span.text, "Grove");
        // Range covers the markers.
        assert_eq!(&result.content[span.start_index..span.end_index], "**Grove**");
        assert_eq!(span.confidence, 1.0);
    }

    #[test]
    fn extracts_multiple_concepts_without_merging() {
        let result = parse("**First** and **Second** concepts.");

        assert_eq!(result.spans.len(), 2);
        assert_eq!(result.spans[0].text, "First");
        assert_eq!(result.spans[1].text, "Second");
    }

    #[test]
    fn extracts_action_lines_with_unicode_and_ascii_arrows() {
        let content = "Intro line.\n→ Explore the ratchet\n-> Try the terminal\nOutro.";
        let result = parse(content);

        assert_eq!(result.spans.len(), 2);
        assert_eq!(result.spans[0].kind, SpanKind::Action);
        assert_eq!(result.spans[0].text, "Explore the ratchet");
        assert_eq!(result.spans[1].text, "Try the terminal");
        // The range covers the whole line including the arrow.
        let line = &content[result.spans[0].start_index..result.spans[0].end_index];
        assert_eq!(line, "→ Explore the ratchet");
    }

    #[test]
    fn indented_action_lines_match() {
        let result = parse("  → Indented action");
        assert_eq!(result.spans.len(), 1);
        assert_eq!(result.spans[0].text, "Indented action");
        assert_eq!(result.spans[0].start_index, 0);
    }

    #[test]
    fn arrow_without_trailing_text_is_ignored() {
        let result = parse("→\n->");
        assert!(result.spans.is_empty());
    }

    #[test]
    fn spans_are_sorted_by_start_index_across_rules() {
        let content = "→ Act first\nThen the **Concept** appears.\n→ Act again";
        let result = parse(content);

        assert_eq!(result.spans.len(), 3);
        let starts: Vec<usize> = result.spans.iter().map(|s| s.start_index).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(result.spans[0].kind, SpanKind::Action);
        assert_eq!(result.spans[1].kind, SpanKind::Concept);
    }

    #[test]
    fn span_indices_stay_within_bounds() {
        let content = "**edge** at start and at end **final**";
        let result = parse(content);

        for span in &result.spans {
            assert!(span.start_index <= span.end_index);
            assert!(span.end_index <= content.len());
        }
    }

    #[test]
    fn content_passes_through_unchanged() {
        let content = "Keep **markers** intact.";
        let result = parse(content);
        assert_eq!(result.content, content);
    }

    #[test]
    fn span_ids_are_unique() {
        let result = parse("**a** **b** **c**");
        let mut ids: Vec<&str> = result.spans.iter().map(|s| s.id.as_str()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn unterminated_bold_is_not_a_span() {
        let result = parse("An **unterminated marker.");
        assert!(result.spans.is_empty());
    }
}
