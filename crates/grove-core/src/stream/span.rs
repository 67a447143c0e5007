//! Rhetorical span types.
//!
//! Spans are position-indexed annotations extracted from finalized response
//! text. The renderer uses them to make concepts clickable and to style
//! action lines.

use serde::{Deserialize, Serialize};

/// The rhetorical role of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpanKind {
    /// A bolded concept (`**...**`), clickable for pivots.
    Concept,
    /// An arrow-prefixed action line.
    Action,
    /// Declared for forward compatibility; no parser produces these yet.
    Entity,
}

/// A position-indexed annotation over a response's content.
///
/// Invariant: `start_index <= end_index <= content.len()`, and spans for a
/// given content string are sorted ascending by `start_index`. Overlap is not
/// resolved at construction time; consumers decide how to render overlapping
/// spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RhetoricalSpan {
    /// Unique span identifier (counter + timestamp, unique within a session)
    pub id: String,
    /// The annotated text, excluding syntax markers for action spans
    pub text: String,
    /// Rhetorical role
    #[serde(rename = "type")]
    pub kind: SpanKind,
    /// Byte offset where the span starts (inclusive, covers markers)
    pub start_index: usize,
    /// Byte offset where the span ends (exclusive)
    pub end_index: usize,
    /// Extraction confidence in [0, 1]
    pub confidence: f32,
    /// Linked concept identifier, when the span maps to a known concept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
}
