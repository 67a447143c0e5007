//! Journey fork types.
//!
//! Forks are suggested next actions extracted from a response's trailing
//! navigation block. Selecting one synthesizes a new query.

use serde::{Deserialize, Serialize};

/// The intent class of a suggested fork.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForkKind {
    /// Go deeper on the current topic.
    DeepDive,
    /// Shift to an adjacent topic.
    Pivot,
    /// Apply the idea to the user's own situation.
    Apply,
    /// Push back on the claim. Only reachable via the structured JSON path;
    /// the text-inference fallback never produces it.
    Challenge,
}

impl ForkKind {
    /// Parses a raw type string, defaulting to `Pivot` for anything outside
    /// the four-member enum.
    pub fn parse_or_pivot(raw: &str) -> Self {
        raw.parse().unwrap_or(ForkKind::Pivot)
    }
}

/// One suggested next user action attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyFork {
    /// Unique fork identifier (generated when the block omits one)
    pub id: String,
    /// Display label shown to the user
    pub label: String,
    /// Intent class
    #[serde(rename = "type")]
    pub kind: ForkKind,
    /// Target hub/concept identifier, when the block provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// The query submitted when the fork is selected (falls back to label)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_payload: Option<String>,
    /// Free-form context carried alongside the fork
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl JourneyFork {
    /// The query text this fork submits: `query_payload` when present,
    /// otherwise the label.
    pub fn effective_query(&self) -> &str {
        self.query_payload.as_deref().unwrap_or(&self.label)
    }
}

/// A lighter-weight suggested path (legacy rendering shape, kept for
/// responses that carry paths instead of forks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyPath {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}
