//! The stream item model.
//!
//! A `StreamItem` is the atomic unit of the conversation log. The engagement
//! machine appends finalized items to an ordered, append-only history; the
//! renderer maps each variant to a UI block.

use super::fork::{ForkKind, JourneyFork, JourneyPath};
use super::span::RhetoricalSpan;
use crate::chat::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};

/// Millisecond timestamp for newly created items.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_item_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Conversation role of the item's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// The subsystem that produced the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedBy {
    User,
    Ai,
    System,
}

/// Resolution state of an inline offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Dismissed,
}

/// The marketing interstitial a reveal item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealKind {
    Simulation,
    CustomLensOffer,
    TerminatorPrompt,
    FounderStory,
    ConversionCta,
    JourneyCompletion,
}

/// Provenance back-link carried by a query synthesized from a span click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotContext {
    /// The response the clicked span belongs to
    pub source_response_id: String,
    /// The clicked span's text
    pub source_text: String,
    /// Surrounding text at the click site, when the caller captured it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    /// Concept the span was linked to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_concept_id: Option<String>,
}

/// User-submitted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryItem {
    pub id: String,
    pub timestamp: i64,
    pub content: String,
    pub role: Role,
    pub created_by: CreatedBy,
    /// Intent class when the query came from a fork selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<ForkKind>,
    /// Provenance when the query came from a span click
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<PivotContext>,
}

impl QueryItem {
    /// Creates a fresh user query with a unique id and current timestamp.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_item_id("query"),
            timestamp: now_millis(),
            content: content.into(),
            role: Role::User,
            created_by: CreatedBy::User,
            intent: None,
            pivot: None,
        }
    }
}

/// Assistant output. `content` accumulates while streaming; the item is
/// finalized (parsed, marked not-generating) before it enters the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub id: String,
    pub timestamp: i64,
    pub content: String,
    pub is_generating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_spans: Option<Vec<RhetoricalSpan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_paths: Option<Vec<JourneyPath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Vec<JourneyFork>>,
    pub role: Role,
    pub created_by: CreatedBy,
}

impl ResponseItem {
    /// Creates an empty in-flight response placeholder.
    pub fn streaming() -> Self {
        Self {
            id: new_item_id("response"),
            timestamp: now_millis(),
            content: String::new(),
            is_generating: true,
            parsed_spans: None,
            suggested_paths: None,
            navigation: None,
            role: Role::Assistant,
            created_by: CreatedBy::Ai,
        }
    }
}

/// A standalone set of forks rendered as its own log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub id: String,
    pub timestamp: i64,
    pub forks: Vec<JourneyFork>,
    pub source_response_id: String,
}

/// Status/informational text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemItem {
    pub id: String,
    pub timestamp: i64,
    pub content: String,
    pub created_by: CreatedBy,
}

impl SystemItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_item_id("system"),
            timestamp: now_millis(),
            content: content.into(),
            created_by: CreatedBy::System,
        }
    }
}

/// An inline suggestion to switch lens, attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LensOfferItem {
    pub id: String,
    pub timestamp: i64,
    pub lens_id: String,
    pub lens_name: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub status: OfferStatus,
    pub source_response_id: String,
}

/// A marketing/narrative interstitial injected into the stream. Structurally
/// close to a response, semantically distinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealItem {
    pub id: String,
    pub timestamp: i64,
    pub kind: RevealKind,
    pub content: String,
    pub created_by: CreatedBy,
}

/// One unit of conversation, discriminated by the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamItem {
    Query(QueryItem),
    Response(ResponseItem),
    Navigation(NavigationItem),
    System(SystemItem),
    LensOffer(LensOfferItem),
    Reveal(RevealItem),
}

impl StreamItem {
    /// Unique item identifier.
    pub fn id(&self) -> &str {
        match self {
            StreamItem::Query(i) => &i.id,
            StreamItem::Response(i) => &i.id,
            StreamItem::Navigation(i) => &i.id,
            StreamItem::System(i) => &i.id,
            StreamItem::LensOffer(i) => &i.id,
            StreamItem::Reveal(i) => &i.id,
        }
    }

    /// Creation timestamp (ms).
    pub fn timestamp(&self) -> i64 {
        match self {
            StreamItem::Query(i) => i.timestamp,
            StreamItem::Response(i) => i.timestamp,
            StreamItem::Navigation(i) => i.timestamp,
            StreamItem::System(i) => i.timestamp,
            StreamItem::LensOffer(i) => i.timestamp,
            StreamItem::Reveal(i) => i.timestamp,
        }
    }

    /// Textual content, for the variants that carry any.
    pub fn content(&self) -> Option<&str> {
        match self {
            StreamItem::Query(i) => Some(&i.content),
            StreamItem::Response(i) => Some(&i.content),
            StreamItem::System(i) => Some(&i.content),
            StreamItem::Reveal(i) => Some(&i.content),
            StreamItem::Navigation(_) | StreamItem::LensOffer(_) => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, StreamItem::Query(_))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, StreamItem::Response(_))
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, StreamItem::Navigation(_))
    }

    pub fn is_system(&self) -> bool {
        matches!(self, StreamItem::System(_))
    }

    pub fn is_lens_offer(&self) -> bool {
        matches!(self, StreamItem::LensOffer(_))
    }

    pub fn is_reveal(&self) -> bool {
        matches!(self, StreamItem::Reveal(_))
    }

    pub fn as_query(&self) -> Option<&QueryItem> {
        match self {
            StreamItem::Query(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&ResponseItem> {
        match self {
            StreamItem::Response(i) => Some(i),
            _ => None,
        }
    }

    /// True when the item is a response carrying at least one parsed span.
    pub fn has_spans(&self) -> bool {
        self.as_response()
            .and_then(|r| r.parsed_spans.as_ref())
            .is_some_and(|s| !s.is_empty())
    }

    /// True when the item is a response carrying at least one suggested path.
    pub fn has_paths(&self) -> bool {
        self.as_response()
            .and_then(|r| r.suggested_paths.as_ref())
            .is_some_and(|p| !p.is_empty())
    }

    /// True when the item is a response carrying at least one navigation fork.
    pub fn has_navigation(&self) -> bool {
        self.as_response()
            .and_then(|r| r.navigation.as_ref())
            .is_some_and(|n| !n.is_empty())
    }

    /// Adapts a plain chat message into a stream item: user messages become
    /// queries, assistant messages become responses (generating while the
    /// message is still streaming).
    pub fn from_chat_message(message: &ChatMessage) -> Self {
        match message.role {
            ChatRole::User => StreamItem::Query(QueryItem {
                id: message.id.clone(),
                timestamp: now_millis(),
                content: message.text.clone(),
                role: Role::User,
                created_by: CreatedBy::User,
                intent: None,
                pivot: None,
            }),
            ChatRole::Assistant => StreamItem::Response(ResponseItem {
                id: message.id.clone(),
                timestamp: now_millis(),
                content: message.text.clone(),
                is_generating: message.is_streaming,
                parsed_spans: None,
                suggested_paths: None,
                navigation: None,
                role: Role::Assistant,
                created_by: CreatedBy::Ai,
            }),
        }
    }
}
