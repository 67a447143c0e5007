//! Engagement context: the machine's extended state.

use crate::stream::StreamItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where the active lens came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LensSource {
    /// Deep link (`?lens=` query parameter)
    Url,
    /// Restored from persisted preferences at hydration
    LocalStorage,
    /// Picked in the lens grid
    Selection,
}

/// One step of a scripted journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A scripted guided path through the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    pub waypoints: Vec<Waypoint>,
}

/// The machine's extended state.
///
/// Owned exclusively by the machine; external code reads it through a
/// snapshot and requests mutation by dispatching events. `stream_history` is
/// append-only: items are never mutated or removed once appended. The only
/// mutable item is `current_stream_item`, which is still in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementContext {
    /// Active lens id, if any
    pub lens: Option<String>,
    /// Provenance of the active lens
    pub lens_source: Option<LensSource>,

    /// Active journey, if any
    pub journey: Option<Journey>,
    /// Index of the current waypoint
    pub journey_progress: usize,
    /// Waypoint count of the active journey
    pub journey_total: usize,

    /// Conversation-complexity signal in [0, 1]; the machine stores whatever
    /// the caller dispatches, clamping is the caller's responsibility
    pub entropy: f32,
    /// Threshold above which consumers may offer structured journeys
    pub entropy_threshold: f32,

    /// The in-flight stream item, mutated during streaming
    pub current_stream_item: Option<StreamItem>,
    /// Ordered, append-only conversation log
    pub stream_history: Vec<StreamItem>,

    /// Ad-hoc marketing-moment gating flags
    pub flags: HashMap<String, bool>,
    /// Moment id to last-shown timestamp (ms)
    pub moment_cooldowns: HashMap<String, i64>,

    /// Distinct hubs visited this session, in first-visit order
    pub hubs_visited: Vec<String>,
    /// Most recently visited hub
    pub last_hub_id: Option<String>,
    /// Consecutive visits to the same hub
    pub consecutive_hub_repeats: u32,
    /// Pivot clicks this session
    pub pivot_count: u32,
}

impl Default for EngagementContext {
    fn default() -> Self {
        Self {
            lens: None,
            lens_source: None,
            journey: None,
            journey_progress: 0,
            journey_total: 0,
            entropy: 0.0,
            entropy_threshold: 0.6,
            current_stream_item: None,
            stream_history: Vec::new(),
            flags: HashMap::new(),
            moment_cooldowns: HashMap::new(),
            hubs_visited: Vec::new(),
            last_hub_id: None,
            consecutive_hub_repeats: 0,
            pivot_count: 0,
        }
    }
}

impl EngagementContext {
    /// Number of user queries committed to the history.
    pub fn exchange_count(&self) -> usize {
        self.stream_history.iter().filter(|i| i.is_query()).count()
    }
}
