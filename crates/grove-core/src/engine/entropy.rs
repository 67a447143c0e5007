//! Conversation-entropy scoring.
//!
//! Measures how complex a conversation has become to decide when to offer a
//! structured journey instead of freestyle chat. Scoring is additive and
//! deliberately crude: depth of exchange, hub vocabulary hits, depth markers,
//! and reference chaining. Scores live on a 0-100-ish scale; callers clamp
//! to [0, 1] before handing the signal to the engagement machine.

use crate::chat::ChatMessage;
use serde::{Deserialize, Serialize};

pub const THRESHOLD_LOW: u32 = 30;
pub const THRESHOLD_MEDIUM: u32 = 60;

pub const MAX_INJECTIONS_PER_SESSION: u32 = 2;
pub const COOLDOWN_EXCHANGES: u32 = 5;

const TAG_MATCH_CAP: usize = 3;

/// Phrases indicating sophisticated inquiry.
const DEPTH_MARKERS: &[&str] = &[
    "exactly",
    "specifically",
    "underlying",
    "mechanism",
    "why does",
    "how does",
    "what happens when",
    "implications",
    "game-theoretic",
    "attack surface",
    "failure mode",
    "edge case",
    "trade-off",
    "tradeoff",
    "limitation",
    "constraint",
    "assumption",
    "depends on",
    "what if",
];

/// Phrases indicating the user is building on prior context.
const REFERENCE_PHRASES: &[&str] = &[
    "you mentioned",
    "you said",
    "earlier",
    "that point",
    "the part about",
    "going back to",
    "related to what",
    "building on",
    "following up",
    "as you noted",
    "regarding what",
];

/// Topic clusters and the vocabulary that signals them. Aligned with hub
/// tags from the narrative content.
pub fn topic_clusters() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        (
            "ratchet",
            &[
                "doubling",
                "ratchet",
                "frontier",
                "21 months",
                "7 months",
                "capability",
                "metr",
                "propagation",
                "edge",
                "local model",
                "catching up",
                "lag",
            ],
        ),
        (
            "economics",
            &[
                "$380",
                "billion",
                "capex",
                "rent",
                "ownership",
                "efficiency tax",
                "credits",
                "enlightenment",
                "incentives",
                "cloud costs",
                "sink",
                "genesis",
                "maturity",
                "floor",
                "tax rate",
                "hyperscaler",
                "datacenter",
            ],
        ),
        (
            "architecture",
            &[
                "hybrid",
                "split",
                "local model",
                "cloud",
                "pivotal",
                "routine",
                "cognitive",
                "hum",
                "breakthrough",
                "routing",
                "tier",
                "village",
                "crdt",
                "nats",
                "distributed",
            ],
        ),
        (
            "knowledge-commons",
            &[
                "publishing",
                "attribution",
                "validation",
                "innovation",
                "propagation",
                "commons",
                "network",
                "sharing",
                "collective",
                "civilization",
                "governance",
            ],
        ),
        (
            "observer",
            &[
                "meta",
                "architecture",
                "simulation",
                "observer",
                "terminal",
                "cosmology",
                "diary",
                "agents",
                "village",
                "gardener",
                "watching",
                "asymmetric",
                "theology",
                "recursive",
                "already here",
                "inside",
            ],
        ),
    ]
}

/// Maps a dominant cluster to the journey it should route to.
pub fn journey_for_cluster(cluster: &str) -> Option<&'static str> {
    match cluster {
        "ratchet" => Some("ratchet"),
        "economics" | "architecture" | "knowledge-commons" => Some("stakes"),
        "observer" => Some("simulation"),
        _ => None,
    }
}

/// One topic hub the content team has tagged with vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicHub {
    pub id: String,
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntropyClass {
    Low,
    Medium,
    High,
}

/// Result of scoring one message in context.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyResult {
    pub score: u32,
    pub classification: EntropyClass,
    pub matched_tags: Vec<String>,
    pub dominant_cluster: Option<String>,
}

/// Injection bookkeeping carried across exchanges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyState {
    pub last_score: u32,
    pub last_classification: EntropyClass,
    pub injection_count: u32,
    /// Exchanges remaining until the next injection is allowed
    pub cooldown_remaining: u32,
    /// Exchange count when the last injection happened
    pub last_injection_exchange: u32,
}

impl Default for EntropyState {
    fn default() -> Self {
        Self {
            last_score: 0,
            last_classification: EntropyClass::Low,
            injection_count: 0,
            cooldown_remaining: 0,
            last_injection_exchange: 0,
        }
    }
}

/// Scores a user message against the conversation so far.
///
/// Additive components: +30 once the conversation is three exchanges deep,
/// +15 per enabled-hub tag hit (capped at three), +20 for any depth marker,
/// +25 for reference chaining.
pub fn calculate_entropy(
    message: &str,
    history: &[ChatMessage],
    topic_hubs: &[TopicHub],
    exchange_count: u32,
) -> EntropyResult {
    let mut score = 0;
    let mut matched_tags: Vec<String> = Vec::new();
    let message_lower = message.to_lowercase();

    if exchange_count >= 3 {
        score += 30;
    }

    let mut tag_matches = 0;
    'hubs: for hub in topic_hubs.iter().filter(|h| h.enabled) {
        for tag in &hub.tags {
            if tag_matches >= TAG_MATCH_CAP {
                break 'hubs;
            }
            let tag_lower = tag.to_lowercase();
            if message_lower.contains(&tag_lower) && !matched_tags.contains(tag) {
                matched_tags.push(tag.clone());
                score += 15;
                tag_matches += 1;
            }
        }
    }

    if DEPTH_MARKERS.iter().any(|m| message_lower.contains(m)) {
        score += 20;
    }
    if REFERENCE_PHRASES.iter().any(|p| message_lower.contains(p)) {
        score += 25;
    }

    let full_conversation: String = {
        let mut joined = history
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        joined.push(' ');
        joined.push_str(&message_lower);
        joined
    };

    // Highest term-hit count wins; ties go to the earliest-declared cluster.
    let mut dominant_cluster: Option<String> = None;
    let mut best_hits = 0;
    for (cluster, terms) in topic_clusters() {
        let hits = terms
            .iter()
            .filter(|t| full_conversation.contains(**t))
            .count();
        if hits > best_hits {
            best_hits = hits;
            dominant_cluster = Some((*cluster).to_string());
        }
    }

    let classification = classify(score);

    EntropyResult {
        score,
        classification,
        matched_tags,
        dominant_cluster,
    }
}

fn classify(score: u32) -> EntropyClass {
    if score >= THRESHOLD_MEDIUM {
        EntropyClass::High
    } else if score >= THRESHOLD_LOW {
        EntropyClass::Medium
    } else {
        EntropyClass::Low
    }
}

/// Whether a journey offer should be injected right now.
pub fn should_inject(entropy: &EntropyResult, state: &EntropyState) -> bool {
    if state.cooldown_remaining > 0 {
        tracing::debug!(remaining = state.cooldown_remaining, "injection blocked: cooldown");
        return false;
    }
    if state.injection_count >= MAX_INJECTIONS_PER_SESSION {
        tracing::debug!(count = state.injection_count, "injection blocked: session cap");
        return false;
    }
    if entropy.classification == EntropyClass::Low {
        return false;
    }
    // Without a dominant cluster there is no journey to route to.
    entropy.dominant_cluster.is_some()
}

/// Rolls the entropy state forward after an exchange.
pub fn update_entropy_state(
    current: &EntropyState,
    entropy: &EntropyResult,
    did_inject: bool,
    exchange_count: u32,
) -> EntropyState {
    let mut next = EntropyState {
        last_score: entropy.score,
        last_classification: entropy.classification,
        cooldown_remaining: current.cooldown_remaining.saturating_sub(1),
        ..current.clone()
    };

    if did_inject {
        next.injection_count = current.injection_count + 1;
        next.cooldown_remaining = COOLDOWN_EXCHANGES;
        next.last_injection_exchange = exchange_count;
    }

    next
}

/// Applies the dismissal cooldown after the user waves the offer away.
pub fn dismiss_entropy(current: &EntropyState, exchange_count: u32) -> EntropyState {
    EntropyState {
        cooldown_remaining: COOLDOWN_EXCHANGES,
        last_injection_exchange: exchange_count,
        ..current.clone()
    }
}
