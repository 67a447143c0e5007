//! Marketing-moment trigger evaluation.
//!
//! Moments are small content payloads (offers, prompts, toasts) gated by
//! declarative trigger conditions. Evaluation is pure: callers snapshot the
//! machine context into an [`EvaluationContext`], and selection filters a
//! moment list down to eligible candidates sorted by priority.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_PRIORITY: u32 = 50;

/// Coarse session stage, advanced by the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerStage {
    Arrival,
    Oriented,
    Exploring,
    Engaged,
}

/// Where a moment renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MomentSurface {
    /// Modal overlay
    Overlay,
    /// In-stream card
    Inline,
    /// Welcome section slot
    Welcome,
    /// Header badge
    Header,
    /// Suggested prompt injection
    Prompt,
    /// Transient notification
    Toast,
}

/// Editorial lifecycle of a moment definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentStatus {
    Draft,
    Active,
    Archived,
}

/// Inclusive numeric threshold window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        if self.min.is_some_and(|min| value < min) {
            return false;
        }
        if self.max.is_some_and(|max| value > max) {
            return false;
        }
        true
    }
}

/// Matcher for an optional selection (lens or journey). A JSON `null`
/// requires "nothing selected"; an array is OR over its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionMatch {
    AnyOf(Vec<String>),
    Is(String),
    Unselected,
}

impl SelectionMatch {
    fn matches(&self, actual: Option<&str>) -> bool {
        match self {
            SelectionMatch::Unselected => actual.is_none(),
            SelectionMatch::Is(expected) => actual == Some(expected.as_str()),
            SelectionMatch::AnyOf(options) => {
                actual.is_some_and(|a| options.iter().any(|o| o == a))
            }
        }
    }
}

/// UTC hour window, half-open (`start <= hour < end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

/// Time-based gating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSchedule {
    /// 0-6, Sunday through Saturday
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u32>>,
    #[serde(rename = "hoursUTC", skip_serializing_if = "Option::is_none")]
    pub hours_utc: Option<HourWindow>,
}

/// Conditions that make a moment eligible. Unspecified conditions pass;
/// specified ones are ANDed, except `stage`, which is OR over its entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MomentTrigger {
    pub stage: Option<Vec<TriggerStage>>,

    pub exchange_count: Option<NumericRange>,
    pub journeys_completed: Option<NumericRange>,
    pub sprouts_captured: Option<NumericRange>,
    pub entropy: Option<NumericRange>,
    pub minutes_active: Option<NumericRange>,
    pub session_count: Option<NumericRange>,

    /// All listed flags must carry the given value; absent flags read false.
    pub flags: Option<HashMap<String, bool>>,

    /// Present-but-null means "requires no lens selected", distinct from
    /// absent (no check at all).
    #[serde(
        deserialize_with = "present_selection",
        skip_serializing_if = "Option::is_none"
    )]
    pub lens: Option<SelectionMatch>,
    #[serde(
        deserialize_with = "present_selection",
        skip_serializing_if = "Option::is_none"
    )]
    pub journey: Option<SelectionMatch>,
    pub has_custom_lens: Option<bool>,

    /// Random gate in [0, 1] for staged rollout.
    pub probability: Option<f64>,

    pub schedule: Option<TriggerSchedule>,
}

fn present_selection<'de, D>(deserializer: D) -> Result<Option<SelectionMatch>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // Runs only when the field is present, so null reaches the untagged
    // enum and resolves to Unselected instead of collapsing into None.
    SelectionMatch::deserialize(deserializer).map(Some)
}

/// Displayable payload of a moment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// One configured marketing moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moment {
    pub id: String,
    pub status: MomentStatus,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub surface: MomentSurface,
    pub trigger: MomentTrigger,
    /// Minimum milliseconds between showings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_ms: Option<i64>,
    /// Show at most once per session (gated by a `moment_{id}_shown` flag)
    #[serde(default)]
    pub once: bool,
    /// Higher wins; defaults to 50
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default)]
    pub content: MomentContent,
}

fn default_enabled() -> bool {
    true
}

/// Snapshot of engagement state fed into trigger evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    pub stage: TriggerStage,
    pub exchange_count: u32,
    pub journeys_completed: u32,
    pub sprouts_captured: u32,
    pub entropy: f32,
    pub minutes_active: u32,
    pub session_count: u32,

    pub active_lens: Option<String>,
    pub active_journey: Option<String>,
    pub has_custom_lens: bool,

    pub flags: HashMap<String, bool>,
    pub moment_cooldowns: HashMap<String, i64>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self {
            stage: TriggerStage::Arrival,
            exchange_count: 0,
            journeys_completed: 0,
            sprouts_captured: 0,
            entropy: 0.0,
            minutes_active: 0,
            session_count: 1,
            active_lens: None,
            active_journey: None,
            has_custom_lens: false,
            flags: HashMap::new(),
            moment_cooldowns: HashMap::new(),
        }
    }
}

/// Outcome of a single trigger evaluation; the reason is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    pub eligible: bool,
    pub reason: Option<String>,
}

impl EvaluationResult {
    fn pass() -> Self {
        Self {
            eligible: true,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
        }
    }
}

/// Evaluates one trigger against a context snapshot. `now` drives the
/// schedule check only.
pub fn evaluate_trigger(
    trigger: &MomentTrigger,
    context: &EvaluationContext,
    now: DateTime<Utc>,
) -> EvaluationResult {
    if let Some(stages) = &trigger.stage {
        if !stages.is_empty() && !stages.contains(&context.stage) {
            return EvaluationResult::blocked(format!("stage {} not matched", context.stage));
        }
    }

    let ranges: [(&str, f64, &Option<NumericRange>); 6] = [
        ("exchangeCount", context.exchange_count.into(), &trigger.exchange_count),
        ("journeysCompleted", context.journeys_completed.into(), &trigger.journeys_completed),
        ("sproutsCaptured", context.sprouts_captured.into(), &trigger.sprouts_captured),
        ("entropy", context.entropy.into(), &trigger.entropy),
        ("minutesActive", context.minutes_active.into(), &trigger.minutes_active),
        ("sessionCount", context.session_count.into(), &trigger.session_count),
    ];
    for (name, value, range) in ranges {
        if let Some(range) = range {
            if !range.contains(value) {
                return EvaluationResult::blocked(format!("{name} out of range"));
            }
        }
    }

    if let Some(flags) = &trigger.flags {
        for (flag, expected) in flags {
            let actual = context.flags.get(flag).copied().unwrap_or(false);
            if actual != *expected {
                return EvaluationResult::blocked(format!(
                    "flag {flag} is {actual}, expected {expected}"
                ));
            }
        }
    }

    if let Some(lens) = &trigger.lens {
        if !lens.matches(context.active_lens.as_deref()) {
            return EvaluationResult::blocked("lens mismatch");
        }
    }
    if let Some(journey) = &trigger.journey {
        if !journey.matches(context.active_journey.as_deref()) {
            return EvaluationResult::blocked("journey mismatch");
        }
    }
    if let Some(expected) = trigger.has_custom_lens {
        if context.has_custom_lens != expected {
            return EvaluationResult::blocked("hasCustomLens mismatch");
        }
    }

    if let Some(probability) = trigger.probability {
        if probability < 1.0 && rand::random::<f64>() > probability {
            return EvaluationResult::blocked("probability gate");
        }
    }

    if let Some(schedule) = &trigger.schedule {
        if let Some(days) = &schedule.days_of_week {
            if !days.is_empty() && !days.contains(&now.weekday().num_days_from_sunday()) {
                return EvaluationResult::blocked("not scheduled for today");
            }
        }
        if let Some(window) = &schedule.hours_utc {
            let hour = now.hour();
            if hour < window.start || hour >= window.end {
                return EvaluationResult::blocked("outside scheduled hours");
            }
        }
    }

    EvaluationResult::pass()
}

/// All eligible moments for a surface, highest priority first. `now_ms`
/// drives cooldown comparisons and the schedule check.
pub fn eligible_moments<'a>(
    moments: &'a [Moment],
    context: &EvaluationContext,
    surface: MomentSurface,
    now_ms: i64,
) -> Vec<&'a Moment> {
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);

    let mut eligible: Vec<&Moment> = moments
        .iter()
        .filter(|m| m.enabled)
        .filter(|m| m.status == MomentStatus::Active)
        .filter(|m| m.surface == surface)
        .filter(|m| match m.cooldown_ms {
            Some(cooldown) => context
                .moment_cooldowns
                .get(&m.id)
                .is_none_or(|last| now_ms - last >= cooldown),
            None => true,
        })
        .filter(|m| {
            !m.once
                || !context
                    .flags
                    .get(&format!("moment_{}_shown", m.id))
                    .copied()
                    .unwrap_or(false)
        })
        .filter(|m| evaluate_trigger(&m.trigger, context, now).eligible)
        .collect();

    eligible.sort_by_key(|m| std::cmp::Reverse(m.priority.unwrap_or(DEFAULT_PRIORITY)));
    eligible
}

/// The single highest-priority eligible moment, if any.
pub fn top_moment<'a>(
    moments: &'a [Moment],
    context: &EvaluationContext,
    surface: MomentSurface,
    now_ms: i64,
) -> Option<&'a Moment> {
    eligible_moments(moments, context, surface, now_ms)
        .into_iter()
        .next()
}
