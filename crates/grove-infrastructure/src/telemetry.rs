//! Cumulative telemetry persistence.
//!
//! V1 stored bare counters under a single global key. V2 keys by field and
//! stores attributed records, so each count carries when and where it
//! happened. Loading a field runs a one-time upgrade: legacy counters are
//! expanded into placeholder records stamped at migration time, and the V2
//! payload becomes the source of truth from then on.

use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};

pub const LEGACY_METRICS_KEY: &str = "grove-telemetry-cumulative";

pub fn metrics_key(field_id: &str) -> String {
    format!("grove-telemetry-{field_id}-cumulative-v2")
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Legacy global counters, kept only for migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CumulativeMetrics {
    pub journeys_completed: u32,
    pub topics_explored: u32,
    pub sprouts_captured: u32,
    pub session_count: u32,
    pub last_session_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyCompletion {
    pub field_id: String,
    pub timestamp: i64,
    pub journey_id: String,
    pub duration_ms: i64,
    pub waypoints_visited: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicExploration {
    pub field_id: String,
    pub timestamp: i64,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_trigger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SproutCapture {
    pub field_id: String,
    pub timestamp: i64,
    pub sprout_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_id: Option<String>,
}

/// Per-field attributed metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeMetricsV2 {
    pub version: u32,
    pub field_id: String,
    pub journey_completions: Vec<JourneyCompletion>,
    pub topic_explorations: Vec<TopicExploration>,
    pub sprout_captures: Vec<SproutCapture>,
    pub session_count: u32,
    pub last_session_at: i64,
}

impl CumulativeMetricsV2 {
    pub fn empty(field_id: &str) -> Self {
        Self {
            version: 2,
            field_id: field_id.to_string(),
            journey_completions: Vec::new(),
            topic_explorations: Vec::new(),
            sprout_captures: Vec::new(),
            session_count: 0,
            last_session_at: 0,
        }
    }
}

/// Expands legacy counters into V2 records. Placeholder records carry
/// synthetic ids and the migration timestamp; the counts are what matters.
pub fn migrate_legacy_metrics(legacy: &CumulativeMetrics, field_id: &str) -> CumulativeMetricsV2 {
    let now = now_millis();
    let mut v2 = CumulativeMetricsV2::empty(field_id);

    v2.journey_completions = (0..legacy.journeys_completed)
        .map(|n| JourneyCompletion {
            field_id: field_id.to_string(),
            timestamp: now,
            journey_id: format!("migrated-journey-{n}"),
            duration_ms: 0,
            waypoints_visited: 0,
        })
        .collect();
    v2.topic_explorations = (0..legacy.topics_explored)
        .map(|n| TopicExploration {
            field_id: field_id.to_string(),
            timestamp: now,
            topic_id: format!("migrated-topic-{n}"),
            hub_id: None,
            query_trigger: None,
        })
        .collect();
    v2.sprout_captures = (0..legacy.sprouts_captured)
        .map(|n| SproutCapture {
            field_id: field_id.to_string(),
            timestamp: now,
            sprout_id: format!("migrated-sprout-{n}"),
            journey_id: None,
            hub_id: None,
        })
        .collect();
    v2.session_count = legacy.session_count;
    v2.last_session_at = legacy.last_session_at;
    v2
}

/// Telemetry accessor over a key-value store. All reads degrade to empty
/// metrics; all writes warn and continue on failure.
pub struct TelemetryStore<S> {
    store: S,
}

impl<S: KeyValueStore> TelemetryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads metrics for a field, running the legacy upgrade when a V2
    /// payload does not exist yet.
    pub fn load(&self, field_id: &str) -> CumulativeMetricsV2 {
        let key = metrics_key(field_id);

        match self.store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(v2) => return v2,
                Err(e) => {
                    tracing::warn!(error = %e, field_id, "corrupt telemetry payload, resetting");
                    return CumulativeMetricsV2::empty(field_id);
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, field_id, "failed to read telemetry");
                return CumulativeMetricsV2::empty(field_id);
            }
        }

        // No V2 payload yet: upgrade from the legacy counters if present.
        let migrated = match self.store.get(LEGACY_METRICS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<CumulativeMetrics>(&raw) {
                Ok(legacy) => {
                    tracing::info!(field_id, "migrating legacy telemetry counters");
                    migrate_legacy_metrics(&legacy, field_id)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "corrupt legacy telemetry, starting fresh");
                    CumulativeMetricsV2::empty(field_id)
                }
            },
            Ok(None) => CumulativeMetricsV2::empty(field_id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read legacy telemetry");
                CumulativeMetricsV2::empty(field_id)
            }
        };

        self.save(&migrated);
        migrated
    }

    pub fn save(&self, metrics: &CumulativeMetricsV2) {
        let key = metrics_key(&metrics.field_id);
        match serde_json::to_string(metrics) {
            Ok(json) => {
                if let Err(e) = self.store.set(&key, &json) {
                    tracing::warn!(error = %e, field_id = metrics.field_id, "failed to persist telemetry");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode telemetry"),
        }
    }

    pub fn record_journey_completion(
        &self,
        field_id: &str,
        journey_id: &str,
        duration_ms: i64,
        waypoints_visited: u32,
    ) {
        let mut metrics = self.load(field_id);
        metrics.journey_completions.push(JourneyCompletion {
            field_id: field_id.to_string(),
            timestamp: now_millis(),
            journey_id: journey_id.to_string(),
            duration_ms,
            waypoints_visited,
        });
        self.save(&metrics);
    }

    pub fn record_topic_exploration(
        &self,
        field_id: &str,
        topic_id: &str,
        hub_id: Option<&str>,
        query_trigger: Option<&str>,
    ) {
        let mut metrics = self.load(field_id);
        metrics.topic_explorations.push(TopicExploration {
            field_id: field_id.to_string(),
            timestamp: now_millis(),
            topic_id: topic_id.to_string(),
            hub_id: hub_id.map(str::to_string),
            query_trigger: query_trigger.map(str::to_string),
        });
        self.save(&metrics);
    }

    pub fn record_sprout_capture(
        &self,
        field_id: &str,
        sprout_id: &str,
        journey_id: Option<&str>,
        hub_id: Option<&str>,
    ) {
        let mut metrics = self.load(field_id);
        metrics.sprout_captures.push(SproutCapture {
            field_id: field_id.to_string(),
            timestamp: now_millis(),
            sprout_id: sprout_id.to_string(),
            journey_id: journey_id.map(str::to_string),
            hub_id: hub_id.map(str::to_string),
        });
        self.save(&metrics);
    }

    /// Bumps the session counter and last-seen stamp.
    pub fn record_session(&self, field_id: &str) {
        let mut metrics = self.load(field_id);
        metrics.session_count += 1;
        metrics.last_session_at = now_millis();
        self.save(&metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::FailingStore;
    use crate::storage::{KeyValueStore, MemoryStore};

    #[test]
    fn fresh_field_loads_empty_metrics() {
        let telemetry = TelemetryStore::new(MemoryStore::new());
        let metrics = telemetry.load("grove");

        assert_eq!(metrics.version, 2);
        assert_eq!(metrics.field_id, "grove");
        assert!(metrics.journey_completions.is_empty());
        assert_eq!(metrics.session_count, 0);
    }

    #[test]
    fn legacy_counters_migrate_to_placeholder_records() {
        let store = MemoryStore::new();
        let legacy = CumulativeMetrics {
            journeys_completed: 2,
            topics_explored: 3,
            sprouts_captured: 1,
            session_count: 5,
            last_session_at: 1_704_067_200_000,
        };
        store
            .set(
                LEGACY_METRICS_KEY,
                &serde_json::to_string(&legacy).unwrap(),
            )
            .unwrap();

        let telemetry = TelemetryStore::new(store);
        let metrics = telemetry.load("grove");

        assert_eq!(metrics.journey_completions.len(), 2);
        assert_eq!(metrics.topic_explorations.len(), 3);
        assert_eq!(metrics.sprout_captures.len(), 1);
        assert_eq!(metrics.session_count, 5);
        assert_eq!(metrics.last_session_at, 1_704_067_200_000);
        assert_eq!(
            metrics.journey_completions[0].journey_id,
            "migrated-journey-0"
        );
    }

    #[test]
    fn migration_runs_only_once() {
        let store = MemoryStore::new();
        let legacy = CumulativeMetrics {
            journeys_completed: 1,
            ..CumulativeMetrics::default()
        };
        store
            .set(
                LEGACY_METRICS_KEY,
                &serde_json::to_string(&legacy).unwrap(),
            )
            .unwrap();

        let telemetry = TelemetryStore::new(store);
        let first = telemetry.load("grove");
        assert_eq!(first.journey_completions.len(), 1);

        // New live data lands in V2.
        telemetry.record_journey_completion("grove", "ratchet", 60_000, 4);

        // A second load reads V2 and does not re-expand the legacy counters.
        let second = telemetry.load("grove");
        assert_eq!(second.journey_completions.len(), 2);
        assert_eq!(second.journey_completions[1].journey_id, "ratchet");
    }

    #[test]
    fn fields_are_isolated() {
        let telemetry = TelemetryStore::new(MemoryStore::new());
        telemetry.record_topic_exploration("grove", "ratchet-effect", Some("ratchet-effect"), None);

        assert_eq!(telemetry.load("grove").topic_explorations.len(), 1);
        assert!(telemetry.load("orchard").topic_explorations.is_empty());
    }

    #[test]
    fn session_recording_bumps_the_counter() {
        let telemetry = TelemetryStore::new(MemoryStore::new());
        telemetry.record_session("grove");
        telemetry.record_session("grove");

        let metrics = telemetry.load("grove");
        assert_eq!(metrics.session_count, 2);
        assert!(metrics.last_session_at > 0);
    }

    #[test]
    fn failing_store_degrades_to_empty_metrics() {
        let telemetry = TelemetryStore::new(FailingStore);
        let metrics = telemetry.load("grove");
        assert_eq!(metrics, CumulativeMetricsV2::empty("grove"));

        // Writes warn and continue.
        telemetry.record_session("grove");
    }

    #[test]
    fn corrupt_v2_payload_resets_without_remigrating() {
        let store = MemoryStore::new();
        store.set(&metrics_key("grove"), "{broken").unwrap();

        let telemetry = TelemetryStore::new(store);
        let metrics = telemetry.load("grove");
        assert_eq!(metrics, CumulativeMetricsV2::empty("grove"));
    }
}
