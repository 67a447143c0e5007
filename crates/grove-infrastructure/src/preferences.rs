//! Persisted user preferences: active lens and completed journeys.
//!
//! Reads degrade to neutral defaults on any storage failure so a broken
//! store never blocks the session; writes log a warning and move on.

use crate::storage::KeyValueStore;

pub const LENS_KEY: &str = "grove-lens";
pub const COMPLETED_JOURNEYS_KEY: &str = "grove-completed-journeys";

pub struct Preferences<S> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The persisted lens id, if any. Failures read as "no preference".
    pub fn lens(&self) -> Option<String> {
        match self.store.get(LENS_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted lens");
                None
            }
        }
    }

    pub fn set_lens(&self, lens: &str) {
        if let Err(e) = self.store.set(LENS_KEY, lens) {
            tracing::warn!(error = %e, lens, "failed to persist lens");
        }
    }

    pub fn clear_lens(&self) {
        if let Err(e) = self.store.remove(LENS_KEY) {
            tracing::warn!(error = %e, "failed to clear persisted lens");
        }
    }

    /// Journey ids the user has finished, oldest first. Failures and
    /// corrupt payloads read as an empty list.
    pub fn completed_journeys(&self) -> Vec<String> {
        let raw = match self.store.get(COMPLETED_JOURNEYS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read completed journeys");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(journeys) => journeys,
            Err(e) => {
                tracing::warn!(error = %e, "corrupt completed-journeys payload, resetting");
                Vec::new()
            }
        }
    }

    /// Records a completion, deduplicating repeats.
    pub fn mark_journey_completed(&self, journey_id: &str) {
        let mut journeys = self.completed_journeys();
        if journeys.iter().any(|j| j == journey_id) {
            return;
        }
        journeys.push(journey_id.to_string());

        match serde_json::to_string(&journeys) {
            Ok(json) => {
                if let Err(e) = self.store.set(COMPLETED_JOURNEYS_KEY, &json) {
                    tracing::warn!(error = %e, journey_id, "failed to persist journey completion");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode completed journeys"),
        }
    }
}
