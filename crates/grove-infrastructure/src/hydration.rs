//! Session hydration: replaying persisted preferences into a fresh machine.
//!
//! Persisted values are untrusted (another tab, an old build, a hand-edited
//! file), so everything is validated before it reaches the machine. Invalid
//! values are skipped with a warning, never dispatched.

use crate::preferences::Preferences;
use crate::storage::KeyValueStore;
use grove_core::engagement::{EngagementEvent, EngagementMachine, LensSource};
use grove_core::lens::LensCatalog;

/// What hydration actually restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    pub lens_restored: Option<String>,
    pub completed_journeys: Vec<String>,
}

/// Replays persisted state into the machine. Only runs meaningfully against
/// a machine still in its anonymous state; a lens already active wins.
pub fn hydrate<S: KeyValueStore>(
    machine: &mut EngagementMachine,
    preferences: &Preferences<S>,
    catalog: &LensCatalog,
) -> HydrationReport {
    let mut report = HydrationReport {
        completed_journeys: preferences.completed_journeys(),
        ..HydrationReport::default()
    };

    if let Some(lens) = preferences.lens() {
        if catalog.is_recognized(&lens) {
            machine.send(EngagementEvent::SelectLens {
                lens: lens.clone(),
                source: LensSource::LocalStorage,
            });
            if machine.matches("session.lens_active") {
                report.lens_restored = Some(lens);
            }
        } else {
            tracing::warn!(lens, "persisted lens not in catalog, skipping");
        }
    }

    report
}

/// Persists the just-finished journey and the active lens. Call after the
/// machine reaches journey completion.
pub fn persist_completion<S: KeyValueStore>(
    machine: &EngagementMachine,
    preferences: &Preferences<S>,
) {
    if let Some(journey) = &machine.context().journey {
        preferences.mark_journey_completed(&journey.id);
    }
    if let Some(lens) = &machine.context().lens {
        preferences.set_lens(lens);
    }
}
