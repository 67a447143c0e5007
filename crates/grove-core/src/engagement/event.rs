//! Events accepted by the engagement machine.
//!
//! This union is the machine's only write surface: UI layers and test
//! harnesses dispatch against it, and every context mutation happens inside
//! the machine's handling of one of these variants.

use super::context::{Journey, LensSource};
use crate::stream::{JourneyFork, RhetoricalSpan};
use serde::{Deserialize, Serialize};

/// High-level events dispatched to the engagement machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngagementEvent {
    /// First lens selection; leaves the anonymous state.
    SelectLens { lens: String, source: LensSource },
    /// Lens switch after one is already active.
    ChangeLens { lens: String },
    /// Begin (or switch to) a scripted journey.
    StartJourney { journey: Journey },
    /// Move to the next waypoint; silently blocked at the last one.
    AdvanceStep,
    /// Mark the active journey finished.
    CompleteJourney,
    /// Abandon the active/finished journey, back to freestyle.
    ExitJourney,

    OpenTerminal,
    CloseTerminal,

    /// Overwrite the entropy signal. The machine does not clamp.
    UpdateEntropy { value: f32 },

    /// Stage a new user query. Not durable until the response begins.
    StartQuery { prompt: String },
    /// Begin an assistant response; commits the staged query to history.
    StartResponse,
    /// Append streamed text to the in-flight response.
    StreamChunk { chunk: String },
    /// Parse and seal the in-flight response, appending it to history.
    FinalizeResponse,

    /// A clicked concept span; synthesizes an immediately-durable query.
    #[serde(rename = "user.click_pivot")]
    ClickPivot {
        span: RhetoricalSpan,
        response_id: String,
    },
    /// A selected navigation fork; synthesizes an immediately-durable query.
    #[serde(rename = "user.select_fork")]
    SelectFork {
        fork: JourneyFork,
        response_id: String,
    },

    /// A response touched a topic hub (entropy bookkeeping).
    HubVisited { hub_id: String },

    SetFlag { key: String, value: bool },
    SetCooldown { moment_id: String, timestamp: i64 },
    ClearFlags,
    ClearCooldowns,
}
