//! Grove infrastructure: persistence and session hydration.
//!
//! Everything here sits behind the `KeyValueStore` seam. Reads degrade to
//! neutral defaults and writes warn-and-continue, so storage trouble never
//! takes the conversation down with it.

pub mod hydration;
pub mod preferences;
pub mod storage;
pub mod telemetry;

pub use hydration::{HydrationReport, hydrate, persist_completion};
pub use preferences::Preferences;
pub use storage::{AtomicJsonFile, DirStore, KeyValueStore, MemoryStore};
pub use telemetry::{CumulativeMetrics, CumulativeMetricsV2, TelemetryStore};
