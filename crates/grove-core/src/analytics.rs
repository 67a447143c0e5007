//! Analytics events and the sink boundary.
//!
//! Producers receive a sink by injection; nothing in this crate reaches for
//! a global. The default sink batches locally and drains on demand, which is
//! enough for a host that flushes on its own schedule.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Events worth counting. Payload fields stay small and serializable so any
/// transport can carry them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A user query was sent to the backend
    ExchangeSent { exchange_count: u32 },
    /// A concept span was clicked
    PivotClicked { concept: String },
    /// A navigation fork was selected
    ForkSelected { fork_id: String, kind: String },
    /// A lens was chosen or switched
    LensSelected { lens: String, source: String },
    /// A journey finished
    JourneyCompleted { journey_id: String },
    /// An entropy-driven journey offer was shown
    EntropyInjection { cluster: String, score: u32 },
    /// The chat backend failed mid-exchange
    ExchangeFailed { message: String },
}

/// Sink boundary. Implementations must be cheap to call from the exchange
/// path; anything slow belongs behind the drain.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

/// Default sink: a bounded in-memory buffer the host drains periodically.
/// Overflow drops the oldest events first.
pub struct BatchingSink {
    capacity: usize,
    buffer: Mutex<Vec<AnalyticsEvent>>,
}

impl BatchingSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Takes all buffered events, leaving the buffer empty.
    pub fn drain(&self) -> Vec<AnalyticsEvent> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BatchingSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl AnalyticsSink for BatchingSink {
    fn track(&self, event: AnalyticsEvent) {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.len() >= self.capacity {
            buffer.remove(0);
            tracing::warn!("analytics buffer full, dropping oldest event");
        }
        buffer.push(event);
    }
}

/// Discards everything. For tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn track(&self, _event: AnalyticsEvent) {}
}
