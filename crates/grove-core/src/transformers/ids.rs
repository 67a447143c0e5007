//! Identifier generation for parser output.
//!
//! Span and fork ids combine a process-wide monotonic counter with a
//! millisecond timestamp, which keeps them unique within a session. The
//! counter can be reset so tests get deterministic sequences.

use crate::stream::now_millis;
use std::sync::atomic::{AtomicU64, Ordering};

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next(prefix: &str) -> String {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}", prefix, now_millis(), n)
}

/// Next unique span id.
pub fn next_span_id() -> String {
    next("span")
}

/// Next unique fork id, used when a navigation block omits one.
pub fn next_fork_id() -> String {
    next("fork")
}

/// Resets the id counter. Test seam; ids stay unique either way because the
/// timestamp component still advances.
pub fn reset_id_counter() {
    ID_COUNTER.store(0, Ordering::Relaxed);
}
