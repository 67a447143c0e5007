//! Grove engagement core.
//!
//! The engine behind the site's conversational terminal: a parallel
//! engagement state machine, a typed append-only stream log, content
//! transformers for finalized responses, entropy scoring, and the chat and
//! analytics boundaries the hosting shell plugs into.
//!
//! Everything here is deterministic and synchronous except the chat seam;
//! rendering, transport, and persistence live in sibling crates.

pub mod analytics;
pub mod chat;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod lens;
pub mod stream;
pub mod transformers;

pub use engagement::{EngagementContext, EngagementEvent, EngagementMachine};
pub use error::{GroveError, Result};
pub use stream::StreamItem;
