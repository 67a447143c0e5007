//! Stream data model.
//!
//! # Module Structure
//!
//! - `item`: The `StreamItem` discriminated union and its variants
//! - `span`: Rhetorical span annotations (`RhetoricalSpan`, `SpanKind`)
//! - `fork`: Suggested next actions (`JourneyFork`, `ForkKind`, `JourneyPath`)

mod fork;
mod item;
mod span;

pub use fork::{ForkKind, JourneyFork, JourneyPath};
pub use item::{
    CreatedBy, LensOfferItem, NavigationItem, OfferStatus, PivotContext, QueryItem, ResponseItem,
    RevealItem, RevealKind, Role, StreamItem, SystemItem,
};
pub use span::{RhetoricalSpan, SpanKind};

pub(crate) use item::now_millis;
