//! Content transformers.
//!
//! Pure functions that run over a finalized response's accumulated content.
//! Pipeline order matters: the navigation parser strips its block before the
//! rhetorical parser scans, so directive text never becomes spans.

pub mod ids;
pub mod navigation;
pub mod rhetorical;

pub use navigation::{ParsedNavigation, parse_navigation};
pub use rhetorical::{ParsedRhetoric, parse};
