//! The recognized-lens catalog.
//!
//! Lens ids arrive from untrusted places (deep links, persisted storage), so
//! selection and hydration validate against this catalog before dispatching.

/// Lens ids shipped with the site content.
pub const DEFAULT_LENSES: &[&str] = &[
    "academic",
    "big-ai-exec",
    "concerned-citizen",
    "engineer",
    "family-office",
    "freestyle",
    "geopolitical",
];

/// Set of lens ids the application accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LensCatalog {
    ids: Vec<String>,
}

impl Default for LensCatalog {
    fn default() -> Self {
        Self {
            ids: DEFAULT_LENSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LensCatalog {
    /// A catalog holding exactly the given ids.
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_recognized(&self, id: &str) -> bool {
        self.ids.iter().any(|l| l == id)
    }

    /// Registers a custom lens id. Duplicates are ignored.
    pub fn add(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.is_recognized(&id) {
            self.ids.push(id);
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}
