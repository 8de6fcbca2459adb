//! Application-owned metric registry.
//!
//! There is no process-global registry: the application creates a
//! [`Registry`], registers the collectors it wants exposed and gathers from
//! it when scraped.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ObserveError, Result};
use crate::export::encode_text;
use crate::snapshot::MetricFamily;

/// Anything that can report metric families.
pub trait MetricSource: Send + Sync {
    /// Current families.
    fn collect(&self) -> Vec<MetricFamily>;
}

struct Entry {
    names: Vec<String>,
    source: Arc<dyn MetricSource>,
}

/// Set of metric sources gathered together.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Vec<Entry>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source.
    ///
    /// # Errors
    /// Returns [`ObserveError::AlreadyRegistered`] if any family name the
    /// source reports is already registered, or is reported twice by the
    /// source itself.
    pub fn register(&self, source: Arc<dyn MetricSource>) -> Result<()> {
        let names: Vec<String> = source.collect().into_iter().map(|f| f.name).collect();

        let mut entries = self.entries.write();
        let mut taken: HashSet<&str> = entries
            .iter()
            .flat_map(|e| e.names.iter().map(String::as_str))
            .collect();
        for name in &names {
            if !taken.insert(name.as_str()) {
                return Err(ObserveError::already_registered(name.clone()));
            }
        }

        tracing::debug!(families = names.len(), "metric source registered");
        entries.push(Entry { names, source });
        Ok(())
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Collects every source, families sorted by name.
    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        let sources: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|e| Arc::clone(&e.source))
            .collect();
        let mut families: Vec<_> = sources.iter().flat_map(|s| s.collect()).collect();
        families.sort_by(|a, b| a.name.cmp(&b.name));
        families
    }

    /// Gathers and renders in text exposition format.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_text(&self.gather())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.len())
            .finish()
    }
}
