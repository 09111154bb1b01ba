use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::table::NamedTable;

/// Session-scoped store of the latest partition run's groups, keyed by
/// artifact name in group order.
///
/// Contents are only ever replaced as a whole: readers take an `Arc`
/// snapshot, so a reader never observes a half-applied run.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: RwLock<Arc<Vec<NamedTable>>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, entries: Vec<NamedTable>) {
        let next = Arc::new(entries);
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        debug!(previous = guard.len(), next = next.len(), "replacing artifact cache");
        *guard = next;
    }

    pub fn snapshot(&self) -> Arc<Vec<NamedTable>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<NamedTable> {
        self.snapshot().iter().find(|t| t.name == name).cloned()
    }
}
