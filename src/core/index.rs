//! Per-container ordered index of categorized items.
//!
//! Entries are kept sorted by [`EntryOrder`] then uid, so an index
//! maintained through upserts is identical to one rebuilt from scratch.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{CategorizedItem, CategoryTree, ContentItem, EntryOrder};

use super::builder::ItemBuilder;

/// Outcome of a full rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Entries written to the index
    pub indexed: usize,

    /// Items skipped because their category does not resolve
    pub dropped: usize,
}

/// Ordered mapping from uid to snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedIndex {
    entries: Vec<CategorizedItem>,
}

fn sort_key(item: &CategorizedItem) -> (EntryOrder, &str) {
    (item.order, item.uid.as_str())
}

impl CategorizedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `item.uid`
    pub fn upsert(&mut self, item: CategorizedItem) {
        self.remove(&item.uid);
        let at = self
            .entries
            .partition_point(|e| sort_key(e) < sort_key(&item));
        self.entries.insert(at, item);
    }

    /// Remove an entry by uid
    pub fn remove(&mut self, uid: &str) -> Option<CategorizedItem> {
        let pos = self.entries.iter().position(|e| e.uid == uid)?;
        Some(self.entries.remove(pos))
    }

    pub fn get(&self, uid: &str) -> Option<&CategorizedItem> {
        self.entries.iter().find(|e| e.uid == uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.get(uid).is_some()
    }

    /// Entries in index order
    pub fn iter(&self) -> impl Iterator<Item = &CategorizedItem> {
        self.entries.iter()
    }

    pub fn uids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.uid.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Recompute every entry from the given items.
    ///
    /// Items without a category key are ignored; items whose key does not
    /// resolve are dropped without error.
    pub fn rebuild<'a, I>(&mut self, items: I, tree: &CategoryTree, builder: &ItemBuilder) -> RebuildReport
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        self.clear();
        let mut report = RebuildReport::default();

        for item in items {
            let Some(key) = item.category_key() else {
                continue;
            };
            match builder.build_from_tree(item, tree) {
                Some(snapshot) => {
                    self.upsert(snapshot);
                    report.indexed += 1;
                }
                None => {
                    warn!(uid = %item.uid, category = %key, "Dropping item with unresolvable category");
                    report.dropped += 1;
                }
            }
        }

        debug!(indexed = report.indexed, dropped = report.dropped, "Index rebuilt");
        report
    }

    /// Digest of the index content (first 16 hex chars of SHA256)
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(&self.entries).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
