//! Preview conversion status of content items.
//!
//! Conversion itself happens in an external service; this module only
//! reads the per-item record the service leaves behind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::domain::{ContentItem, PreviewStatus};

/// Per-item record kept by the conversion service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Unset while conversion has not finished
    #[serde(default)]
    pub successfully_converted: Option<bool>,
}

impl ConversionRecord {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn succeeded() -> Self {
        Self {
            successfully_converted: Some(true),
        }
    }

    pub fn failed() -> Self {
        Self {
            successfully_converted: Some(false),
        }
    }
}

/// Read access to the conversion service's records
pub trait ConversionService: Send + Sync {
    /// Record for an item, `None` if the service never saw it
    fn record(&self, uid: &str) -> Option<ConversionRecord>;
}

/// In-memory record store, shared between the service and the resolver
#[derive(Debug, Default)]
pub struct ConversionRecords {
    records: RwLock<BTreeMap<String, ConversionRecord>>,
}

impl ConversionRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(records: BTreeMap<String, ConversionRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn set(&self, uid: impl Into<String>, record: ConversionRecord) {
        if let Ok(mut records) = self.records.write() {
            records.insert(uid.into(), record);
        }
    }

    pub fn clear(&self, uid: &str) {
        if let Ok(mut records) = self.records.write() {
            records.remove(uid);
        }
    }

    /// Copy of every record, for persistence
    pub fn snapshot(&self) -> BTreeMap<String, ConversionRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl ConversionService for ConversionRecords {
    fn record(&self, uid: &str) -> Option<ConversionRecord> {
        self.records.read().ok()?.get(uid).copied()
    }
}

/// Decides whether an item is convertible and where its conversion stands
#[derive(Clone)]
pub struct PreviewStatusResolver {
    /// Lowercased file extensions the service converts
    convertible_types: BTreeSet<String>,
    service: Arc<dyn ConversionService>,
}

impl std::fmt::Debug for PreviewStatusResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewStatusResolver")
            .field("convertible_types", &self.convertible_types)
            .finish_non_exhaustive()
    }
}

impl PreviewStatusResolver {
    pub fn new<I, S>(convertible_types: I, service: Arc<dyn ConversionService>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            convertible_types: convertible_types
                .into_iter()
                .map(|t| t.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            service,
        }
    }

    pub fn convertible_types(&self) -> &BTreeSet<String> {
        &self.convertible_types
    }

    /// File or image whose extension is in the convertible set
    pub fn is_convertible(&self, item: &ContentItem) -> bool {
        item.primary_file()
            .and_then(|payload| payload.extension())
            .is_some_and(|ext| self.convertible_types.contains(&ext))
    }

    /// Current conversion status, read live from the service
    pub fn status(&self, item: &ContentItem) -> PreviewStatus {
        if !self.is_convertible(item) {
            return PreviewStatus::NotConvertable;
        }

        match self.service.record(&item.uid) {
            None => PreviewStatus::InProgress,
            Some(record) => match record.successfully_converted {
                None => PreviewStatus::InProgress,
                Some(false) => PreviewStatus::ConversionError,
                Some(true) => PreviewStatus::Converted,
            },
        }
    }

    pub fn converted(&self, item: &ContentItem) -> bool {
        self.status(item) == PreviewStatus::Converted
    }
}
