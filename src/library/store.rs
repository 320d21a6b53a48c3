//! JSON snapshot of a site on disk.
//!
//! The snapshot holds the content tree (category configuration, containers
//! with their indexes, items) and the conversion service's records.
//! Writes go through a temporary file in the same directory and are
//! persisted atomically under an exclusive lock.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::core::preview::ConversionRecord;

use super::repository::ContentTree;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything persisted for one site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub version: u32,

    #[serde(default)]
    pub content: ContentTree,

    /// Conversion records by item uid
    #[serde(default)]
    pub conversions: BTreeMap<String, ConversionRecord>,
}

impl Default for SiteSnapshot {
    fn default() -> Self {
        Self::new(ContentTree::default())
    }
}

impl SiteSnapshot {
    pub fn new(content: ContentTree) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            content,
            conversions: BTreeMap::new(),
        }
    }

    pub fn with_conversions(mut self, conversions: BTreeMap<String, ConversionRecord>) -> Self {
        self.conversions = conversions;
        self
    }
}

/// File-backed store for a [`SiteSnapshot`]
#[derive(Debug, Clone)]
pub struct SiteStore {
    path: PathBuf,
}

impl SiteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured location
    pub fn from_config() -> Result<Self> {
        Ok(Self::new(crate::config::store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Load the snapshot; a missing file yields an empty site
    pub async fn load(&self) -> Result<SiteSnapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No site snapshot, starting empty");
            return Ok(SiteSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read site snapshot: {}", self.path.display()))?;

        let snapshot: SiteSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse site snapshot: {}", self.path.display()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            anyhow::bail!(
                "Site snapshot version {} is newer than supported version {}",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        Ok(snapshot)
    }

    /// Save the snapshot atomically
    pub async fn save(&self, snapshot: &SiteSnapshot) -> Result<()> {
        let body = serde_json::to_vec_pretty(snapshot).context("Failed to serialize site snapshot")?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let path = self.path.clone();
        let lock_path = self.lock_path();
        tokio::task::spawn_blocking(move || write_locked(&parent, &path, &lock_path, &body))
            .await
            .context("Snapshot writer task failed")??;

        debug!(path = %self.path.display(), "Site snapshot saved");
        Ok(())
    }
}

fn write_locked(dir: &Path, path: &Path, lock_path: &Path, body: &[u8]) -> Result<()> {
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
    lock.lock_exclusive()
        .with_context(|| format!("Failed to acquire lock: {}", lock_path.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(body).context("Failed to write site snapshot")?;
    temp.flush().context("Failed to flush site snapshot")?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace site snapshot: {}", path.display()))?;

    // Lock is released when the file is dropped
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryConfig, CategoryGroup, CategoryTree};
    use tempfile::TempDir;

    fn snapshot() -> SiteSnapshot {
        let tree = CategoryTree::new().with_group(
            CategoryGroup::new("group-1", "Group 1").with_category(CategoryConfig::new("category-1", "Category 1")),
        );
        let mut conversions = BTreeMap::new();
        conversions.insert("abc".to_string(), ConversionRecord::succeeded());
        SiteSnapshot::new(ContentTree::new(tree)).with_conversions(conversions)
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SiteStore::new(temp.path().join("site.json"));

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.version, SNAPSHOT_VERSION);
        assert!(loaded.content.categories.groups.is_empty());
        assert!(loaded.content.container("").is_some());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let store = SiteStore::new(temp.path().join("nested").join("site.json"));

        store.save(&snapshot()).await.unwrap();
        assert!(store.path().exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.content.categories.groups[0].id, "group-1");
        assert_eq!(loaded.conversions.get("abc"), Some(&ConversionRecord::succeeded()));
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let temp = TempDir::new().unwrap();
        let store = SiteStore::new(temp.path().join("site.json"));
        let mut future = snapshot();
        future.version = SNAPSHOT_VERSION + 1;
        store.save(&future).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn test_save_overwrites_in_place() {
        let temp = TempDir::new().unwrap();
        let store = SiteStore::new(temp.path().join("site.json"));

        tokio_test::block_on(async {
            store.save(&SiteSnapshot::default()).await.unwrap();
            store.save(&snapshot()).await.unwrap();
            let loaded = store.load().await.unwrap();
            assert_eq!(loaded.content.categories.groups.len(), 1);
        });
    }
}
