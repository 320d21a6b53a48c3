//! Content repository: containers, items and the category tree.
//!
//! The repository owns every container's [`CategorizedIndex`] and tells
//! registered [`LifecycleObserver`]s about each change, synchronously and
//! before the mutating call returns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::builder::ItemBuilder;
use crate::core::guard::{GuardError, ReferentialGuard, RemovalScope};
use crate::core::index::{CategorizedIndex, RebuildReport};
use crate::domain::category::{parent_of, Detached};
use crate::domain::{BatchMode, CategoryNode, CategoryTree, ContentItem, LifecycleEvent, Notification};

/// Errors raised by repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Container not found: '{0}'")]
    ContainerNotFound(String),

    #[error("Container already exists: '{0}'")]
    ContainerExists(String),

    #[error("An item with id '{id}' already exists in '{container}'")]
    DuplicateId { container: String, id: String },

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Cannot move {node} under {parent}")]
    InvalidMove { node: String, parent: String },

    #[error(transparent)]
    InUse(#[from] GuardError),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Receives lifecycle events from the repository
pub trait LifecycleObserver {
    /// Handle one event; may mutate content and return notifications
    fn notify(&mut self, event: &LifecycleEvent, content: &mut ContentTree) -> Vec<Notification>;
}

/// Folder holding items, with its index as a persisted attribute
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    pub path: String,

    /// Child item uids in position order
    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub index: CategorizedIndex,
}

impl Container {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            children: Vec::new(),
            index: CategorizedIndex::new(),
        }
    }
}

/// Parent path of a container path ("" is the root and has none)
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').map_or("", |(parent, _)| parent))
}

fn in_subtree(path: &str, root: &str) -> bool {
    root.is_empty() || path == root || path.starts_with(&format!("{}/", root))
}

/// Everything the repository stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTree {
    #[serde(default)]
    pub categories: CategoryTree,

    #[serde(default)]
    containers: BTreeMap<String, Container>,

    #[serde(default)]
    items: BTreeMap<String, ContentItem>,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new(CategoryTree::new())
    }
}

impl ContentTree {
    /// Empty tree with only the root container
    pub fn new(categories: CategoryTree) -> Self {
        let mut containers = BTreeMap::new();
        containers.insert(String::new(), Container::new(""));
        Self {
            categories,
            containers,
            items: BTreeMap::new(),
        }
    }

    pub fn container(&self, path: &str) -> Option<&Container> {
        self.containers.get(path)
    }

    pub fn container_mut(&mut self, path: &str) -> Option<&mut Container> {
        self.containers.get_mut(path)
    }

    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }

    pub fn index(&self, path: &str) -> Option<&CategorizedIndex> {
        self.containers.get(path).map(|c| &c.index)
    }

    pub fn item(&self, uid: &str) -> Option<&ContentItem> {
        self.items.get(uid)
    }

    pub fn item_mut(&mut self, uid: &str) -> Option<&mut ContentItem> {
        self.items.get_mut(uid)
    }

    /// Category tree alongside one mutable item
    pub fn item_with_categories(&mut self, uid: &str) -> Option<(&CategoryTree, &mut ContentItem)> {
        let item = self.items.get_mut(uid)?;
        Some((&self.categories, item))
    }

    /// Every item of the repository
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.values()
    }

    /// Direct children of a container, in position order
    pub fn children(&self, path: &str) -> Vec<&ContentItem> {
        self.containers
            .get(path)
            .map(|c| c.children.iter().filter_map(|uid| self.items.get(uid)).collect())
            .unwrap_or_default()
    }

    /// Paths of a container and all containers below it
    pub fn subtree(&self, root: &str) -> Vec<String> {
        self.containers
            .keys()
            .filter(|path| in_subtree(path, root))
            .cloned()
            .collect()
    }

    /// Rebuild one container's index from its children
    pub fn rebuild_index(&mut self, path: &str, builder: &ItemBuilder) -> Option<RebuildReport> {
        let container = self.containers.get_mut(path)?;
        let items = container.children.iter().filter_map(|uid| self.items.get(uid));
        Some(container.index.rebuild(items, &self.categories, builder))
    }

    /// Refresh the index entry of one item in its parent container.
    ///
    /// An item whose category no longer resolves loses its entry.
    /// Returns whether the item is indexed afterwards.
    pub fn refresh_entry(&mut self, uid: &str, builder: &ItemBuilder) -> bool {
        let Some(item) = self.items.get(uid) else {
            return false;
        };
        let snapshot = builder.build_from_tree(item, &self.categories);
        let Some(container) = self.containers.get_mut(&item.parent) else {
            return false;
        };
        match snapshot {
            Some(snapshot) => {
                container.index.upsert(snapshot);
                true
            }
            None => {
                container.index.remove(uid);
                false
            }
        }
    }

    /// Drop an item's entry from a container's index
    pub fn remove_entry(&mut self, container: &str, uid: &str) {
        if let Some(container) = self.containers.get_mut(container) {
            container.index.remove(uid);
        }
    }

    fn next_position(&self, path: &str) -> u32 {
        self.children(path)
            .iter()
            .map(|item| item.position + 1)
            .max()
            .unwrap_or(0)
    }

    fn id_taken(&self, path: &str, id: &str) -> bool {
        self.children(path).iter().any(|item| item.id == id)
    }
}

/// Result of a mutating repository call
#[derive(Debug, Clone, Default)]
pub struct ChangeOutcome {
    /// Uids the call created or touched
    pub uids: Vec<String>,

    /// Notifications raised by observers
    pub notifications: Vec<Notification>,
}

impl ChangeOutcome {
    fn for_uid(uid: impl Into<String>) -> Self {
        Self {
            uids: vec![uid.into()],
            notifications: Vec::new(),
        }
    }

    /// First uid, for single-item operations
    pub fn uid(&self) -> Option<&str> {
        self.uids.first().map(String::as_str)
    }
}

/// Content repository dispatching lifecycle events to observers
pub struct Repository {
    content: ContentTree,
    observers: Vec<Box<dyn LifecycleObserver>>,
    guard: ReferentialGuard,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("content", &self.content)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Repository {
    pub fn new(content: ContentTree) -> Self {
        Self {
            content,
            observers: Vec::new(),
            guard: ReferentialGuard::new(),
        }
    }

    /// Register an observer; observers run in registration order
    pub fn with_observer(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn content(&self) -> &ContentTree {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut ContentTree {
        &mut self.content
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.content.categories
    }

    pub fn into_content(self) -> ContentTree {
        self.content
    }

    fn dispatch(&mut self, event: LifecycleEvent) -> Vec<Notification> {
        debug!(event = event.name(), "Dispatching lifecycle event");
        let mut notifications = Vec::new();
        for observer in &mut self.observers {
            notifications.extend(observer.notify(&event, &mut self.content));
        }
        notifications
    }

    /// Create a container below an existing one
    pub fn add_container(&mut self, path: &str) -> Result<()> {
        if self.content.containers.contains_key(path) {
            return Err(RepositoryError::ContainerExists(path.to_string()));
        }
        let parent = parent_path(path).ok_or_else(|| RepositoryError::ContainerExists(String::new()))?;
        if !self.content.containers.contains_key(parent) {
            return Err(RepositoryError::ContainerNotFound(parent.to_string()));
        }
        self.content
            .containers
            .insert(path.to_string(), Container::new(path));
        Ok(())
    }

    fn insert_item(&mut self, container: &str, mut item: ContentItem) -> Result<String> {
        if !self.content.containers.contains_key(container) {
            return Err(RepositoryError::ContainerNotFound(container.to_string()));
        }
        if self.content.id_taken(container, &item.id) {
            return Err(RepositoryError::DuplicateId {
                container: container.to_string(),
                id: item.id,
            });
        }

        item.parent = container.to_string();
        item.position = self.content.next_position(container);
        let uid = item.uid.clone();

        if let Some(c) = self.content.containers.get_mut(container) {
            c.children.push(uid.clone());
        }
        self.content.items.insert(uid.clone(), item);
        Ok(uid)
    }

    /// Add one item and index it immediately
    pub fn create_item(&mut self, container: &str, item: ContentItem) -> Result<ChangeOutcome> {
        let uid = self.insert_item(container, item)?;
        let mut outcome = ChangeOutcome::for_uid(&uid);
        outcome.notifications = self.dispatch(LifecycleEvent::Created {
            uid,
            mode: BatchMode::Immediate,
        });
        Ok(outcome)
    }

    /// Add several items to one container.
    ///
    /// Ids are checked before anything is inserted, so a clash leaves the
    /// container untouched. With [`BatchMode::Deferred`] the per-item index
    /// upserts are skipped and the container is rebuilt once at the end.
    pub fn create_items<I>(&mut self, container: &str, items: I, mode: BatchMode) -> Result<ChangeOutcome>
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let items: Vec<ContentItem> = items.into_iter().collect();
        if !self.content.containers.contains_key(container) {
            return Err(RepositoryError::ContainerNotFound(container.to_string()));
        }
        for (i, item) in items.iter().enumerate() {
            let repeated = items[..i].iter().any(|earlier| earlier.id == item.id);
            if repeated || self.content.id_taken(container, &item.id) {
                return Err(RepositoryError::DuplicateId {
                    container: container.to_string(),
                    id: item.id.clone(),
                });
            }
        }

        let mut outcome = ChangeOutcome::default();
        for item in items {
            let uid = self.insert_item(container, item)?;
            outcome.uids.push(uid.clone());
            let notifications = self.dispatch(LifecycleEvent::Created { uid, mode });
            outcome.notifications.extend(notifications);
        }

        if mode == BatchMode::Deferred {
            let notifications = self.dispatch(LifecycleEvent::BatchCompleted {
                container: container.to_string(),
            });
            outcome.notifications.extend(notifications);
        }

        info!(container = %container, count = outcome.uids.len(), ?mode, "Created items");
        Ok(outcome)
    }

    /// Modify an item in place. Identity and placement are preserved.
    pub fn update_item<F>(&mut self, uid: &str, mode: BatchMode, change: F) -> Result<ChangeOutcome>
    where
        F: FnOnce(&mut ContentItem),
    {
        let item = self
            .content
            .items
            .get_mut(uid)
            .ok_or_else(|| RepositoryError::ItemNotFound(uid.to_string()))?;

        let (id, parent, position) = (item.id.clone(), item.parent.clone(), item.position);
        change(item);
        item.uid = uid.to_string();
        item.id = id;
        item.parent = parent;
        item.position = position;
        item.touch();

        let mut outcome = ChangeOutcome::for_uid(uid);
        outcome.notifications = self.dispatch(LifecycleEvent::Updated {
            uid: uid.to_string(),
            mode,
        });
        Ok(outcome)
    }

    /// Delete an item
    pub fn remove_item(&mut self, uid: &str) -> Result<ChangeOutcome> {
        let item = self
            .content
            .items
            .remove(uid)
            .ok_or_else(|| RepositoryError::ItemNotFound(uid.to_string()))?;
        if let Some(container) = self.content.containers.get_mut(&item.parent) {
            container.children.retain(|child| child != uid);
        }

        let mut outcome = ChangeOutcome::for_uid(uid);
        outcome.notifications = self.dispatch(LifecycleEvent::Removed { item });
        Ok(outcome)
    }

    /// Move an item to another container, appending it there
    pub fn move_item(&mut self, uid: &str, target: &str) -> Result<ChangeOutcome> {
        if !self.content.containers.contains_key(target) {
            return Err(RepositoryError::ContainerNotFound(target.to_string()));
        }
        let item = self
            .content
            .items
            .get(uid)
            .ok_or_else(|| RepositoryError::ItemNotFound(uid.to_string()))?;
        let old_parent = item.parent.clone();
        if old_parent == target {
            return Ok(ChangeOutcome::for_uid(uid));
        }
        if self.content.id_taken(target, &item.id) {
            return Err(RepositoryError::DuplicateId {
                container: target.to_string(),
                id: item.id.clone(),
            });
        }

        let position = self.content.next_position(target);
        if let Some(container) = self.content.containers.get_mut(&old_parent) {
            container.children.retain(|child| child != uid);
        }
        if let Some(container) = self.content.containers.get_mut(target) {
            container.children.push(uid.to_string());
        }
        if let Some(item) = self.content.items.get_mut(uid) {
            item.parent = target.to_string();
            item.position = position;
        }

        let mut outcome = ChangeOutcome::for_uid(uid);
        outcome.notifications = self.dispatch(LifecycleEvent::Moved {
            uid: uid.to_string(),
            old_parent: Some(old_parent),
            new_parent: Some(target.to_string()),
        });
        Ok(outcome)
    }

    /// Duplicate a container subtree to a new path.
    ///
    /// Copied items get fresh uids; copied indexes are stale until the
    /// observers rebuild them.
    pub fn clone_container(&mut self, source: &str, target: &str) -> Result<ChangeOutcome> {
        if !self.content.containers.contains_key(source) {
            return Err(RepositoryError::ContainerNotFound(source.to_string()));
        }
        if source.is_empty() || in_subtree(target, source) {
            return Err(RepositoryError::ContainerExists(target.to_string()));
        }
        self.add_container(target)?;

        let mut outcome = ChangeOutcome::default();
        for path in self.content.subtree(source) {
            let new_path = format!("{}{}", target, &path[source.len()..]);
            let Some(original) = self.content.containers.get(&path).cloned() else {
                continue;
            };

            let mut copy = Container::new(new_path.clone());
            copy.index = original.index.clone();
            for uid in &original.children {
                let Some(item) = self.content.items.get(uid) else {
                    continue;
                };
                let mut item = item.clone();
                item.uid = Uuid::new_v4().simple().to_string();
                item.parent = new_path.clone();
                copy.children.push(item.uid.clone());
                outcome.uids.push(item.uid.clone());
                self.content.items.insert(item.uid.clone(), item);
            }

            match self.content.containers.get_mut(&new_path) {
                Some(existing) => {
                    existing.children = copy.children;
                    existing.index = copy.index;
                }
                None => {
                    self.content.containers.insert(new_path, copy);
                }
            }
        }

        outcome.notifications = self.dispatch(LifecycleEvent::ContainerCloned {
            root: target.to_string(),
        });
        Ok(outcome)
    }

    /// Whether any item references the node or one of its descendants
    pub fn has_relations(&self, node: &CategoryNode) -> bool {
        self.guard.has_relations(node, self.content.items())
    }

    /// Delete a category tree node unless it is still referenced
    pub fn delete_category(&mut self, node: &CategoryNode) -> Result<()> {
        if !self.content.categories.contains(node) {
            return Err(RepositoryError::CategoryNotFound(node.key()));
        }
        self.guard
            .check_remove(node, RemovalScope::Node, self.content.items())?;
        self.content.categories.detach(node);
        self.dispatch(LifecycleEvent::CategoriesChanged);
        info!(node = %node, "Deleted category node");
        Ok(())
    }

    /// Move a category under another group, or a subcategory under another
    /// category, unless it is still referenced. Returns the new node path.
    pub fn move_category(&mut self, node: &CategoryNode, new_parent: &CategoryNode) -> Result<CategoryNode> {
        if !self.content.categories.contains(node) {
            return Err(RepositoryError::CategoryNotFound(node.key()));
        }
        if !self.content.categories.contains(new_parent) {
            return Err(RepositoryError::CategoryNotFound(new_parent.key()));
        }

        let invalid = || RepositoryError::InvalidMove {
            node: node.key(),
            parent: new_parent.key(),
        };
        let moved = match (node, new_parent) {
            (CategoryNode::Category(_, c), CategoryNode::Group(g)) => {
                CategoryNode::Category(g.clone(), c.clone())
            }
            (CategoryNode::Subcategory(_, _, s), CategoryNode::Category(g, c)) => {
                CategoryNode::Subcategory(g.clone(), c.clone(), s.clone())
            }
            _ => return Err(invalid()),
        };

        let old_parent = parent_of(node);
        if old_parent.as_ref() == Some(new_parent) {
            return Ok(node.clone());
        }
        if self.content.categories.contains(&moved) {
            return Err(invalid());
        }

        self.guard.check_move(
            node,
            old_parent.as_ref(),
            Some(new_parent),
            self.content.items(),
        )?;

        let detached = self
            .content
            .categories
            .detach(node)
            .ok_or_else(|| RepositoryError::CategoryNotFound(node.key()))?;
        if let Err(detached) = self.content.categories.attach(new_parent, detached) {
            self.restore(old_parent.as_ref(), detached);
            return Err(invalid());
        }
        self.dispatch(LifecycleEvent::CategoriesChanged);

        info!(from = %node, to = %moved, "Moved category node");
        Ok(moved)
    }

    fn restore(&mut self, parent: Option<&CategoryNode>, detached: Detached) {
        match (parent, detached) {
            (Some(parent), detached) => {
                if let Err(lost) = self.content.categories.attach(parent, detached) {
                    warn!(parent = %parent, node = ?lost, "Could not restore category node");
                }
            }
            (None, Detached::Group(group)) => self.content.categories.groups.push(group),
            (None, lost) => warn!(node = ?lost, "Category node has no parent to restore under"),
        }
    }

    /// Tear the whole repository down, categories included.
    ///
    /// Relation checks are bypassed since nothing survives.
    pub fn teardown(&mut self) -> Result<()> {
        let groups: Vec<CategoryNode> = self
            .content
            .categories
            .groups
            .iter()
            .map(|g| CategoryNode::Group(g.id.clone()))
            .collect();
        for node in &groups {
            self.guard
                .check_remove(node, RemovalScope::RepositoryTeardown, self.content.items())?;
            self.content.categories.detach(node);
        }

        self.content.items.clear();
        self.content.containers.clear();
        self.content
            .containers
            .insert(String::new(), Container::new(""));
        info!(groups = groups.len(), "Repository torn down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryConfig, CategoryGroup};

    fn tree() -> CategoryTree {
        CategoryTree::new()
            .with_group(
                CategoryGroup::new("group-1", "Group 1")
                    .with_category(CategoryConfig::new("category-1-1", "Category 1-1"))
                    .with_category(
                        CategoryConfig::new("category-x", "Category X")
                            .with_subcategory(CategoryConfig::new("subcategory-x", "Subcategory X")),
                    ),
            )
            .with_group(CategoryGroup::new("group-2", "Group 2"))
    }

    #[test]
    fn test_restore_without_a_home_leaves_tree_unchanged() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        let before = repo.categories().groups.len();

        let orphan = Detached::Category(CategoryConfig::new("orphan", "Orphan"));
        repo.restore(Some(&CategoryNode::Group("missing".into())), orphan.clone());
        repo.restore(None, orphan);
        assert!(!repo
            .categories()
            .contains(&CategoryNode::Category("group-1".into(), "orphan".into())));
        assert_eq!(repo.categories().groups.len(), before);

        repo.restore(None, Detached::Group(CategoryGroup::new("group-3", "Group 3")));
        assert!(repo.categories().group("group-3").is_some());
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path(""), None);
        assert_eq!(parent_path("a"), Some(""));
        assert_eq!(parent_path("a/b"), Some("a"));
    }

    #[test]
    fn test_add_container_requires_parent() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        assert!(matches!(
            repo.add_container("a/b"),
            Err(RepositoryError::ContainerNotFound(_))
        ));
        repo.add_container("a").unwrap();
        repo.add_container("a/b").unwrap();
        assert!(matches!(
            repo.add_container("a"),
            Err(RepositoryError::ContainerExists(_))
        ));
        assert_eq!(repo.content().subtree("a"), vec!["a".to_string(), "a/b".to_string()]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        repo.create_item("", ContentItem::new("doc", "Doc", "Document"))
            .unwrap();
        let err = repo
            .create_item("", ContentItem::new("doc", "Doc 2", "Document"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateId { .. }));
    }

    #[test]
    fn test_positions_follow_insertion() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        repo.create_item("", ContentItem::new("a", "A", "Document")).unwrap();
        repo.create_item("", ContentItem::new("b", "B", "Document")).unwrap();

        let positions: Vec<u32> = repo.content().children("").iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_delete_category_guarded() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        let outcome = repo
            .create_item(
                "",
                ContentItem::new("doc", "Doc", "Document")
                    .with_category("group-1_-_category-x_-_subcategory-x"),
            )
            .unwrap();
        let uid = outcome.uid().unwrap().to_string();

        let node = CategoryNode::Category("group-1".into(), "category-x".into());
        let err = repo.delete_category(&node).unwrap_err();
        assert!(matches!(err, RepositoryError::InUse(_)));
        assert!(repo.categories().contains(&node));

        repo.remove_item(&uid).unwrap();
        repo.delete_category(&node).unwrap();
        assert!(!repo.categories().contains(&node));
    }

    #[test]
    fn test_move_category_guarded() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        let outcome = repo
            .create_item(
                "",
                ContentItem::new("doc", "Doc", "Document").with_category("group-1_-_category-x"),
            )
            .unwrap();
        let uid = outcome.uid().unwrap().to_string();

        let node = CategoryNode::Category("group-1".into(), "category-x".into());
        let group2 = CategoryNode::Group("group-2".into());
        assert!(matches!(
            repo.move_category(&node, &group2),
            Err(RepositoryError::InUse(_))
        ));

        repo.remove_item(&uid).unwrap();
        let moved = repo.move_category(&node, &group2).unwrap();
        assert_eq!(moved.key(), "group-2_-_category-x");
        assert!(repo.categories().resolve_key("group-2_-_category-x_-_subcategory-x").is_some());
    }

    #[test]
    fn test_move_category_rejects_wrong_parent_kind() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        let node = CategoryNode::Category("group-1".into(), "category-1-1".into());
        let parent = CategoryNode::Category("group-1".into(), "category-x".into());
        assert!(matches!(
            repo.move_category(&node, &parent),
            Err(RepositoryError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_teardown_ignores_relations() {
        let mut repo = Repository::new(ContentTree::new(tree()));
        repo.create_item(
            "",
            ContentItem::new("doc", "Doc", "Document").with_category("group-1_-_category-x"),
        )
        .unwrap();

        repo.teardown().unwrap();
        assert!(repo.categories().groups.is_empty());
        assert_eq!(repo.content().items().count(), 0);
        assert!(repo.content().container("").is_some());
    }
}
