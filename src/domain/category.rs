//! Category configuration: groups, categories and subcategories.
//!
//! Content items point at a category with a path-structured key
//! (`group_-_category[_-_subcategory]`). The [`CategoryTree`] is the
//! configuration root those keys are resolved against.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Separator between segments of a category key
pub const KEY_SEPARATOR: &str = "_-_";

/// Errors raised when parsing a category key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryKeyError {
    #[error("Empty category key")]
    Empty,

    #[error("Category key '{0}' must have 2 or 3 segments")]
    SegmentCount(String),

    #[error("Category key '{0}' has an empty segment")]
    EmptySegment(String),
}

/// Reference to a category (and optionally one of its subcategories)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryRef {
    pub group: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

impl CategoryRef {
    pub fn new(group: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            category: category.into(),
            subcategory: None,
        }
    }

    /// Point at a subcategory of this category
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Parse a composite key
    pub fn parse(key: &str) -> Result<Self, CategoryKeyError> {
        if key.trim().is_empty() {
            return Err(CategoryKeyError::Empty);
        }

        let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CategoryKeyError::EmptySegment(key.to_string()));
        }

        match parts.as_slice() {
            [group, category] => Ok(Self::new(*group, *category)),
            [group, category, subcategory] => {
                Ok(Self::new(*group, *category).with_subcategory(*subcategory))
            }
            _ => Err(CategoryKeyError::SegmentCount(key.to_string())),
        }
    }

    /// Composite key of this reference
    pub fn key(&self) -> String {
        match &self.subcategory {
            Some(sub) => [self.group.as_str(), &self.category, sub].join(KEY_SEPARATOR),
            None => [self.group.as_str(), &self.category].join(KEY_SEPARATOR),
        }
    }

    /// The reference without its subcategory part
    pub fn category_only(&self) -> Self {
        Self::new(self.group.clone(), self.category.clone())
    }
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for CategoryRef {
    type Err = CategoryKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A node of the category tree, addressed by path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryNode {
    Group(String),
    Category(String, String),
    Subcategory(String, String, String),
}

impl CategoryNode {
    /// Parse a node path: `group`, `group_-_category` or a full subcategory key
    pub fn parse(key: &str) -> Result<Self, CategoryKeyError> {
        if key.trim().is_empty() {
            return Err(CategoryKeyError::Empty);
        }
        if !key.contains(KEY_SEPARATOR) {
            return Ok(Self::Group(key.to_string()));
        }
        Ok(CategoryRef::parse(key)?.into())
    }

    /// Whether a reference points at this node or at something below it
    pub fn covers(&self, reference: &CategoryRef) -> bool {
        match self {
            Self::Group(group) => reference.group == *group,
            Self::Category(group, category) => {
                reference.group == *group && reference.category == *category
            }
            Self::Subcategory(group, category, sub) => {
                reference.group == *group
                    && reference.category == *category
                    && reference.subcategory.as_deref() == Some(sub.as_str())
            }
        }
    }

    /// Path key of this node
    pub fn key(&self) -> String {
        match self {
            Self::Group(group) => group.clone(),
            Self::Category(group, category) => CategoryRef::new(group, category).key(),
            Self::Subcategory(group, category, sub) => {
                CategoryRef::new(group, category).with_subcategory(sub).key()
            }
        }
    }

    pub fn is_subcategory(&self) -> bool {
        matches!(self, Self::Subcategory(..))
    }
}

impl From<CategoryRef> for CategoryNode {
    fn from(r: CategoryRef) -> Self {
        match r.subcategory {
            Some(sub) => Self::Subcategory(r.group, r.category, sub),
            None => Self::Category(r.group, r.category),
        }
    }
}

impl std::fmt::Display for CategoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A category or subcategory definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Stable unique identifier
    pub uid: String,

    /// Path segment used in category keys
    pub id: String,

    pub title: String,

    /// Icon file name
    #[serde(default)]
    pub icon: Option<String>,

    /// Default print flag for items with no print value
    #[serde(default)]
    pub to_print: bool,

    /// Default confidentiality for items that declare none
    #[serde(default)]
    pub confidential: bool,

    /// Subcategories (only one level deep)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<CategoryConfig>,
}

impl CategoryConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4().simple().to_string(),
            id: id.into(),
            title: title.into(),
            icon: None,
            to_print: false,
            confidential: false,
            subcategories: Vec::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_to_print(mut self, to_print: bool) -> Self {
        self.to_print = to_print;
        self
    }

    pub fn with_confidential(mut self, confidential: bool) -> Self {
        self.confidential = confidential;
        self
    }

    /// Add a subcategory (subcategories of it are dropped)
    pub fn with_subcategory(mut self, mut subcategory: CategoryConfig) -> Self {
        subcategory.subcategories.clear();
        self.subcategories.push(subcategory);
        self
    }

    pub fn subcategory(&self, id: &str) -> Option<&CategoryConfig> {
        self.subcategories.iter().find(|s| s.id == id)
    }
}

/// A group of categories with its feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub id: String,
    pub title: String,

    /// Whether print management applies to this group's categories
    #[serde(default)]
    pub to_be_printed_activated: bool,

    /// Whether confidentiality applies to this group's categories
    #[serde(default)]
    pub confidentiality_activated: bool,

    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

impl CategoryGroup {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            to_be_printed_activated: false,
            confidentiality_activated: false,
            categories: Vec::new(),
        }
    }

    pub fn with_print_management(mut self, active: bool) -> Self {
        self.to_be_printed_activated = active;
        self
    }

    pub fn with_confidentiality(mut self, active: bool) -> Self {
        self.confidentiality_activated = active;
        self
    }

    pub fn with_category(mut self, category: CategoryConfig) -> Self {
        self.categories.push(category);
        self
    }

    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// Position of a category in the tree: (group, category, subcategory).
///
/// A plain category sorts before its subcategories.
pub type TreePosition = (u32, u32, u32);

/// A category reference resolved against the tree
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCategory<'a> {
    pub group: &'a CategoryGroup,
    pub category: &'a CategoryConfig,
    pub subcategory: Option<&'a CategoryConfig>,
    pub position: TreePosition,
}

impl<'a> ResolvedCategory<'a> {
    /// The most specific node: the subcategory if any, else the category
    pub fn target(&self) -> &'a CategoryConfig {
        self.subcategory.unwrap_or(self.category)
    }
}

fn index_u32(idx: usize) -> u32 {
    u32::try_from(idx).unwrap_or(u32::MAX)
}

/// Configuration root holding every category group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTree {
    /// Id of the configuration root, first segment of icon URLs
    #[serde(default = "default_root_id")]
    pub id: String,

    #[serde(default)]
    pub groups: Vec<CategoryGroup>,
}

fn default_root_id() -> String {
    "config".to_string()
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    pub fn new() -> Self {
        Self {
            id: default_root_id(),
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: CategoryGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn group(&self, id: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Resolve a reference; `None` when any segment is missing
    pub fn resolve(&self, reference: &CategoryRef) -> Option<ResolvedCategory<'_>> {
        let (gi, group) = self
            .groups
            .iter()
            .enumerate()
            .find(|(_, g)| g.id == reference.group)?;
        let (ci, category) = group
            .categories
            .iter()
            .enumerate()
            .find(|(_, c)| c.id == reference.category)?;

        let (subcategory, si) = match &reference.subcategory {
            Some(sub_id) => {
                let (si, sub) = category
                    .subcategories
                    .iter()
                    .enumerate()
                    .find(|(_, s)| s.id == *sub_id)?;
                (Some(sub), index_u32(si) + 1)
            }
            None => (None, 0),
        };

        Some(ResolvedCategory {
            group,
            category,
            subcategory,
            position: (index_u32(gi), index_u32(ci), si),
        })
    }

    /// Resolve a raw key; malformed keys do not resolve
    pub fn resolve_key(&self, key: &str) -> Option<ResolvedCategory<'_>> {
        CategoryRef::parse(key).ok().and_then(|r| self.resolve(&r))
    }

    /// Whether a node exists in the tree
    pub fn contains(&self, node: &CategoryNode) -> bool {
        match node {
            CategoryNode::Group(g) => self.group(g).is_some(),
            CategoryNode::Category(g, c) => self.resolve(&CategoryRef::new(g, c)).is_some(),
            CategoryNode::Subcategory(g, c, s) => self
                .resolve(&CategoryRef::new(g, c).with_subcategory(s))
                .is_some(),
        }
    }

    /// Relative URL of a category's icon
    pub fn icon_url(&self, resolved: &ResolvedCategory<'_>) -> Option<String> {
        let icon = resolved.target().icon.as_deref()?;
        let mut segments = vec![
            self.id.as_str(),
            resolved.group.id.as_str(),
            resolved.category.id.as_str(),
        ];
        if let Some(sub) = resolved.subcategory {
            segments.push(sub.id.as_str());
        }
        Some(format!("{}/@@download/icon/{}", segments.join("/"), icon))
    }

    /// Detach a node from the tree, `None` if it does not exist
    pub(crate) fn detach(&mut self, node: &CategoryNode) -> Option<Detached> {
        match node {
            CategoryNode::Group(g) => {
                let pos = self.groups.iter().position(|x| x.id == *g)?;
                Some(Detached::Group(self.groups.remove(pos)))
            }
            CategoryNode::Category(g, c) => {
                let group = self.groups.iter_mut().find(|x| x.id == *g)?;
                let pos = group.categories.iter().position(|x| x.id == *c)?;
                Some(Detached::Category(group.categories.remove(pos)))
            }
            CategoryNode::Subcategory(g, c, s) => {
                let group = self.groups.iter_mut().find(|x| x.id == *g)?;
                let category = group.categories.iter_mut().find(|x| x.id == *c)?;
                let pos = category.subcategories.iter().position(|x| x.id == *s)?;
                Some(Detached::Category(category.subcategories.remove(pos)))
            }
        }
    }

    /// Attach a detached category under a parent node.
    ///
    /// Categories attach to groups, subcategories to categories.
    pub(crate) fn attach(&mut self, parent: &CategoryNode, detached: Detached) -> Result<(), Detached> {
        let category = match detached {
            Detached::Category(category) => category,
            group @ Detached::Group(_) => return Err(group),
        };

        match parent {
            CategoryNode::Group(g) => match self.groups.iter_mut().find(|x| x.id == *g) {
                Some(group) if group.category(&category.id).is_none() => {
                    group.categories.push(category);
                    Ok(())
                }
                _ => Err(Detached::Category(category)),
            },
            CategoryNode::Category(g, c) => {
                let target = self
                    .groups
                    .iter_mut()
                    .find(|x| x.id == *g)
                    .and_then(|group| group.categories.iter_mut().find(|x| x.id == *c));
                match target {
                    Some(parent)
                        if category.subcategories.is_empty()
                            && parent.subcategory(&category.id).is_none() =>
                    {
                        parent.subcategories.push(category);
                        Ok(())
                    }
                    _ => Err(Detached::Category(category)),
                }
            }
            CategoryNode::Subcategory(..) => Err(Detached::Category(category)),
        }
    }
}

/// A node removed from the tree
#[derive(Debug, Clone)]
pub(crate) enum Detached {
    Group(CategoryGroup),
    Category(CategoryConfig),
}

/// Parent node of a node in the tree (groups have none)
pub fn parent_of(node: &CategoryNode) -> Option<CategoryNode> {
    match node {
        CategoryNode::Group(_) => None,
        CategoryNode::Category(g, _) => Some(CategoryNode::Group(g.clone())),
        CategoryNode::Subcategory(g, c, _) => Some(CategoryNode::Category(g.clone(), c.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> CategoryTree {
        CategoryTree::new().with_group(
            CategoryGroup::new("group-1", "Group 1")
                .with_category(CategoryConfig::new("category-1-1", "Category 1-1").with_icon("icon1.png"))
                .with_category(
                    CategoryConfig::new("category-1-2", "Category 1-2")
                        .with_icon("icon2.png")
                        .with_subcategory(
                            CategoryConfig::new("subcategory-1-2-1", "Subcategory 1-2-1")
                                .with_icon("sub.png"),
                        ),
                ),
        )
    }

    #[test]
    fn test_parse_category_key() {
        let r = CategoryRef::parse("group-1_-_category-1-1").unwrap();
        assert_eq!(r, CategoryRef::new("group-1", "category-1-1"));

        let r = CategoryRef::parse("group-1_-_category-1-2_-_subcategory-1-2-1").unwrap();
        assert_eq!(r.subcategory.as_deref(), Some("subcategory-1-2-1"));
        assert_eq!(r.key(), "group-1_-_category-1-2_-_subcategory-1-2-1");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        assert_eq!(CategoryRef::parse(""), Err(CategoryKeyError::Empty));
        assert!(matches!(
            CategoryRef::parse("some_wrong_category_id"),
            Err(CategoryKeyError::SegmentCount(_))
        ));
        assert!(matches!(
            CategoryRef::parse("a_-_b_-_c_-_d"),
            Err(CategoryKeyError::SegmentCount(_))
        ));
        assert!(matches!(
            CategoryRef::parse("a_-__-_c"),
            Err(CategoryKeyError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_resolve_positions() {
        let tree = tree();
        let cat = tree.resolve_key("group-1_-_category-1-2").unwrap();
        assert_eq!(cat.position, (0, 1, 0));
        assert!(cat.subcategory.is_none());

        let sub = tree
            .resolve_key("group-1_-_category-1-2_-_subcategory-1-2-1")
            .unwrap();
        assert_eq!(sub.position, (0, 1, 1));
        assert_eq!(sub.target().id, "subcategory-1-2-1");

        assert!(tree.resolve_key("group-1_-_missing").is_none());
        assert!(tree.resolve_key("group-2_-_category-1-1").is_none());
    }

    #[test]
    fn test_icon_url() {
        let tree = tree();
        let cat = tree.resolve_key("group-1_-_category-1-1").unwrap();
        assert_eq!(
            tree.icon_url(&cat).as_deref(),
            Some("config/group-1/category-1-1/@@download/icon/icon1.png")
        );

        let sub = tree
            .resolve_key("group-1_-_category-1-2_-_subcategory-1-2-1")
            .unwrap();
        assert_eq!(
            tree.icon_url(&sub).as_deref(),
            Some("config/group-1/category-1-2/subcategory-1-2-1/@@download/icon/sub.png")
        );
    }

    #[test]
    fn test_node_covers_descendants() {
        let sub = CategoryRef::parse("group-1_-_category-1-2_-_subcategory-1-2-1").unwrap();

        assert!(CategoryNode::Group("group-1".into()).covers(&sub));
        assert!(CategoryNode::Category("group-1".into(), "category-1-2".into()).covers(&sub));
        assert!(!CategoryNode::Category("group-1".into(), "category-1-1".into()).covers(&sub));

        let plain = sub.category_only();
        let sub_node = CategoryNode::from(sub.clone());
        assert!(sub_node.covers(&sub));
        assert!(!sub_node.covers(&plain));
    }

    #[test]
    fn test_detach_and_attach_category() {
        let mut tree = tree().with_group(CategoryGroup::new("group-2", "Group 2"));
        let node = CategoryNode::Category("group-1".into(), "category-1-1".into());

        let detached = tree.detach(&node).unwrap();
        assert!(!tree.contains(&node));

        tree.attach(&CategoryNode::Group("group-2".into()), detached)
            .unwrap();
        assert!(tree.resolve_key("group-2_-_category-1-1").is_some());
    }
}
