//! Referential integrity checks for the category tree.
//!
//! A group, category or subcategory may not be deleted or moved while
//! any content item still points at it or at one of its descendants.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{CategoryNode, ContentItem};

/// Destructive operation being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardedOperation {
    Delete,
    Move,
}

impl std::fmt::Display for GuardedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardedOperation::Delete => write!(f, "deleted"),
            GuardedOperation::Move => write!(f, "moved"),
        }
    }
}

/// What is being removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalScope {
    /// A single node of the category tree
    Node,

    /// The whole repository is being torn down; relations are moot
    RepositoryTeardown,
}

/// Integrity violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("{}", in_use_message(.node, .operation))]
    CategoryInUse {
        node: CategoryNode,
        operation: GuardedOperation,
    },
}

fn in_use_message(node: &CategoryNode, operation: &GuardedOperation) -> String {
    if node.is_subcategory() {
        format!(
            "This subcategory is used by another object and cannot be {}",
            operation
        )
    } else {
        format!(
            "This category or one of its subcategories is used by another object and cannot be {}",
            operation
        )
    }
}

impl GuardError {
    /// Message to show to the user who attempted the operation
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn node(&self) -> &CategoryNode {
        match self {
            GuardError::CategoryInUse { node, .. } => node,
        }
    }
}

/// Decides whether category nodes are still referenced
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferentialGuard;

impl ReferentialGuard {
    pub fn new() -> Self {
        Self
    }

    /// Whether any item references the node or one of its descendants
    pub fn has_relations<'a, I>(&self, node: &CategoryNode, items: I) -> bool
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        items
            .into_iter()
            .filter_map(ContentItem::category_ref)
            .any(|reference| node.covers(&reference))
    }

    /// Check a removal, bypassed when the whole repository goes away
    pub fn check_remove<'a, I>(&self, node: &CategoryNode, scope: RemovalScope, items: I) -> Result<(), GuardError>
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        if scope == RemovalScope::RepositoryTeardown {
            debug!(node = %node, "Repository teardown, skipping relation check");
            return Ok(());
        }
        self.check(node, GuardedOperation::Delete, items)
    }

    /// Check a move. A missing parent on either side marks a transition
    /// across the repository root and is not checked.
    pub fn check_move<'a, I>(
        &self,
        node: &CategoryNode,
        old_parent: Option<&CategoryNode>,
        new_parent: Option<&CategoryNode>,
        items: I,
    ) -> Result<(), GuardError>
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        if old_parent.is_none() || new_parent.is_none() {
            return Ok(());
        }
        self.check(node, GuardedOperation::Move, items)
    }

    fn check<'a, I>(&self, node: &CategoryNode, operation: GuardedOperation, items: I) -> Result<(), GuardError>
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        if self.has_relations(node, items) {
            return Err(GuardError::CategoryInUse {
                node: node.clone(),
                operation,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<ContentItem> {
        vec![
            ContentItem::new("a", "A", "Document").with_category("group-1_-_category-x_-_subcategory-x"),
            ContentItem::new("b", "B", "Document").with_category("some_wrong_category_id"),
            ContentItem::new("c", "C", "Document"),
        ]
    }

    #[test]
    fn test_has_relations_through_descendants() {
        let guard = ReferentialGuard::new();
        let items = items();

        assert!(guard.has_relations(&CategoryNode::Group("group-1".into()), &items));
        assert!(guard.has_relations(
            &CategoryNode::Category("group-1".into(), "category-x".into()),
            &items
        ));
        assert!(guard.has_relations(
            &CategoryNode::Subcategory("group-1".into(), "category-x".into(), "subcategory-x".into()),
            &items
        ));
        assert!(!guard.has_relations(
            &CategoryNode::Category("group-1".into(), "category-y".into()),
            &items
        ));
    }

    #[test]
    fn test_remove_rejected_unless_teardown() {
        let guard = ReferentialGuard::new();
        let items = items();
        let node = CategoryNode::Category("group-1".into(), "category-x".into());

        let err = guard
            .check_remove(&node, RemovalScope::Node, &items)
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "This category or one of its subcategories is used by another object and cannot be deleted"
        );

        assert!(guard
            .check_remove(&node, RemovalScope::RepositoryTeardown, &items)
            .is_ok());
    }

    #[test]
    fn test_subcategory_message() {
        let guard = ReferentialGuard::new();
        let items = items();
        let node = CategoryNode::Subcategory("group-1".into(), "category-x".into(), "subcategory-x".into());
        let parent = CategoryNode::Category("group-1".into(), "category-x".into());
        let target = CategoryNode::Category("group-1".into(), "category-1-1".into());

        let err = guard
            .check_move(&node, Some(&parent), Some(&target), &items)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "This subcategory is used by another object and cannot be moved"
        );
    }

    #[test]
    fn test_move_across_root_boundary_is_not_checked() {
        let guard = ReferentialGuard::new();
        let items = items();
        let node = CategoryNode::Category("group-1".into(), "category-x".into());
        let group = CategoryNode::Group("group-1".into());

        assert!(guard.check_move(&node, None, Some(&group), &items).is_ok());
        assert!(guard.check_move(&node, Some(&group), None, &items).is_ok());
    }
}
