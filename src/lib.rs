//! iconified - Categorized content index
//!
//! Keeps, for every container of a content repository, an ordered
//! index of the categorized items it holds, so listings never have to
//! load the items themselves.
//!
//! # Architecture
//!
//! The system is built around synchronous lifecycle observers:
//! - Every item points at a category through a path-structured key
//! - The repository notifies observers of each create, update, move and removal
//! - The coordinator keeps container indexes in step and raises notifications
//! - A guard refuses category deletions and moves that would orphan items
//!
//! # Modules
//!
//! - `core`: Index logic (ItemBuilder, CategorizedIndex, LifecycleCoordinator, ReferentialGuard, query)
//! - `domain`: Data structures (CategoryTree, ContentItem, CategorizedItem, LifecycleEvent)
//! - `library`: Content repository and on-disk site snapshot
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Rebuild every index of the site
//! iconified rebuild
//!
//! # List a folder's annexes sorted by title
//! iconified list --container folder --portal-type annex --sort-on title
//!
//! # Delete a category nothing points at
//! iconified delete-category group-1_-_category-x
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;

// Re-export main types at crate root for convenience
pub use core::{CategorizedIndex, ItemBuilder, LifecycleCoordinator, ReferentialGuard};
pub use domain::{CategorizedItem, CategoryNode, CategoryTree, ContentItem, LifecycleEvent, Notification};
pub use library::{ContentTree, Repository, RepositoryError, SiteStore};
