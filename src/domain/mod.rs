//! Domain types for the categorized index.
//!
//! This module contains the core data structures:
//! - Category: groups, categories, subcategories and their keys
//! - Item: live content items
//! - Snapshot: cached per-item metadata stored in indexes
//! - Events: lifecycle events and notifications

pub mod category;
pub mod events;
pub mod item;
pub mod snapshot;

// Re-export commonly used types
pub use category::{
    CategoryConfig, CategoryGroup, CategoryKeyError, CategoryNode, CategoryRef, CategoryTree,
    ResolvedCategory, TreePosition,
};
pub use events::{BatchMode, LifecycleEvent, Notification, NotificationKind};
pub use item::{ContentItem, ContentKind, FilePayload};
pub use snapshot::{CategorizedItem, CategorizedView, EntryOrder, PreviewStatus};
