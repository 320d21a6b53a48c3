//! Content repository and its on-disk snapshot.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.iconified/
//! ├── site.json      # Category tree, containers, items, indexes, conversion records
//! └── site.lock      # Held exclusively while site.json is replaced
//! ```

pub mod repository;
pub mod store;

pub use repository::{
    ChangeOutcome, Container, ContentTree, LifecycleObserver, Repository, RepositoryError,
};
pub use store::{SiteSnapshot, SiteStore};
