//! Core indexing logic.
//!
//! This module contains:
//! - Builder: per-item snapshot computation
//! - Preview: conversion status of file items
//! - Index: per-container ordered index
//! - Coordinator: index maintenance on lifecycle events
//! - Guard: referential integrity of the category tree
//! - Query: filtered, sorted listings

pub mod builder;
pub mod coordinator;
pub mod format;
pub mod guard;
pub mod index;
pub mod preview;
pub mod query;

// Re-export commonly used types
pub use builder::ItemBuilder;
pub use coordinator::LifecycleCoordinator;
pub use format::{calculate_filesize, warn_filesize, DEFAULT_FILESIZE_LIMIT};
pub use guard::{GuardError, GuardedOperation, ReferentialGuard, RemovalScope};
pub use index::{CategorizedIndex, RebuildReport};
pub use preview::{ConversionRecord, ConversionRecords, ConversionService, PreviewStatusResolver};
pub use query::{query, ItemRef, Query, QueryResult, ResultType};
