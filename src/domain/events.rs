//! Content lifecycle events and the notifications they produce.
//!
//! The repository delivers [`LifecycleEvent`]s synchronously to its
//! observers; observers answer with [`Notification`]s for the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::ContentItem;

/// Whether index maintenance runs now or is left to a follow-up rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Upsert into the container index as part of the event
    Immediate,

    /// Skip the upsert; the caller rebuilds once the batch is done
    Deferred,
}

impl Default for BatchMode {
    fn default() -> Self {
        Self::Immediate
    }
}

/// A lifecycle transition of a content item or container
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// An item was added to a container
    Created { uid: String, mode: BatchMode },

    /// An item was modified in place
    Updated { uid: String, mode: BatchMode },

    /// An item was deleted; carries the item as it was
    Removed { item: ContentItem },

    /// An item changed container. `None` marks the repository-root boundary.
    Moved {
        uid: String,
        old_parent: Option<String>,
        new_parent: Option<String>,
    },

    /// A deferred batch of changes to a container has finished
    BatchCompleted { container: String },

    /// A whole container subtree was duplicated under `root`
    ContainerCloned { root: String },

    /// A category node was deleted or moved; tree positions may have shifted
    CategoriesChanged,
}

impl LifecycleEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Created { .. } => "created",
            LifecycleEvent::Updated { .. } => "updated",
            LifecycleEvent::Removed { .. } => "removed",
            LifecycleEvent::Moved { .. } => "moved",
            LifecycleEvent::BatchCompleted { .. } => "batch_completed",
            LifecycleEvent::ContainerCloned { .. } => "container_cloned",
            LifecycleEvent::CategoriesChanged => "categories_changed",
        }
    }
}

/// What a notification is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// The item's confidentiality was set or changed
    ConfidentialChanged { old: Option<bool>, new: bool },

    /// The item's print flag was re-seeded or deactivated
    PrintChanged { old: Option<bool>, new: Option<bool> },

    /// A newly added file exceeds the configured size threshold
    FilesizeWarning { size: u64, limit: u64 },
}

/// A domain notification raised while handling a lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,

    /// Item the notification is about
    pub uid: String,

    pub kind: NotificationKind,

    /// User-facing message, if any
    pub message: Option<String>,
}

/// Message shown when a large annex is added
pub const FILESIZE_WARNING_MESSAGE: &str = "The annex that you just added has a large size \
     and could be difficult to download by users wanting to view it!";

impl Notification {
    pub fn new(uid: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            uid: uid.into(),
            kind,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn confidential_changed(uid: impl Into<String>, old: Option<bool>, new: bool) -> Self {
        Self::new(uid, NotificationKind::ConfidentialChanged { old, new })
    }

    pub fn print_changed(uid: impl Into<String>, old: Option<bool>, new: Option<bool>) -> Self {
        Self::new(uid, NotificationKind::PrintChanged { old, new })
    }

    pub fn filesize_warning(uid: impl Into<String>, size: u64, limit: u64) -> Self {
        Self::new(uid, NotificationKind::FilesizeWarning { size, limit })
            .with_message(FILESIZE_WARNING_MESSAGE)
    }
}
