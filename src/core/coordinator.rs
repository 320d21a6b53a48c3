//! Keeps container indexes in step with content lifecycle events.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::IndexSettings;
use crate::domain::{BatchMode, ContentItem, LifecycleEvent, Notification};
use crate::library::repository::{ContentTree, LifecycleObserver};

use super::builder::ItemBuilder;
use super::format::print_message;
use super::index::RebuildReport;
use super::preview::{ConversionService, PreviewStatusResolver};

/// Observer maintaining every container's [`CategorizedIndex`](super::index::CategorizedIndex)
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    builder: ItemBuilder,
}

impl LifecycleCoordinator {
    pub fn new(builder: ItemBuilder) -> Self {
        Self { builder }
    }

    /// Coordinator configured from resolved settings
    pub fn from_settings(settings: &IndexSettings, service: Arc<dyn ConversionService>) -> Self {
        let preview = PreviewStatusResolver::new(&settings.convertible_types, service);
        Self::new(ItemBuilder::new(preview).with_filesize_limit(settings.filesize_limit))
    }

    pub fn builder(&self) -> &ItemBuilder {
        &self.builder
    }

    /// Apply one event to the content tree
    #[instrument(skip_all, fields(event = event.name()))]
    pub fn handle(&self, event: &LifecycleEvent, content: &mut ContentTree) -> Vec<Notification> {
        match event {
            LifecycleEvent::Created { uid, mode } => self.on_created(uid, *mode, content),
            LifecycleEvent::Updated { uid, mode } => self.on_updated(uid, *mode, content),
            LifecycleEvent::Removed { item } => {
                content.remove_entry(&item.parent, &item.uid);
                debug!(uid = %item.uid, container = %item.parent, "Removed index entry");
                Vec::new()
            }
            LifecycleEvent::Moved {
                uid,
                old_parent,
                new_parent,
            } => {
                if let Some(old) = old_parent {
                    content.remove_entry(old, uid);
                }
                if new_parent.is_some() {
                    content.refresh_entry(uid, &self.builder);
                }
                Vec::new()
            }
            LifecycleEvent::BatchCompleted { container } => {
                self.rebuild(content, container);
                Vec::new()
            }
            LifecycleEvent::ContainerCloned { root } => {
                self.rebuild_subtree(content, root);
                Vec::new()
            }
            LifecycleEvent::CategoriesChanged => {
                self.rebuild_subtree(content, "");
                Vec::new()
            }
        }
    }

    fn on_created(&self, uid: &str, mode: BatchMode, content: &mut ContentTree) -> Vec<Notification> {
        let Some(item) = content.item(uid) else {
            return Vec::new();
        };
        if item.category_key().is_none() {
            return Vec::new();
        }

        let mut notifications = Vec::new();
        if let Some(confidential) = item.confidential {
            notifications.push(Notification::confidential_changed(uid, None, confidential));
        }
        let file_size = self
            .builder
            .warns(item)
            .then(|| item.primary_file().map(|p| p.size))
            .flatten();

        notifications.extend(self.on_updated(uid, mode, content));

        if let Some(size) = file_size {
            warn!(uid = %uid, size, limit = self.builder.filesize_limit(), "Large file added");
            notifications.push(Notification::filesize_warning(
                uid,
                size,
                self.builder.filesize_limit(),
            ));
        }
        notifications
    }

    fn on_updated(&self, uid: &str, mode: BatchMode, content: &mut ContentTree) -> Vec<Notification> {
        let Some((tree, item)) = content.item_with_categories(uid) else {
            return Vec::new();
        };
        let parent = item.parent.clone();

        let Some(resolved) = item.category_key().and_then(|key| tree.resolve_key(key)) else {
            if let Some(key) = item.category_key() {
                warn!(uid = %uid, category = %key, "Category no longer resolves, dropping entry");
            }
            content.remove_entry(&parent, uid);
            return Vec::new();
        };

        let mut notifications = Vec::new();
        let old = item.to_print;
        self.builder.seed_print_default(item, &resolved);
        self.builder.apply_printability(item);
        if let Some(n) = print_change(item, old) {
            notifications.push(n);
        }

        if mode == BatchMode::Deferred {
            return notifications;
        }
        content.refresh_entry(uid, &self.builder);
        notifications
    }

    /// Rebuild one container's index from scratch
    pub fn rebuild(&self, content: &mut ContentTree, container: &str) -> Option<RebuildReport> {
        let report = content.rebuild_index(container, &self.builder)?;
        info!(
            container = %container,
            indexed = report.indexed,
            dropped = report.dropped,
            "Rebuilt categorized index"
        );
        Some(report)
    }

    /// Rebuild every container at or below `root`
    pub fn rebuild_subtree(&self, content: &mut ContentTree, root: &str) -> RebuildReport {
        let mut total = RebuildReport::default();
        for path in content.subtree(root) {
            if let Some(report) = self.rebuild(content, &path) {
                total.indexed += report.indexed;
                total.dropped += report.dropped;
            }
        }
        total
    }
}

fn print_change(item: &ContentItem, old: Option<bool>) -> Option<Notification> {
    if item.to_print == old {
        return None;
    }
    let message = item
        .to_print_message
        .clone()
        .unwrap_or_else(|| print_message(item.to_print).to_string());
    Some(Notification::print_changed(&item.uid, old, item.to_print).with_message(message))
}

impl LifecycleObserver for LifecycleCoordinator {
    fn notify(&mut self, event: &LifecycleEvent, content: &mut ContentTree) -> Vec<Notification> {
        self.handle(event, content)
    }
}
