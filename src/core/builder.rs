//! Computes the index snapshot of one item under its category.

use crate::domain::{
    CategorizedItem, CategoryTree, ContentItem, ContentKind, EntryOrder, ResolvedCategory,
};

use super::format::{warn_filesize, DEFAULT_FILESIZE_LIMIT};
use super::preview::PreviewStatusResolver;

/// Message stored on items whose printing had to be deactivated
pub const NOT_PRINTABLE_MESSAGE: &str = "Can not be printed";

/// Builds [`CategorizedItem`] snapshots
#[derive(Debug, Clone)]
pub struct ItemBuilder {
    filesize_limit: u64,
    preview: PreviewStatusResolver,
}

impl ItemBuilder {
    pub fn new(preview: PreviewStatusResolver) -> Self {
        Self {
            filesize_limit: DEFAULT_FILESIZE_LIMIT,
            preview,
        }
    }

    pub fn with_filesize_limit(mut self, limit: u64) -> Self {
        self.filesize_limit = limit;
        self
    }

    pub fn filesize_limit(&self) -> u64 {
        self.filesize_limit
    }

    pub fn preview(&self) -> &PreviewStatusResolver {
        &self.preview
    }

    /// Build the snapshot of an item whose category already resolved
    pub fn build(
        &self,
        item: &ContentItem,
        tree: &CategoryTree,
        category: &ResolvedCategory<'_>,
    ) -> CategorizedItem {
        let relative_url = item.relative_url();
        let payload = item.primary_file();
        let filesize = payload.map(|p| p.size);

        CategorizedItem {
            uid: item.uid.clone(),
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            portal_type: item.portal_type.clone(),
            download_url: payload
                .map(|p| format!("{}/@@download/file/{}", relative_url, p.filename)),
            relative_url,
            icon_url: tree.icon_url(category),
            filesize,
            warn_filesize: filesize.is_some_and(|size| warn_filesize(size, self.filesize_limit)),
            to_print: item.to_print,
            confidential: item
                .confidential
                .unwrap_or(category.target().confidential),
            preview_status: self.preview.status(item),
            category_uid: category.category.uid.clone(),
            category_id: category.category.id.clone(),
            category_title: category.category.title.clone(),
            subcategory_uid: category.subcategory.map(|s| s.uid.clone()),
            subcategory_id: category.subcategory.map(|s| s.id.clone()),
            subcategory_title: category.subcategory.map(|s| s.title.clone()),
            order: EntryOrder {
                category: category.position,
                position: item.position,
            },
        }
    }

    /// Resolve the item's category and build; `None` if it does not resolve
    pub fn build_from_tree(&self, item: &ContentItem, tree: &CategoryTree) -> Option<CategorizedItem> {
        let category = tree.resolve(&item.category_ref()?)?;
        Some(self.build(item, tree, &category))
    }

    /// Whether the item's size should raise a warning
    pub fn warns(&self, item: &ContentItem) -> bool {
        item.primary_file()
            .is_some_and(|p| warn_filesize(p.size, self.filesize_limit))
    }

    /// Re-seed a missing print flag from the category default.
    ///
    /// Only applies when the category's group manages printing. Returns
    /// whether the item changed.
    pub fn seed_print_default(&self, item: &mut ContentItem, category: &ResolvedCategory<'_>) -> bool {
        if item.to_print.is_some() || !category.group.to_be_printed_activated {
            return false;
        }
        item.to_print = Some(category.target().to_print);
        true
    }

    /// Whether the item can be rendered to a printable format
    pub fn is_printable(&self, item: &ContentItem) -> bool {
        match item.kind {
            ContentKind::Link => false,
            ContentKind::File => self.preview.is_convertible(item),
            ContentKind::Image | ContentKind::Document => true,
        }
    }

    /// Deactivate printing on items that cannot be printed
    pub fn apply_printability(&self, item: &mut ContentItem) {
        item.to_print_message = None;
        if !self.is_printable(item) {
            item.to_print = None;
            item.to_print_message = Some(NOT_PRINTABLE_MESSAGE.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::preview::ConversionRecords;
    use crate::domain::{CategoryConfig, CategoryGroup, FilePayload, PreviewStatus};

    fn tree(print_managed: bool) -> CategoryTree {
        CategoryTree::new().with_group(
            CategoryGroup::new("group-1", "Group 1")
                .with_print_management(print_managed)
                .with_category(
                    CategoryConfig::new("category-1", "Category 1")
                        .with_icon("icon.png")
                        .with_to_print(true)
                        .with_confidential(true)
                        .with_subcategory(
                            CategoryConfig::new("sub-1", "Sub 1").with_icon("sub.png"),
                        ),
                ),
        )
    }

    fn builder() -> ItemBuilder {
        ItemBuilder::new(PreviewStatusResolver::new(
            ["pdf"],
            Arc::new(ConversionRecords::new()),
        ))
    }

    #[test]
    fn test_document_snapshot() {
        let tree = tree(false);
        let item = ContentItem::new("doc", "Doc", "Document")
            .with_description("Document description")
            .with_category("group-1_-_category-1")
            .with_to_print(Some(false))
            .with_confidential(false);

        let snap = builder().build_from_tree(&item, &tree).unwrap();
        assert_eq!(snap.uid, item.uid);
        assert_eq!(snap.category_id, "category-1");
        assert_eq!(snap.category_title, "Category 1");
        assert!(snap.subcategory_id.is_none());
        assert_eq!(snap.description, "Document description");
        assert_eq!(snap.relative_url, "doc");
        assert_eq!(snap.download_url, None);
        assert_eq!(snap.filesize, None);
        assert!(!snap.warn_filesize);
        assert_eq!(snap.to_print, Some(false));
        assert!(!snap.confidential);
        assert_eq!(snap.preview_status, PreviewStatus::NotConvertable);
        assert_eq!(
            snap.icon_url.as_deref(),
            Some("config/group-1/category-1/@@download/icon/icon.png")
        );
    }

    #[test]
    fn test_file_snapshot_with_subcategory() {
        let tree = tree(false);
        let mut item = ContentItem::file("file", "File", FilePayload::new("big.pdf", 5_000_001))
            .with_category("group-1_-_category-1_-_sub-1");
        item.parent = "folder".to_string();

        let snap = builder().build_from_tree(&item, &tree).unwrap();
        assert_eq!(snap.filesize, Some(5_000_001));
        assert!(snap.warn_filesize);
        assert_eq!(
            snap.download_url.as_deref(),
            Some("folder/file/@@download/file/big.pdf")
        );
        assert_eq!(snap.subcategory_id.as_deref(), Some("sub-1"));
        assert_eq!(snap.category_id, "category-1");
        assert_eq!(snap.preview_status, PreviewStatus::InProgress);
        assert_eq!(snap.order.category, (0, 0, 1));
    }

    #[test]
    fn test_confidential_defaults_from_category() {
        let tree = tree(false);
        let item = ContentItem::new("doc", "Doc", "Document").with_category("group-1_-_category-1");

        let snap = builder().build_from_tree(&item, &tree).unwrap();
        assert!(snap.confidential);
    }

    #[test]
    fn test_unresolvable_category_builds_nothing() {
        let tree = tree(false);
        let item = ContentItem::new("doc", "Doc", "Document").with_category("some_wrong_category_id");
        assert!(builder().build_from_tree(&item, &tree).is_none());
    }

    #[test]
    fn test_seed_print_default_needs_print_management() {
        let b = builder();
        let mut item = ContentItem::new("doc", "Doc", "Document").with_category("group-1_-_category-1");

        let inactive = tree(false);
        let resolved = inactive.resolve_key("group-1_-_category-1").unwrap();
        assert!(!b.seed_print_default(&mut item, &resolved));
        assert_eq!(item.to_print, None);

        let active = tree(true);
        let resolved = active.resolve_key("group-1_-_category-1").unwrap();
        assert!(b.seed_print_default(&mut item, &resolved));
        assert_eq!(item.to_print, Some(true));
    }

    #[test]
    fn test_printability() {
        let b = builder();

        let mut zip = ContentItem::file("z", "Z", FilePayload::new("z.zip", 1)).with_to_print(Some(true));
        b.apply_printability(&mut zip);
        assert_eq!(zip.to_print, None);
        assert_eq!(zip.to_print_message.as_deref(), Some(NOT_PRINTABLE_MESSAGE));

        let mut pdf = ContentItem::file("p", "P", FilePayload::new("p.pdf", 1)).with_to_print(Some(true));
        b.apply_printability(&mut pdf);
        assert_eq!(pdf.to_print, Some(true));
        assert!(pdf.to_print_message.is_none());

        let link = ContentItem::new("l", "L", "Link").with_kind(ContentKind::Link);
        assert!(!b.is_printable(&link));

        let image = ContentItem::image("i", "I", FilePayload::new("i.png", 1));
        assert!(b.is_printable(&image));
    }
}
