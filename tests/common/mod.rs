//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use iconified::config::IndexSettings;
use iconified::core::preview::ConversionRecords;
use iconified::domain::{CategoryConfig, CategoryGroup, CategoryTree};
use iconified::{ContentTree, LifecycleCoordinator, Repository};

/// Two groups; group-1 manages printing and confidentiality
pub fn category_tree() -> CategoryTree {
    CategoryTree::new()
        .with_group(
            CategoryGroup::new("group-1", "Group 1")
                .with_print_management(true)
                .with_confidentiality(true)
                .with_category(
                    CategoryConfig::new("category-1-1", "Category 1-1")
                        .with_icon("icon1.png")
                        .with_to_print(true),
                )
                .with_category(
                    CategoryConfig::new("category-1-2", "Category 1-2")
                        .with_icon("icon2.png")
                        .with_confidential(true)
                        .with_subcategory(
                            CategoryConfig::new("subcategory-1-2-1", "Subcategory 1-2-1")
                                .with_icon("sub.png"),
                        ),
                ),
        )
        .with_group(
            CategoryGroup::new("group-2", "Group 2")
                .with_category(CategoryConfig::new("category-2-1", "Category 2-1").with_icon("icon3.png")),
        )
}

pub fn settings() -> IndexSettings {
    IndexSettings::default()
}

pub fn coordinator(records: Arc<ConversionRecords>) -> LifecycleCoordinator {
    LifecycleCoordinator::from_settings(&settings(), records)
}

/// Repository with a `folder` container and the coordinator registered
pub fn repository() -> (Repository, Arc<ConversionRecords>) {
    let records = Arc::new(ConversionRecords::new());
    let mut repo = Repository::new(ContentTree::new(category_tree())).with_observer(coordinator(records.clone()));
    repo.add_container("folder").unwrap();
    (repo, records)
}
