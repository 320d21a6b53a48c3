//! Cached metadata snapshots stored in a container's index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::category::TreePosition;
use super::item::ContentItem;

/// Conversion lifecycle of an item's preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    /// Not a convertible type, nothing will ever be rendered
    NotConvertable,

    /// Awaiting or undergoing conversion
    InProgress,

    /// Conversion finished unsuccessfully
    ConversionError,

    /// Preview available
    Converted,
}

impl Default for PreviewStatus {
    fn default() -> Self {
        Self::NotConvertable
    }
}

impl std::fmt::Display for PreviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewStatus::NotConvertable => write!(f, "not_convertable"),
            PreviewStatus::InProgress => write!(f, "in_progress"),
            PreviewStatus::ConversionError => write!(f, "conversion_error"),
            PreviewStatus::Converted => write!(f, "converted"),
        }
    }
}

/// Ordering key of an index entry.
///
/// Entries sort by category tree position, then by position of the item
/// in its container; the uid breaks any remaining tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntryOrder {
    pub category: TreePosition,
    pub position: u32,
}

/// Metadata snapshot of one categorized item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedItem {
    #[serde(rename = "UID")]
    pub uid: String,
    pub id: String,
    pub title: String,
    pub description: String,
    pub portal_type: String,
    pub relative_url: String,
    pub download_url: Option<String>,
    pub icon_url: Option<String>,
    pub filesize: Option<u64>,
    pub warn_filesize: bool,
    pub to_print: Option<bool>,
    pub confidential: bool,
    pub preview_status: PreviewStatus,
    pub category_uid: String,
    pub category_id: String,
    pub category_title: String,
    pub subcategory_uid: Option<String>,
    pub subcategory_id: Option<String>,
    pub subcategory_title: Option<String>,
    pub order: EntryOrder,
}

impl CategorizedItem {
    /// Snapshot fields as a JSON object, without the ordering key
    pub fn to_dict(&self) -> serde_json::Map<String, Value> {
        let mut map = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.remove("order");
        map
    }

    /// Value of a single snapshot field, by its serialized name
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "order" {
            return None;
        }
        self.to_dict().remove(name)
    }
}

/// Listing view over a snapshot with fallback to the live item.
///
/// Snapshot fields always win; a fixed set of repository attributes is
/// read from the live item when one is attached.
#[derive(Debug, Clone, Copy)]
pub struct CategorizedView<'a> {
    pub snapshot: &'a CategorizedItem,
    pub live: Option<&'a ContentItem>,
}

impl<'a> CategorizedView<'a> {
    pub fn new(snapshot: &'a CategorizedItem, live: Option<&'a ContentItem>) -> Self {
        Self { snapshot, live }
    }

    pub fn uid(&self) -> &str {
        &self.snapshot.uid
    }

    pub fn title(&self) -> &str {
        &self.snapshot.title
    }

    pub fn preview_status(&self) -> PreviewStatus {
        self.snapshot.preview_status
    }

    /// Look a field up in the snapshot, then on the live item
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.snapshot.field(name) {
            return Some(value);
        }
        let live = self.live?;
        match name {
            "sortable_title" => Some(Value::from(live.sortable_title())),
            "getObjPositionInParent" | "position" => Some(Value::from(live.position)),
            "created" => Some(Value::from(live.created.to_rfc3339())),
            "modified" => Some(Value::from(live.modified.to_rfc3339())),
            "Creator" | "creator" => Some(Value::from(live.creator.clone())),
            "content_category" => live.content_category.clone().map(Value::from),
            "kind" => Some(Value::from(live.kind.to_string())),
            "parent" => Some(Value::from(live.parent.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CategorizedItem {
        CategorizedItem {
            uid: "abc".into(),
            id: "doc".into(),
            title: "Doc".into(),
            description: String::new(),
            portal_type: "Document".into(),
            relative_url: "doc".into(),
            download_url: None,
            icon_url: None,
            filesize: None,
            warn_filesize: false,
            to_print: None,
            confidential: false,
            preview_status: PreviewStatus::NotConvertable,
            category_uid: "c1".into(),
            category_id: "category-1".into(),
            category_title: "Category 1".into(),
            subcategory_uid: None,
            subcategory_id: None,
            subcategory_title: None,
            order: EntryOrder::default(),
        }
    }

    #[test]
    fn test_preview_status_serializes_snake_case() {
        let json = serde_json::to_string(&PreviewStatus::NotConvertable).unwrap();
        assert_eq!(json, "\"not_convertable\"");
        assert_eq!(PreviewStatus::ConversionError.to_string(), "conversion_error");
    }

    #[test]
    fn test_dict_has_no_order_key() {
        let dict = snapshot().to_dict();
        assert!(!dict.contains_key("order"));
        assert_eq!(dict.get("UID"), Some(&Value::from("abc")));
        assert_eq!(dict.get("to_print"), Some(&Value::Null));
    }

    #[test]
    fn test_view_falls_back_to_live_item() {
        let snap = snapshot();
        let live = ContentItem::new("doc", "Doc", "Document").with_creator("admin");

        let view = CategorizedView::new(&snap, Some(&live));
        assert_eq!(view.get("title"), Some(Value::from("Doc")));
        assert_eq!(view.get("Creator"), Some(Value::from("admin")));

        let detached = CategorizedView::new(&snap, None);
        assert_eq!(detached.get("Creator"), None);
        assert_eq!(detached.get("nonexistent"), None);
    }
}
