//! Live content items as held by the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryRef;

/// Kind of content, deciding whether an item carries a primary file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Binary file (primary field `file`)
    File,

    /// Image (primary field `image`)
    Image,

    /// Link to an external resource
    Link,

    /// Anything else (rich text documents, events, ...)
    Document,
}

impl ContentKind {
    /// Whether this kind carries a primary file payload
    pub fn has_file_payload(&self) -> bool {
        matches!(self, ContentKind::File | ContentKind::Image)
    }
}

impl Default for ContentKind {
    fn default() -> Self {
        Self::Document
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::File => write!(f, "file"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::Link => write!(f, "link"),
            ContentKind::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(ContentKind::File),
            "image" => Ok(ContentKind::Image),
            "link" => Ok(ContentKind::Link),
            "document" | "doc" => Ok(ContentKind::Document),
            _ => anyhow::bail!("Unknown content kind: {}", s),
        }
    }
}

/// Primary file of a file or image item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    pub filename: String,

    /// Size in bytes
    pub size: u64,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }

    /// Lowercased extension of the file name
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// A content item living in a container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Repository-wide unique identifier
    pub uid: String,

    /// Id of the item within its container
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Type name as registered by the application ("File", "annex", ...)
    pub portal_type: String,

    #[serde(default)]
    pub kind: ContentKind,

    /// Path of the owning container ("" for the repository root)
    #[serde(default)]
    pub parent: String,

    /// Position within the parent container
    #[serde(default)]
    pub position: u32,

    #[serde(default)]
    pub file: Option<FilePayload>,

    /// Category key (`group_-_category[_-_subcategory]`)
    #[serde(default)]
    pub content_category: Option<String>,

    /// None means printing is deactivated for this item
    #[serde(default)]
    pub to_print: Option<bool>,

    /// Why printing is deactivated, if it is
    #[serde(default)]
    pub to_print_message: Option<String>,

    /// None means the item declares no confidentiality
    #[serde(default)]
    pub confidential: Option<bool>,

    #[serde(default)]
    pub creator: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl ContentItem {
    /// Create a new document-kind item with a fresh uid
    pub fn new(id: impl Into<String>, title: impl Into<String>, portal_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: Uuid::new_v4().simple().to_string(),
            id: id.into(),
            title: title.into(),
            description: String::new(),
            portal_type: portal_type.into(),
            kind: ContentKind::Document,
            parent: String::new(),
            position: 0,
            file: None,
            content_category: None,
            to_print: None,
            to_print_message: None,
            confidential: None,
            creator: String::new(),
            created: now,
            modified: now,
        }
    }

    /// A `File` item carrying a payload
    pub fn file(id: impl Into<String>, title: impl Into<String>, payload: FilePayload) -> Self {
        Self::new(id, title, "File")
            .with_kind(ContentKind::File)
            .with_file(payload)
    }

    /// An `Image` item carrying a payload
    pub fn image(id: impl Into<String>, title: impl Into<String>, payload: FilePayload) -> Self {
        Self::new(id, title, "Image")
            .with_kind(ContentKind::Image)
            .with_file(payload)
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_file(mut self, payload: FilePayload) -> Self {
        self.file = Some(payload);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, key: impl Into<String>) -> Self {
        self.content_category = Some(key.into());
        self
    }

    pub fn with_to_print(mut self, to_print: Option<bool>) -> Self {
        self.to_print = to_print;
        self
    }

    pub fn with_confidential(mut self, confidential: bool) -> Self {
        self.confidential = Some(confidential);
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Non-empty category key, if any
    pub fn category_key(&self) -> Option<&str> {
        self.content_category
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Parsed category reference; malformed keys yield `None`
    pub fn category_ref(&self) -> Option<CategoryRef> {
        self.category_key().and_then(|key| CategoryRef::parse(key).ok())
    }

    /// Primary file, only for kinds that carry one
    pub fn primary_file(&self) -> Option<&FilePayload> {
        if self.kind.has_file_payload() {
            self.file.as_ref()
        } else {
            None
        }
    }

    /// URL of the item relative to the repository root
    pub fn relative_url(&self) -> String {
        if self.parent.is_empty() {
            self.id.clone()
        } else {
            format!("{}/{}", self.parent, self.id)
        }
    }

    /// Lowercased title used for title sorting
    pub fn sortable_title(&self) -> String {
        self.title.to_lowercase()
    }

    /// Mark the item as modified now
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}
