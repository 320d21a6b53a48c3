//! Filtered, sorted listings over a container's categorized index.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{CategorizedView, ContentItem};
use crate::library::repository::{ContentTree, RepositoryError};

/// Shape of the returned elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// JSON objects of snapshot fields
    Dict,

    /// Live content items
    Objects,

    /// Lightweight references
    Refs,
}

impl Default for ResultType {
    fn default() -> Self {
        Self::Dict
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultType::Dict => write!(f, "dict"),
            ResultType::Objects => write!(f, "objects"),
            ResultType::Refs => write!(f, "refs"),
        }
    }
}

impl std::str::FromStr for ResultType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dict" | "dicts" => Ok(ResultType::Dict),
            "objects" | "object" => Ok(ResultType::Objects),
            "refs" | "ref" | "brains" => Ok(ResultType::Refs),
            _ => anyhow::bail!("Unknown result type: {}", s),
        }
    }
}

/// Listing parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Exact portal type to keep
    #[serde(default)]
    pub portal_type: Option<String>,

    /// Snapshot field or repository key to sort on
    #[serde(default)]
    pub sort_on: Option<String>,

    #[serde(default)]
    pub result_type: ResultType,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portal_type(mut self, portal_type: impl Into<String>) -> Self {
        self.portal_type = Some(portal_type.into());
        self
    }

    pub fn with_sort_on(mut self, key: impl Into<String>) -> Self {
        self.sort_on = Some(key.into());
        self
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }
}

/// Lightweight reference to an indexed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "UID")]
    pub uid: String,
    pub id: String,
    pub title: String,
    pub portal_type: String,
    pub relative_url: String,
    pub content_category: Option<String>,
}

impl ItemRef {
    fn from_view(view: &CategorizedView<'_>) -> Self {
        let snapshot = view.snapshot;
        Self {
            uid: snapshot.uid.clone(),
            id: snapshot.id.clone(),
            title: snapshot.title.clone(),
            portal_type: snapshot.portal_type.clone(),
            relative_url: snapshot.relative_url.clone(),
            content_category: view.live.and_then(|item| item.content_category.clone()),
        }
    }
}

/// Query results in the requested shape
#[derive(Debug, Clone)]
pub enum QueryResult<'a> {
    Dicts(Vec<Map<String, Value>>),
    Objects(Vec<&'a ContentItem>),
    Refs(Vec<ItemRef>),
}

impl QueryResult<'_> {
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Dicts(v) => v.len(),
            QueryResult::Objects(v) => v.len(),
            QueryResult::Refs(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uids of the results, in result order
    pub fn uids(&self) -> Vec<String> {
        match self {
            QueryResult::Dicts(v) => v
                .iter()
                .filter_map(|d| d.get("UID").and_then(Value::as_str).map(str::to_string))
                .collect(),
            QueryResult::Objects(v) => v.iter().map(|item| item.uid.clone()).collect(),
            QueryResult::Refs(v) => v.iter().map(|r| r.uid.clone()).collect(),
        }
    }

    /// JSON rendering of the results
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            QueryResult::Dicts(v) => serde_json::to_value(v),
            QueryResult::Objects(v) => serde_json::to_value(v),
            QueryResult::Refs(v) => serde_json::to_value(v),
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over optional JSON values; missing values sort first
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or_default();
                let y = y.as_f64().unwrap_or_default();
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
    }
}

/// Views over a container's index, one per entry still backed by a live item
pub fn views<'a>(content: &'a ContentTree, container: &str) -> Result<Vec<CategorizedView<'a>>, RepositoryError> {
    let index = content
        .index(container)
        .ok_or_else(|| RepositoryError::ContainerNotFound(container.to_string()))?;
    Ok(index
        .iter()
        .filter_map(|snapshot| {
            let live = content.item(&snapshot.uid)?;
            Some(CategorizedView::new(snapshot, Some(live)))
        })
        .collect())
}

/// Run a query against one container.
///
/// Results keep the index order unless `sort_on` names a key; the sort is
/// stable and a key no element carries leaves the order unchanged.
pub fn query<'a>(content: &'a ContentTree, container: &str, query: &Query) -> Result<QueryResult<'a>, RepositoryError> {
    let mut views = views(content, container)?;

    if let Some(portal_type) = &query.portal_type {
        views.retain(|view| view.snapshot.portal_type == *portal_type);
    }

    if let Some(key) = &query.sort_on {
        let mut keyed: Vec<(Option<Value>, CategorizedView<'a>)> =
            views.into_iter().map(|view| (view.get(key), view)).collect();
        keyed.sort_by(|(a, _), (b, _)| compare_values(a.as_ref(), b.as_ref()));
        views = keyed.into_iter().map(|(_, view)| view).collect();
    }

    Ok(match query.result_type {
        ResultType::Dict => QueryResult::Dicts(views.iter().map(|v| v.snapshot.to_dict()).collect()),
        ResultType::Objects => QueryResult::Objects(views.iter().filter_map(|v| v.live).collect()),
        ResultType::Refs => QueryResult::Refs(views.iter().map(ItemRef::from_view).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_values_puts_missing_first() {
        let one = Value::from(1);
        let two = Value::from(2.5);
        assert_eq!(compare_values(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_values(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(
            compare_values(Some(&Value::Null), Some(&Value::from("a"))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&Value::from("b")), Some(&Value::from("a"))),
            Ordering::Greater
        );
    }

    #[test]
    fn test_result_type_from_str() {
        assert_eq!("dict".parse::<ResultType>().unwrap(), ResultType::Dict);
        assert_eq!("brains".parse::<ResultType>().unwrap(), ResultType::Refs);
        assert!("xml".parse::<ResultType>().is_err());
    }

    #[test]
    fn test_unknown_container_is_an_error() {
        let content = ContentTree::default();
        assert!(matches!(
            query(&content, "missing", &Query::new()),
            Err(RepositoryError::ContainerNotFound(_))
        ));
        assert!(query(&content, "", &Query::new()).unwrap().is_empty());
    }
}
