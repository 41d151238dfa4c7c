//! Field-accessor schema shared by every list-view pipeline stage.
//!
//! Each record type publishes an ordered table of `FieldDef`s. Filter, sort
//! and export look fields up by canonical name and read values through the
//! extractor, so none of them hardcode an entity shape.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::models::Collection;

/// A single extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Timestamp(DateTime<Utc>),
    /// Enumerated value with its sort priority.
    Choice { value: &'static str, rank: i64 },
    Flag(bool),
}

impl FieldValue {
    pub fn text(s: &str) -> Self {
        FieldValue::Text(Some(s.to_string()))
    }

    pub fn optional(s: &Option<String>) -> Self {
        FieldValue::Text(s.clone())
    }

    /// Canonical string form, used for search, facet matching and CSV cells.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(Some(s)) => s.clone(),
            FieldValue::Text(None) => String::new(),
            FieldValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            FieldValue::Choice { value, .. } => (*value).to_string(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(Some(s)) => Value::String(s.clone()),
            FieldValue::Text(None) => Value::Null,
            FieldValue::Timestamp(_) | FieldValue::Choice { .. } => Value::String(self.display()),
            FieldValue::Flag(b) => Value::Bool(*b),
        }
    }

    /// True when the value carries content (non-empty text, any other kind).
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Text(Some(s)) => !s.trim().is_empty(),
            FieldValue::Text(None) => false,
            _ => true,
        }
    }
}

/// Named extractor for one logical field of `R`.
pub struct FieldDef<R> {
    pub name: &'static str,
    pub label: &'static str,
    pub searchable: bool,
    pub facet: bool,
    pub sortable: bool,
    pub get: fn(&R) -> FieldValue,
}

impl<R> FieldDef<R> {
    pub const fn new(name: &'static str, label: &'static str, get: fn(&R) -> FieldValue) -> Self {
        Self {
            name,
            label,
            searchable: false,
            facet: false,
            sortable: false,
            get,
        }
    }

    pub const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub const fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub const fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn value(&self, record: &R) -> FieldValue {
        (self.get)(record)
    }
}

/// A record type that can flow through the list-view pipeline.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    /// Ordered field table. Export defaults and the `/fields` endpoint follow this order.
    fn fields() -> &'static [FieldDef<Self>];

    /// Type component of the relevance score.
    fn type_score(&self) -> i64;

    /// Whether the designated richness field is filled in.
    fn is_rich(&self) -> bool;

    /// Collection-specific analytics added to the summary. None by default.
    fn metrics(_records: &[Self]) -> Map<String, Value> {
        Map::new()
    }

    fn field(name: &str) -> Option<&'static FieldDef<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }
}

/// Serializable view of a field definition for clients building menus.
#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub searchable: bool,
    pub facet: bool,
    pub sortable: bool,
}

pub fn describe_fields<R: Record>() -> Vec<FieldInfo> {
    R::fields()
        .iter()
        .map(|f| FieldInfo {
            name: f.name,
            label: f.label,
            searchable: f.searchable,
            facet: f.facet,
            sortable: f.sortable,
        })
        .collect()
}
