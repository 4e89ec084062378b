//! Normalized search request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::sort::SortTerm;

/// Default page size.
pub const DEFAULT_LIMIT: u64 = 100;

/// Value of a field filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FilterValue {
    /// Convert a JSON scalar or array of scalars. Numbers and booleans are
    /// turned into their text form; objects, nulls and nested arrays are
    /// rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(FilterValue::Multiple),
            other => scalar_to_string(other).map(FilterValue::Single),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(v) => vec![v.as_str()],
            FilterValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

impl<S: Into<String>> From<Vec<S>> for FilterValue {
    fn from(values: Vec<S>) -> Self {
        FilterValue::Multiple(values.into_iter().map(Into::into).collect())
    }
}

/// Text form of a JSON scalar.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Field filters, keyed by API field name.
pub type Filters = BTreeMap<String, FilterValue>;

/// Free-text part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FullText {
    /// Prose searched against the `_fulltext` field.
    Plain(String),
    /// Per-field wildcard terms. A trailing `:*` on a term is ignored.
    Fields(BTreeMap<String, String>),
}

impl FullText {
    pub fn is_empty(&self) -> bool {
        match self {
            FullText::Plain(s) => s.trim().is_empty(),
            FullText::Fields(map) => map.is_empty(),
        }
    }
}

/// Paging mode. A request pages either by offset or by cursor, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paging {
    Offset(u64),
    Cursor(String),
}

impl Default for Paging {
    fn default() -> Self {
        Paging::Offset(0)
    }
}

/// Distinct (group) request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distinct {
    #[default]
    Off,
    /// `distinct: true`; the field is the single requested output field.
    OnFields,
    /// Group on a named field.
    Field(String),
}

/// Facet request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facets {
    pub fields: Vec<String>,
    /// Per-facet bucket limit; Solr default of 20 when unset.
    pub limit: Option<u64>,
    pub field_limits: BTreeMap<String, u64>,
}

impl Facets {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A search request after validation and normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub resource_id: String,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub q: Option<FullText>,
    /// Output fields; empty means all.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub sort: Vec<SortTerm>,
    #[serde(default)]
    pub paging: Paging,
    pub limit: u64,
    #[serde(default)]
    pub distinct: Distinct,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub stats_fields: Vec<String>,
    #[serde(default)]
    pub indexed_only: bool,
    /// Parameters no built-in step understands, for extensions to claim.
    #[serde(default)]
    pub extras: BTreeMap<String, Value>,
}

impl SearchRequest {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            filters: Filters::new(),
            q: None,
            fields: Vec::new(),
            sort: Vec::new(),
            paging: Paging::default(),
            limit: DEFAULT_LIMIT,
            distinct: Distinct::Off,
            facets: Facets::default(),
            stats_fields: Vec::new(),
            indexed_only: false,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_q(mut self, q: FullText) -> Self {
        self.q = Some(q);
        self
    }

    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortTerm>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.paging = Paging::Offset(offset);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.paging = Paging::Cursor(cursor.into());
        self
    }

    pub fn with_distinct(mut self, distinct: Distinct) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn with_stats_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.stats_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn cursor(&self) -> Option<&str> {
        match &self.paging {
            Paging::Cursor(c) => Some(c.as_str()),
            Paging::Offset(_) => None,
        }
    }

    /// The field to group on, if any.
    ///
    /// `distinct: true` needs exactly one output field; anything else is a
    /// query error.
    pub fn distinct_field(&self) -> Result<Option<&str>> {
        match &self.distinct {
            Distinct::Off => Ok(None),
            Distinct::Field(field) => Ok(Some(field.as_str())),
            Distinct::OnFields => match self.fields.as_slice() {
                [field] => Ok(Some(field.as_str())),
                fields => Err(Error::new(ErrorKind::Query(format!(
                    "Distinct queries can only have one field, got {}",
                    fields.len()
                )))),
            },
        }
    }
}
