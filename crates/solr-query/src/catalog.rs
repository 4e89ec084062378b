//! Field catalog of a resource.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Datastore field type.
///
/// Parsing is lenient: database and Solr type names are folded onto the
/// small set of types that affect query building and row formatting, and
/// anything else is kept verbatim as [`FieldType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Numeric,
    Integer,
    Date,
    Timestamp,
    Boolean,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Numeric => "numeric",
            FieldType::Integer => "int",
            FieldType::Date => "date",
            FieldType::Timestamp => "timestamp",
            FieldType::Boolean => "bool",
            FieldType::Other(name) => name,
        }
    }

    /// Returns true for types formatted as a calendar date on output.
    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Timestamp)
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let lower = lower.strip_prefix("field_").unwrap_or(&lower);
        match lower {
            "text" | "string" | "varchar" | "char" | "bpchar" | "name" => FieldType::Text,
            "numeric" | "float" | "double" | "float4" | "float8" | "decimal" | "real"
            | "tfloat" | "tdouble" | "pfloat" | "pdouble" => FieldType::Numeric,
            "int" | "integer" | "int2" | "int4" | "int8" | "long" | "bigint" | "smallint"
            | "tint" | "tlong" | "pint" | "plong" => FieldType::Integer,
            "date" | "tdate" | "pdate" => FieldType::Date,
            "timestamp" | "timestamptz" | "datetime" => FieldType::Timestamp,
            "bool" | "boolean" => FieldType::Boolean,
            _ => FieldType::Other(name.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::from(name.as_str())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default = "default_true")]
    pub stored: bool,
}

fn default_true() -> bool {
    true
}

impl FieldDef {
    pub fn new(id: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
            indexed: true,
            stored: true,
        }
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn with_stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }
}

/// Ordered, read-only list of the fields of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: Vec<FieldDef>,
}

impl FieldCatalog {
    /// Build a catalog; later duplicates of a field name are ignored.
    pub fn new(fields: impl IntoIterator<Item = FieldDef>) -> Self {
        let mut unique: Vec<FieldDef> = Vec::new();
        for field in fields {
            if !unique.iter().any(|f| f.id == field.id) {
                unique.push(field);
            }
        }
        Self { fields: unique }
    }

    /// Catalog from `(name, type)` pairs, all indexed and stored.
    pub fn from_types<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<FieldType>,
    {
        Self::new(pairs.into_iter().map(|(n, t)| FieldDef::new(n, t)))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn field_type(&self, name: &str) -> Option<&FieldType> {
        self.get(name).map(|f| &f.field_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Field names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    /// Catalog restricted to indexed fields.
    pub fn indexed(&self) -> FieldCatalog {
        Self {
            fields: self.fields.iter().filter(|f| f.indexed).cloned().collect(),
        }
    }

    /// Catalog restricted to stored fields.
    pub fn stored(&self) -> FieldCatalog {
        Self {
            fields: self.fields.iter().filter(|f| f.stored).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldDef> for FieldCatalog {
    fn from_iter<I: IntoIterator<Item = FieldDef>>(iter: I) -> Self {
        FieldCatalog::new(iter)
    }
}
