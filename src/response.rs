//! Response assembly and row formatting.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use datasolr_query::{FieldCatalog, FieldMapper, FieldType, Filters, FullText, SortTerm};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::collaborators::Row;

/// Backend marker placed in every response.
pub const BACKEND: &str = "datasolr";

/// Row identifier column, listed first in field metadata.
pub const ID_FIELD: &str = "_id";

/// Output format of date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field metadata of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Statistics returned by the search engine for this field.
    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

impl FieldInfo {
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            field_type,
            stats: Map::new(),
        }
    }
}

/// The result of a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub resource_id: String,
    #[serde(skip_serializing_if = "Filters::is_empty")]
    pub filters: Filters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<FullText>,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortTerm>,
    pub fields: Vec<FieldInfo>,
    pub total: u64,
    pub records: Vec<Row>,
    #[serde(rename = "_backend")]
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Whether a field is shown in response metadata. Internal fields start
/// with `_`; `_id` is the exception.
pub fn is_visible_field(name: &str) -> bool {
    !name.starts_with('_') || name == ID_FIELD
}

/// Response field metadata: the indexed or stored catalog fields, minus
/// internal ones. `_id` always comes first; the rest keep catalog order.
pub fn field_metadata(catalog: &FieldCatalog, indexed_only: bool) -> Vec<FieldInfo> {
    let view = if indexed_only {
        catalog.indexed()
    } else {
        catalog.stored()
    };
    let mut fields: Vec<FieldInfo> = view
        .iter()
        .filter(|f| is_visible_field(&f.id))
        .map(|f| FieldInfo::new(f.id.clone(), f.field_type.clone()))
        .collect();
    if let Some(index) = fields.iter().position(|f| f.id == ID_FIELD) {
        let id = fields.remove(index);
        fields.insert(0, id);
    }
    fields
}

/// Merge a Solr `stats` block into `fields`.
///
/// Solr reports statistics under mapped field names. Each is attributed to
/// the first catalog field that maps to it; when none does, the Solr name is
/// used as is. Fields missing from `fields` are appended.
pub fn merge_stats(
    fields: &mut Vec<FieldInfo>,
    stats: &Value,
    catalog: &FieldCatalog,
    mapper: &FieldMapper,
) {
    let Some(stats_fields) = stats.get("stats_fields").and_then(Value::as_object) else {
        return;
    };

    for (solr_name, values) in stats_fields {
        let Some(values) = values.as_object() else {
            continue;
        };
        let external = catalog
            .names()
            .find(|name| mapper.map(name) == *solr_name)
            .unwrap_or(solr_name.as_str())
            .to_string();

        let index = match fields.iter().position(|f| f.id == external) {
            Some(index) => index,
            None => {
                let field_type = catalog
                    .field_type(&external)
                    .cloned()
                    .unwrap_or_else(|| FieldType::Other("unknown".into()));
                fields.push(FieldInfo::new(external, field_type));
                fields.len() - 1
            }
        };
        for (name, value) in values {
            fields[index].stats.insert(name.clone(), value.clone());
        }
    }
}

/// Keep the requested `fields` of `row`, converted per their catalog type.
/// Missing columns come out as null.
pub fn format_row(mut row: Row, fields: &[String], catalog: &FieldCatalog) -> Row {
    fields
        .iter()
        .map(|field| {
            let value = row.remove(field).unwrap_or(Value::Null);
            let value = match catalog.field_type(field) {
                Some(field_type) => convert_value(value, field_type, field),
                None => value,
            };
            (field.clone(), value)
        })
        .collect()
}

/// Convert one value to the JSON shape of `field_type`.
pub fn convert_value(value: Value, field_type: &FieldType, field: &str) -> Value {
    match field_type {
        FieldType::Integer => match &value {
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(value),
            _ => value,
        },
        FieldType::Numeric => match &value {
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(value),
            _ => value,
        },
        FieldType::Boolean => match &value {
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "1" => Value::Bool(true),
                "false" | "f" | "no" | "0" => Value::Bool(false),
                _ => value,
            },
            Value::Number(n) => n.as_i64().map(|n| Value::Bool(n != 0)).unwrap_or(value),
            _ => value,
        },
        FieldType::Date | FieldType::Timestamp => format_date(&value, field),
        FieldType::Text | FieldType::Other(_) => value,
    }
}

/// Reformat a date or timestamp as `YYYY-MM-DD`. Anything that does not
/// parse becomes an empty string.
fn format_date(value: &Value, field: &str) -> Value {
    let formatted = match value {
        Value::String(s) => parse_date(s.trim()).map(|d| d.format(DATE_FORMAT).to_string()),
        _ => None,
    };
    match formatted {
        Some(date) => Value::String(date),
        None => {
            if !value.is_null() {
                warn!(field = %field, value = %value, "Unparsable date value");
            }
            Value::String(String::new())
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}
