//! Raw request parsing.
//!
//! Turns the JSON object a host receives into a [`SearchRequest`] plus the
//! working copy that search extensions validate. Every malformed key is
//! reported, not just the first one.

use std::collections::BTreeMap;

use datasolr_query::{
    parse_sort, Distinct, Facets, FilterValue, Filters, FullText, SearchRequest, SortTerm,
    DEFAULT_LIMIT,
};
use serde_json::{Map, Value};

use crate::error::{Result, ValidationErrors};

/// Keys understood by the request schema. Anything else is kept for
/// extensions to claim.
pub const KNOWN_KEYS: &[&str] = &[
    "resource_id",
    "filters",
    "q",
    "distinct",
    "limit",
    "offset",
    "fields",
    "sort",
    "cursor",
    "facets",
    "facets_limit",
    "facets_field_limit",
    "solr_stats_fields",
    "indexed_only",
];

/// A request that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub request: SearchRequest,
    /// Normalised copy of the raw parameters. List-like values are lists
    /// and `sort` holds bare field names.
    pub working: Map<String, Value>,
    /// Whether `fields` was given explicitly.
    pub fields_given: bool,
}

/// Validate `raw` against the request schema.
pub fn parse_request(raw: &Value) -> Result<ParsedRequest> {
    let mut errors = ValidationErrors::new();
    let empty = Map::new();
    let object = match raw {
        Value::Object(object) => object,
        _ => {
            errors.add("request", "must be an object");
            &empty
        }
    };

    let resource_id = match object.get("resource_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(_) => {
            errors.add("resource_id", "must be a non-empty string");
            String::new()
        }
        None => {
            errors.add("resource_id", "Missing value");
            String::new()
        }
    };

    let mut request = SearchRequest::new(resource_id.clone());
    let mut working = Map::new();
    working.insert("resource_id".into(), Value::String(resource_id));

    if let Some(value) = object.get("filters") {
        match parse_filters(value) {
            Some(filters) => request.filters = filters,
            None => errors.add("filters", "must be an object of scalars or lists of scalars"),
        }
        working.insert("filters".into(), value.clone());
    }

    if let Some(value) = object.get("q").filter(|v| !v.is_null()) {
        match parse_full_text(value) {
            Some(q) => {
                working.insert("q".into(), full_text_value(&q));
                request.q = Some(q).filter(|q| !q.is_empty());
            }
            None => errors.add("q", "must be a string or an object of strings"),
        }
    }

    if let Some(value) = object.get("limit") {
        match parse_u64(value) {
            Some(0) => errors.add("limit", "Must be a positive integer"),
            Some(limit) => request.limit = limit,
            None => errors.add("limit", "Invalid integer"),
        }
        working.insert("limit".into(), value.clone());
    } else {
        request.limit = DEFAULT_LIMIT;
    }

    if let Some(value) = object.get("offset") {
        match parse_u64(value) {
            Some(offset) => request = request.with_offset(offset),
            None => errors.add("offset", "Invalid integer"),
        }
        working.insert("offset".into(), value.clone());
    }

    let fields_given = object.contains_key("fields");
    if let Some(value) = object.get("fields") {
        match string_list(value) {
            Some(fields) => {
                working.insert("fields".into(), string_array(&fields));
                request.fields = fields;
            }
            None => errors.add("fields", "must be a list of strings or a comma separated string"),
        }
    }

    if let Some(value) = object.get("sort") {
        match parse_sort_value(value) {
            Ok(sort) => {
                let names: Vec<String> = sort.iter().map(|t| t.field.clone()).collect();
                working.insert("sort".into(), string_array(&names));
                request.sort = sort;
            }
            Err(message) => errors.add("sort", message),
        }
    }

    if let Some(value) = object.get("distinct") {
        match value {
            Value::Bool(true) => request.distinct = Distinct::OnFields,
            Value::Bool(false) | Value::Null => {}
            Value::String(field) if !field.is_empty() => {
                request.distinct = Distinct::Field(field.clone())
            }
            _ => errors.add("distinct", "must be a boolean or a field name"),
        }
        working.insert("distinct".into(), value.clone());
    }

    if let Some(value) = object.get("cursor").filter(|v| !v.is_null()) {
        match value {
            Value::String(cursor) => request = request.with_cursor(cursor.clone()),
            _ => errors.add("cursor", "must be a string"),
        }
        working.insert("cursor".into(), value.clone());
    }

    let mut facets = Facets::default();
    if let Some(value) = object.get("facets") {
        match string_list(value) {
            Some(fields) => {
                working.insert("facets".into(), string_array(&fields));
                facets.fields = fields;
            }
            None => errors.add("facets", "must be a list of strings or a comma separated string"),
        }
    }
    if let Some(value) = object.get("facets_limit") {
        match parse_u64(value) {
            Some(limit) => facets.limit = Some(limit),
            None => errors.add("facets_limit", "Invalid integer"),
        }
        working.insert("facets_limit".into(), value.clone());
    }
    if let Some(value) = object.get("facets_field_limit") {
        match parse_field_limits(value) {
            Some(limits) => facets.field_limits = limits,
            None => errors.add("facets_field_limit", "must be an object of integers"),
        }
        working.insert("facets_field_limit".into(), value.clone());
    }
    request.facets = facets;

    if let Some(value) = object.get("solr_stats_fields") {
        match string_list(value) {
            Some(fields) => {
                working.insert("solr_stats_fields".into(), string_array(&fields));
                request.stats_fields = fields;
            }
            None => errors.add(
                "solr_stats_fields",
                "must be a list of strings or a comma separated string",
            ),
        }
    }

    if let Some(value) = object.get("indexed_only") {
        match parse_bool(value) {
            Some(flag) => request.indexed_only = flag,
            None => errors.add("indexed_only", "must be a boolean"),
        }
        working.insert("indexed_only".into(), value.clone());
    }

    for (key, value) in object {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            request.extras.insert(key.clone(), value.clone());
            working.insert(key.clone(), value.clone());
        }
    }

    errors.into_result()?;
    Ok(ParsedRequest {
        request,
        working,
        fields_given,
    })
}

fn parse_filters(value: &Value) -> Option<Filters> {
    match value {
        Value::Null => Some(Filters::new()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| FilterValue::from_json(v).map(|f| (k.clone(), f)))
            .collect(),
        _ => None,
    }
}

fn parse_full_text(value: &Value) -> Option<FullText> {
    match value {
        Value::String(text) => Some(FullText::Plain(text.clone())),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| datasolr_query::scalar_to_string(v).map(|s| (k.clone(), s)))
            .collect::<Option<BTreeMap<_, _>>>()
            .map(FullText::Fields),
        _ => None,
    }
}

fn full_text_value(q: &FullText) -> Value {
    match q {
        FullText::Plain(text) => Value::String(text.clone()),
        FullText::Fields(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    }
}

fn parse_sort_value(value: &Value) -> std::result::Result<Vec<SortTerm>, String> {
    let statements: Vec<&str> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(Value::as_str)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| "must be a string or a list of strings".to_string())?,
        _ => return Err("must be a string or a list of strings".to_string()),
    };

    let mut terms = Vec::new();
    for statement in statements.into_iter().filter(|s| !s.trim().is_empty()) {
        let parsed = parse_sort(statement).map_err(|e| match e.kind {
            datasolr_query::ErrorKind::Parse(message) => message,
            other => other.to_string(),
        })?;
        terms.extend(parsed);
    }
    Ok(terms)
}

fn parse_field_limits(value: &Value) -> Option<BTreeMap<String, u64>> {
    match value {
        Value::Null => Some(BTreeMap::new()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| parse_u64(v).map(|n| (k.clone(), n)))
            .collect(),
        _ => None,
    }
}

/// A list of strings, or a comma separated string.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
