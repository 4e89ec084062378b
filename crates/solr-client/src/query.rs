//! Solr query representation and placeholder rendering.
//!
//! A [`SolrQuery`] is what the builder hands to the client: a `q` template
//! whose `{}` placeholders are filled with escaped values at send time,
//! plus the remaining request parameters.
//!
//! ```rust
//! use datasolr_client::{QueryOperator, SolrQuery};
//!
//! let query = SolrQuery::from_clauses(
//!     vec!["_fulltext:{}".into(), "scientificName:{}".into()],
//!     vec!["himalaya".into(), "Daucus carota".into()],
//! );
//! assert_eq!(
//!     query.render_q(QueryOperator::And).unwrap(),
//!     "_fulltext:himalaya AND scientificName:Daucus\\ carota"
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::security::solr::escape_term;

/// Boolean operator used to join a list of clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryOperator {
    #[default]
    And,
    Or,
}

impl QueryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::And => "AND",
            QueryOperator::Or => "OR",
        }
    }

    /// Separator placed between joined clauses, e.g. `" AND "`.
    pub fn separator(&self) -> &'static str {
        match self {
            QueryOperator::And => " AND ",
            QueryOperator::Or => " OR ",
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(QueryOperator::And),
            "OR" => Ok(QueryOperator::Or),
            other => Err(Error::new(ErrorKind::Config(format!(
                "Unknown query operator: {}",
                other
            )))),
        }
    }
}

/// Base of a templated query: either a clause list still to be joined, or
/// an already joined string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryBase {
    Clauses(Vec<String>),
    Joined(String),
}

/// The `q` parameter of a Solr request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTemplate {
    /// Sent as-is, without escaping.
    Raw(String),
    /// `{}` placeholders in `base` are replaced, in order, by the escaped
    /// entries of `values`. Literal braces are written `{{` and `}}`.
    Template { base: QueryBase, values: Vec<String> },
}

impl Default for QueryTemplate {
    fn default() -> Self {
        QueryTemplate::Template {
            base: QueryBase::Clauses(Vec::new()),
            values: Vec::new(),
        }
    }
}

/// Request parameters other than `q`. Keys may repeat on the wire
/// (`facet.field`, `stats.field`), so every key holds a list of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolrParams {
    entries: BTreeMap<String, Vec<String>>,
}

impl SolrParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to a single value, replacing anything already there.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries.insert(key.into(), vec![value.to_string()]);
        self
    }

    /// Set `key` to several values, replacing anything already there.
    pub fn set_all<I, V>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.entries
            .insert(key.into(), values.into_iter().map(|v| v.to_string()).collect());
        self
    }

    /// Append a value to `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries
            .entry(key.into())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Set `key` only if it has no value yet.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries
            .entry(key.into())
            .or_insert_with(|| vec![value.to_string()]);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(key)
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`. Keys present in `other` replace the
    /// existing values entirely.
    pub fn merge(&mut self, other: &SolrParams) {
        for (key, values) in &other.entries {
            self.entries.insert(key.clone(), values.clone());
        }
    }

    /// Flatten into `(key, value)` pairs in key order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.clone(), v.clone())))
            .collect()
    }
}

/// A complete Solr search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolrQuery {
    pub q: QueryTemplate,
    pub params: SolrParams,
}

impl SolrQuery {
    /// Query whose `q` is sent without escaping.
    pub fn raw(q: impl Into<String>) -> Self {
        Self {
            q: QueryTemplate::Raw(q.into()),
            params: SolrParams::new(),
        }
    }

    /// Templated query from a clause list and its values.
    pub fn from_clauses(clauses: Vec<String>, values: Vec<String>) -> Self {
        Self {
            q: QueryTemplate::Template {
                base: QueryBase::Clauses(clauses),
                values,
            },
            params: SolrParams::new(),
        }
    }

    /// Produce the final `q` string.
    ///
    /// Clause lists are joined with `operator`; then every `{}` consumes
    /// the next escaped value. A template whose placeholder count differs
    /// from its value count is rejected.
    pub fn render_q(&self, operator: QueryOperator) -> Result<String> {
        match &self.q {
            QueryTemplate::Raw(q) => Ok(q.clone()),
            QueryTemplate::Template { base, values } => {
                let joined = match base {
                    QueryBase::Clauses(clauses) => clauses.join(operator.separator()),
                    QueryBase::Joined(s) => s.clone(),
                };
                fill_placeholders(&joined, values)
            }
        }
    }
}

/// Replace each `{}` in `template` with the escaped value at the same
/// position.
pub fn fill_placeholders(template: &str, values: &[String]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + values.iter().map(String::len).sum::<usize>());
    let mut remaining = values.iter();
    let mut used = 0usize;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some('{') => out.push('{'),
                Some('}') => {
                    let Some(value) = remaining.next() else {
                        return Err(Error::new(ErrorKind::Query(format!(
                            "query template has more placeholders than the {} value(s) supplied",
                            values.len()
                        ))));
                    };
                    out.push_str(&escape_term(value));
                    used += 1;
                }
                _ => {
                    return Err(Error::new(ErrorKind::Query(
                        "unmatched '{' in query template".to_string(),
                    )))
                }
            },
            '}' => {
                if chars.next() != Some('}') {
                    return Err(Error::new(ErrorKind::Query(
                        "unmatched '}' in query template".to_string(),
                    )));
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    if used != values.len() {
        return Err(Error::new(ErrorKind::Query(format!(
            "query template has {} placeholder(s) but {} value(s) were supplied",
            used,
            values.len()
        ))));
    }

    Ok(out)
}
