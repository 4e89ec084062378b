//! Search result to relational fetch translation.
//!
//! The search engine only returns row identifiers. [`FetchTranslator`] runs
//! the search and turns those identifiers into a single SQL statement that
//! selects the full rows, keyed by the identifier column, from the resource
//! table.
//!
//! ```rust
//! use datasolr_query::{build_fetch_spec, SortTerm};
//! use serde_json::json;
//!
//! let spec = build_fetch_spec("abc", "id", None, &[], &[json!("a"), json!("b")]).unwrap();
//! assert_eq!(
//!     spec.sql,
//!     "SELECT * FROM \"abc\" WHERE \"id\" = ANY(VALUES (%s),(%s))"
//! );
//! assert_eq!(spec.values, vec![json!("a"), json!("b")]);
//! ```

use datasolr_client::security::sql;
use datasolr_client::{SolrClient, SolrQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::sort::SortTerm;

/// A ready-to-execute relational fetch: a statement with one `%s`
/// placeholder per entry of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSpec {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Outcome of a search, translated for the relational store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// Total reported by the search engine.
    pub total: u64,
    pub fetch: FetchSpec,
    pub stats: Option<Value>,
    pub facets: Option<Value>,
    pub next_cursor: Option<String>,
}

/// Build the fetch statement for `ids`.
///
/// With no ids the statement still selects the requested columns, with
/// `LIMIT 0`, so running it reports the column layout of an empty result.
/// `fields` of `None` selects every column. Double quotes are stripped from
/// every column name, and the resource id is reduced to `[-a-fA-F0-9]`
/// before it becomes the table reference.
pub fn build_fetch_spec(
    resource_id: &str,
    id_field: &str,
    fields: Option<&[String]>,
    sort: &[SortTerm],
    ids: &[Value],
) -> Result<FetchSpec> {
    let table = sql::sanitize_resource_id(resource_id);
    let field_list = match fields {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .map(|f| sql::quote_identifier(f))
            .collect::<Vec<_>>()
            .join(","),
        _ => "*".to_string(),
    };

    let statement = if ids.is_empty() {
        format!("SELECT {} FROM \"{}\" LIMIT 0", field_list, table)
    } else {
        let placeholders = vec!["(%s)"; ids.len()].join(",");
        let mut statement = format!(
            "SELECT {} FROM \"{}\" WHERE {} = ANY(VALUES {})",
            field_list,
            table,
            sql::quote_identifier(id_field),
            placeholders
        );
        if !sort.is_empty() {
            let order = sort
                .iter()
                .map(|term| format!("{} {}", sql::quote_identifier(&term.field), term.direction))
                .collect::<Vec<_>>()
                .join(", ");
            statement.push_str(" ORDER BY ");
            statement.push_str(&order);
        }
        statement
    };

    if !sql::is_single_statement(&statement) {
        return Err(Error::new(ErrorKind::Query(
            "Query is not a single statement.".to_string(),
        )));
    }

    debug!(sql = %statement, values = ids.len(), "Built fetch statement");
    Ok(FetchSpec {
        sql: statement,
        values: ids.to_vec(),
    })
}

/// Runs searches and translates their results into [`FetchSpec`]s.
#[derive(Debug, Clone)]
pub struct FetchTranslator {
    client: SolrClient,
    id_field: String,
}

impl FetchTranslator {
    /// `id_field` is the relational column matching the search engine's
    /// identifier field.
    pub fn new(client: SolrClient, id_field: impl Into<String>) -> Self {
        Self {
            client,
            id_field: id_field.into(),
        }
    }

    pub fn client(&self) -> &SolrClient {
        &self.client
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Run `query` and build the statement fetching the matched rows of
    /// `resource_id`, ordered by `sort`.
    #[instrument(skip(self, query, fields, sort), fields(id_field = %self.id_field))]
    pub async fn fetch(
        &self,
        resource_id: &str,
        query: &SolrQuery,
        fields: Option<&[String]>,
        sort: &[SortTerm],
    ) -> Result<FetchResult> {
        let result = self.client.search(query).await?;
        let fetch = build_fetch_spec(resource_id, &self.id_field, fields, sort, &result.docs)?;

        Ok(FetchResult {
            total: result.total,
            fetch,
            stats: result.stats,
            facets: result.facets,
            next_cursor: result.next_cursor,
        })
    }
}
