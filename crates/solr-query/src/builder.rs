//! Datastore search request to Solr query translation.
//!
//! # Example
//!
//! ```rust
//! use datasolr_query::{FieldCatalog, QueryBuilder, SearchRequest};
//! use datasolr_client::QueryOperator;
//!
//! let catalog = FieldCatalog::from_types([("field1", "text"), ("field2", "text")]);
//! let builder = QueryBuilder::new(catalog);
//!
//! let request = SearchRequest::new("R").with_filter("field1", "value 1");
//! let query = builder.build(&request).unwrap();
//!
//! assert_eq!(query.render_q(QueryOperator::And).unwrap(), "field1:value\\ 1");
//! assert_eq!(query.params.get("sort"), Some("_id ASC"));
//! assert_eq!(query.params.get("rows"), Some("100"));
//! ```

use datasolr_client::{SolrParams, SolrQuery, DEFAULT_ID_FIELD};
use tracing::debug;

use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::mapper::FieldMapper;
use crate::request::{FilterValue, Filters, FullText, Paging, SearchRequest};
use crate::words::split_words;

/// Catch-all clause used when a request has no criteria.
pub const MATCH_ALL: &str = "*:*";

/// Solr field holding the concatenated text of a document.
pub const FULLTEXT_FIELD: &str = "_fulltext";

/// Default number of buckets per facet.
pub const DEFAULT_FACET_LIMIT: u64 = 20;

/// Builds a [`SolrQuery`] from a [`SearchRequest`] against the fields of
/// one resource.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    catalog: FieldCatalog,
    solr_id_field: String,
    solr_resource_id_field: Option<String>,
    mapper: FieldMapper,
}

impl QueryBuilder {
    pub fn new(catalog: FieldCatalog) -> Self {
        Self {
            catalog,
            solr_id_field: DEFAULT_ID_FIELD.to_string(),
            solr_resource_id_field: None,
            mapper: FieldMapper::default(),
        }
    }

    /// Solr field used for the default sort.
    pub fn with_solr_id_field(mut self, field: impl Into<String>) -> Self {
        self.solr_id_field = field.into();
        self
    }

    /// Solr field holding the resource id. When set, every query is
    /// restricted to the requested resource; leave unset for cores that
    /// hold a single resource.
    pub fn with_resource_id_field(mut self, field: Option<String>) -> Self {
        self.solr_resource_id_field = field;
        self
    }

    pub fn with_field_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn field_mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    pub fn solr_id_field(&self) -> &str {
        &self.solr_id_field
    }

    /// Remove every catalog field from `filters` and from a field-keyed `q`.
    ///
    /// A plain-text `q` is always dropped, since prose cannot be checked
    /// against the catalog. What is returned is whatever was not
    /// recognised.
    pub fn validate(&self, q: Option<FullText>, mut filters: Filters) -> (Option<FullText>, Filters) {
        let mut q = match q {
            Some(FullText::Fields(map)) => Some(map),
            Some(FullText::Plain(_)) | None => None,
        };

        for field in self.catalog.names() {
            filters.remove(field);
            if let Some(map) = q.as_mut() {
                map.remove(field);
            }
        }

        (q.map(FullText::Fields), filters)
    }

    /// Build the query for `request`.
    pub fn build(&self, request: &SearchRequest) -> Result<SolrQuery> {
        self.build_with(request, &SolrParams::new())
    }

    /// Build the query for `request`, then merge `additional` on top.
    /// Keys in `additional` replace the computed ones.
    pub fn build_with(&self, request: &SearchRequest, additional: &SolrParams) -> Result<SolrQuery> {
        let distinct = request.distinct_field()?;

        let (clauses, values) = self.clauses(request);
        let mut query = SolrQuery::from_clauses(clauses, values);
        let params = &mut query.params;

        params.set("rows", request.limit);
        match &request.paging {
            Paging::Offset(offset) => {
                params.set("start", offset);
            }
            Paging::Cursor(cursor) => {
                params.set("cursorMark", cursor);
            }
        }

        params.set("sort", self.sort_param(request));

        if let Some(field) = distinct {
            params
                .set("group", "true")
                .set("group.field", self.mapper.map(field))
                .set("group.main", "true");
        }

        if !request.facets.is_empty() {
            params
                .set("facet", "true")
                .set_all(
                    "facet.field",
                    request.facets.fields.iter().map(|f| self.mapper.map(f)),
                )
                .set(
                    "facet.limit",
                    request.facets.limit.unwrap_or(DEFAULT_FACET_LIMIT),
                )
                .set("facet.mincount", 1);
            for (field, limit) in &request.facets.field_limits {
                params.set(format!("f.{}.facet.limit", self.mapper.map(field)), limit);
            }
        }

        if !request.stats_fields.is_empty() {
            params.set("stats", "true").set_all(
                "stats.field",
                request.stats_fields.iter().map(|f| self.mapper.map(f)),
            );
        }

        params.merge(additional);

        debug!(resource_id = %request.resource_id, q = ?query.q, "Built Solr query");
        Ok(query)
    }

    fn sort_param(&self, request: &SearchRequest) -> String {
        if request.sort.is_empty() {
            return format!("{} ASC", self.solr_id_field);
        }
        request
            .sort
            .iter()
            .map(|term| format!("{} {}", self.mapper.map(&term.field), term.direction))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Clause templates and their values, in matching order.
    fn clauses(&self, request: &SearchRequest) -> (Vec<String>, Vec<String>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        for field in self.catalog.names() {
            let Some(filter) = request.filters.get(field) else {
                continue;
            };
            let template = format!("{}:{{}}", self.template_field(field));
            let field_values = filter.values();
            match field_values.as_slice() {
                [] => {}
                [single] if matches!(filter, FilterValue::Single(_)) => {
                    clauses.push(template);
                    values.push(single.to_string());
                }
                many => {
                    let group = vec![template; many.len()].join(" OR ");
                    clauses.push(format!("({})", group));
                    values.extend(many.iter().map(|v| v.to_string()));
                }
            }
        }

        match &request.q {
            Some(FullText::Plain(text)) => {
                for word in split_words(text, true) {
                    clauses.push(format!("{}:{{}}", FULLTEXT_FIELD));
                    values.push(word);
                }
            }
            Some(FullText::Fields(terms)) => {
                for field in self.catalog.names() {
                    let Some(term) = terms.get(field) else {
                        continue;
                    };
                    let term = term.strip_suffix(":*").unwrap_or(term);
                    clauses.push(format!("{}:*{{}}*", self.template_field(field)));
                    values.push(term.to_string());
                }
            }
            None => {}
        }

        if let Some(resource_field) = &self.solr_resource_id_field {
            clauses.push(format!("{}:{{}}", escape_braces(resource_field)));
            values.push(request.resource_id.clone());
        }

        if clauses.is_empty() {
            clauses.push(MATCH_ALL.to_string());
        }

        (clauses, values)
    }

    /// Mapped field name, safe to place in a placeholder template.
    fn template_field(&self, field: &str) -> String {
        escape_braces(&self.mapper.map(field))
    }
}

fn escape_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}
