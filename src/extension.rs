//! Search extensions.
//!
//! Extensions run in registration order, the built-in [`DefaultExtension`]
//! always first. During validation each one removes the parameters it
//! understands from a working copy of the request; whatever is left at the
//! end is rejected. During search each one receives the [`SearchPlan`] as
//! left by the previous extensions and returns it, possibly modified.

use std::collections::BTreeMap;

use datasolr_client::{SolrParams, SolrQuery};
use datasolr_query::{
    FieldCatalog, FieldMapper, FilterValue, Filters, FullText, QueryBuilder, SearchRequest,
    SortTerm,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ResourceConfig;
use crate::error::Result;

/// Caller information passed to every hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchContext {
    /// Name of the calling user, if any.
    pub user: Option<String>,
    /// Host specific values.
    pub values: BTreeMap<String, Value>,
}

impl SearchContext {
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// What will be sent to Solr and fetched from the relational store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPlan {
    /// The Solr query.
    pub query: SolrQuery,
    /// Parameters merged over `query.params` once every extension has run.
    pub additional: SolrParams,
    /// Columns to fetch, in output order.
    pub fields: Vec<String>,
    /// Relational ORDER BY.
    pub sort: Vec<SortTerm>,
}

/// A participant in request validation and query building.
pub trait SearchExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Remove every parameter this extension understands from `working`.
    fn validate(
        &self,
        _context: &SearchContext,
        working: Map<String, Value>,
        _catalog: &FieldCatalog,
    ) -> Map<String, Value> {
        working
    }

    /// Adjust the plan for `request`.
    fn search(
        &self,
        _context: &SearchContext,
        _request: &SearchRequest,
        _catalog: &FieldCatalog,
        plan: SearchPlan,
    ) -> Result<SearchPlan> {
        Ok(plan)
    }
}

/// Parameters the built-in extension always accepts.
const SCALAR_PARAMS: &[&str] = &[
    "cursor",
    "facets_limit",
    "indexed_only",
    "limit",
    "offset",
];

/// The built-in extension: catalog-based validation and query building.
#[derive(Debug, Clone)]
pub struct DefaultExtension {
    config: ResourceConfig,
    mapper: FieldMapper,
}

impl DefaultExtension {
    pub const NAME: &'static str = "datasolr";

    pub fn new(config: ResourceConfig, mapper: FieldMapper) -> Self {
        Self { config, mapper }
    }

    fn builder(&self, catalog: FieldCatalog) -> QueryBuilder {
        QueryBuilder::new(catalog)
            .with_solr_id_field(self.config.solr_id_field.clone())
            .with_resource_id_field(self.config.solr_resource_id_field.clone())
            .with_field_mapper(self.mapper.clone())
    }
}

impl SearchExtension for DefaultExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(
        &self,
        _context: &SearchContext,
        mut working: Map<String, Value>,
        catalog: &FieldCatalog,
    ) -> Map<String, Value> {
        let indexed = catalog.indexed();

        // Output fields come from the relational store; everything else is
        // searched and so must be indexed.
        retain_unknown(&mut working, "fields", catalog);
        for key in ["sort", "facets", "solr_stats_fields"] {
            retain_unknown(&mut working, key, &indexed);
        }

        // A named distinct field must be searchable.
        let distinct_known = match working.get("distinct") {
            Some(Value::String(field)) => indexed.contains(field),
            _ => true,
        };
        if distinct_known {
            working.remove("distinct");
        }

        if let Some(Value::Object(limits)) = working.get_mut("facets_field_limit") {
            limits.retain(|field, _| !indexed.contains(field));
        }

        let filters = match working.remove("filters") {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(k, v)| FilterValue::from_json(&v).map(|f| (k, f)))
                .collect(),
            _ => Filters::new(),
        };
        let q = working
            .remove("q")
            .and_then(|q| serde_json::from_value::<FullText>(q).ok());

        let (q, filters) = self.builder(indexed).validate(q, filters);
        if !filters.is_empty() {
            working.insert(
                "filters".into(),
                serde_json::to_value(filters).unwrap_or(Value::Null),
            );
        }
        if let Some(q) = q {
            working.insert("q".into(), serde_json::to_value(q).unwrap_or(Value::Null));
        }

        for key in SCALAR_PARAMS {
            working.remove(*key);
        }
        working
    }

    fn search(
        &self,
        _context: &SearchContext,
        request: &SearchRequest,
        catalog: &FieldCatalog,
        mut plan: SearchPlan,
    ) -> Result<SearchPlan> {
        let mut request = request.clone();
        if request.cursor().is_some() {
            // Cursor paging needs a stable sort on the unique key; the
            // builder's default sort is exactly that.
            request.sort.clear();
            plan.sort = vec![SortTerm::asc(self.config.id_field.clone())];
        } else {
            plan.sort = request.sort.clone();
        }

        plan.query = self.builder(catalog.indexed()).build(&request)?;
        plan.fields = request.fields.clone();

        debug!(extension = Self::NAME, params = ?plan.query.params, "Built search plan");
        Ok(plan)
    }
}

/// Drop from the list at `key` every entry naming a catalog field.
fn retain_unknown(working: &mut Map<String, Value>, key: &str, catalog: &FieldCatalog) {
    if let Some(Value::Array(items)) = working.get_mut(key) {
        items.retain(|item| !item.as_str().is_some_and(|name| catalog.contains(name)));
    }
}
