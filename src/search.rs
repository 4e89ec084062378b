//! The datastore search orchestrator.
//!
//! [`DatastoreSolrSearch`] serves one request end to end:
//!
//! ```text
//! Created --validate()--> Validated --fetch()--> Fetched
//! ```
//!
//! `validate()` checks the raw parameters, resolves the resource and its
//! fields, and lets every extension claim the parameters it understands.
//! `fetch()` checks access, builds the search plan through the extension
//! chain, runs the Solr search, fetches the matching rows from the
//! relational store and assembles the response. The relational connection
//! is closed when `fetch()` returns, whatever the outcome.
//!
//! ## Example
//!
//! ```rust,ignore
//! use datasolr::{DatastoreSolrSearch, ResourceConfig};
//! use serde_json::json;
//!
//! let config = ResourceConfig::new("http://localhost:8983/solr/specimens/select");
//! let mut search = DatastoreSolrSearch::new(
//!     config,
//!     json!({"resource_id": "b4c1e7d2-aaaa-4bbb-8ccc-0123456789ab", "q": "Daucus carota"}),
//!     catalog_provider,
//!     connection,
//! );
//! search.validate().await?;
//! let response = search.fetch().await?;
//! println!("{} records of {}", response.records.len(), response.total);
//! ```

use datasolr_client::SolrClient;
use datasolr_query::{
    Distinct, FetchTranslator, FieldCatalog, FieldMapper, FieldMapperRegistry, Paging,
    SearchRequest,
};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::collaborators::{
    AccessCheck, AllowAll, ConnectionGuard, FieldCatalogProvider, RowExecutor,
};
use crate::config::ResourceConfig;
use crate::error::{Error, ErrorKind, Result, ValidationErrors};
use crate::extension::{DefaultExtension, SearchContext, SearchExtension, SearchPlan};
use crate::params::parse_request;
use crate::response::{
    field_metadata, format_row, is_visible_field, merge_stats, SearchResponse, BACKEND,
};

/// Action name passed to the access check.
pub const SEARCH_ACTION: &str = "datastore_search";

/// Lifecycle of a [`DatastoreSolrSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Created,
    Validated,
    Fetched,
}

/// One datastore search, from raw parameters to response.
pub struct DatastoreSolrSearch<P, E>
where
    P: FieldCatalogProvider,
    E: RowExecutor,
{
    config: ResourceConfig,
    context: SearchContext,
    raw: Value,
    catalog_provider: P,
    connection: ConnectionGuard<E>,
    access: Box<dyn AccessCheck>,
    mapper: FieldMapper,
    extensions: Vec<Box<dyn SearchExtension>>,
    state: SearchState,
    request: Option<SearchRequest>,
    catalog: Option<FieldCatalog>,
}

impl<P, E> DatastoreSolrSearch<P, E>
where
    P: FieldCatalogProvider,
    E: RowExecutor,
{
    /// Create a search for the raw request parameters `raw`.
    ///
    /// `executor` is owned by the search from here on and is closed exactly
    /// once: when `fetch()` finishes, or when the search is dropped.
    pub fn new(config: ResourceConfig, raw: Value, catalog_provider: P, executor: E) -> Self {
        Self {
            config,
            context: SearchContext::default(),
            raw,
            catalog_provider,
            connection: ConnectionGuard::new(executor),
            access: Box::new(AllowAll),
            mapper: FieldMapper::default(),
            extensions: Vec::new(),
            state: SearchState::Created,
            request: None,
            catalog: None,
        }
    }

    pub fn with_context(mut self, context: SearchContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_access_check(mut self, access: impl AccessCheck + 'static) -> Self {
        self.access = Box::new(access);
        self
    }

    pub fn with_field_mapper(mut self, mapper: FieldMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Use the mapper named in the resource configuration.
    pub fn with_mapper_registry(mut self, registry: &FieldMapperRegistry) -> Result<Self> {
        self.mapper = registry.resolve(self.config.field_mapper.as_deref())?;
        Ok(self)
    }

    /// Append a third-party extension. The built-in extension always runs
    /// before every appended one.
    pub fn with_extension(mut self, extension: impl SearchExtension + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// The validated request, once `validate()` succeeded.
    pub fn request(&self) -> Option<&SearchRequest> {
        self.request.as_ref()
    }

    /// The resource's fields, once `validate()` succeeded.
    pub fn catalog(&self) -> Option<&FieldCatalog> {
        self.catalog.as_ref()
    }

    fn builtin(&self) -> DefaultExtension {
        DefaultExtension::new(self.config.clone(), self.mapper.clone())
    }

    /// Check the request and resolve its resource.
    #[instrument(skip(self), fields(resource_id = tracing::field::Empty))]
    pub async fn validate(&mut self) -> Result<()> {
        if self.state != SearchState::Created {
            return Err(Error::new(ErrorKind::State(
                "validate() can only be called once".to_string(),
            )));
        }

        let parsed = parse_request(&self.raw)?;
        let mut request = parsed.request;
        tracing::Span::current().record("resource_id", request.resource_id.as_str());

        let resource_id = self
            .catalog_provider
            .resolve_alias(&request.resource_id)
            .await?;
        let catalog = self.catalog_provider.get_fields(&resource_id).await?;
        request.resource_id = resource_id.clone();

        if !parsed.fields_given {
            request.fields = catalog
                .stored()
                .names()
                .filter(|name| is_visible_field(name))
                .map(str::to_string)
                .collect();
        }

        if request.distinct == Distinct::OnFields {
            if let [field] = request.fields.as_slice() {
                request.distinct = Distinct::Field(field.clone());
            }
        }

        let mut working = parsed.working;
        working.insert("resource_id".into(), Value::String(resource_id));

        working = self.builtin().validate(&self.context, working, &catalog);
        for extension in &self.extensions {
            working = extension.validate(&self.context, working, &catalog);
        }
        reject_leftovers(&working)?;

        debug!(fields = ?request.fields, "Request validated");
        self.request = Some(request);
        self.catalog = Some(catalog);
        self.state = SearchState::Validated;
        Ok(())
    }

    /// Run the search and fetch the matching rows.
    #[instrument(skip(self))]
    pub async fn fetch(&mut self) -> Result<SearchResponse> {
        match self.state {
            SearchState::Validated => {}
            SearchState::Created => {
                return Err(Error::new(ErrorKind::State(
                    "fetch() called before validate()".to_string(),
                )))
            }
            SearchState::Fetched => {
                return Err(Error::new(ErrorKind::State(
                    "fetch() can only be called once".to_string(),
                )))
            }
        }

        let result = self.run().await;
        self.connection.close();
        self.state = SearchState::Fetched;
        result
    }

    async fn run(&self) -> Result<SearchResponse> {
        let (Some(request), Some(catalog)) = (self.request.as_ref(), self.catalog.as_ref()) else {
            return Err(Error::new(ErrorKind::State(
                "validated request is missing".to_string(),
            )));
        };

        self.access
            .check_access(SEARCH_ACTION, &self.context, request)?;

        let mut plan = self
            .builtin()
            .search(&self.context, request, catalog, SearchPlan::default())?;
        for extension in &self.extensions {
            plan = extension.search(&self.context, request, catalog, plan)?;
        }
        let SearchPlan {
            mut query,
            additional,
            fields,
            sort,
        } = plan;
        query.params.merge(&additional);

        let client = SolrClient::with_config(&self.config.search_url, self.config.client_config())?;
        let translator = FetchTranslator::new(client, self.config.id_field.clone());
        let found = translator
            .fetch(&request.resource_id, &query, Some(fields.as_slice()), &sort)
            .await?;

        let rows = self
            .connection
            .executor()
            .execute(&found.fetch.sql, &found.fetch.values)
            .await?;
        let records: Vec<_> = rows
            .into_iter()
            .map(|row| format_row(row, &fields, catalog))
            .collect();

        // numFound counts documents, not groups; an empty grouped result
        // reports zero so callers stop paging.
        let grouped = query.params.contains("group.field");
        let total = if grouped && found.fetch.values.is_empty() {
            0
        } else {
            found.total
        };

        let mut field_info = field_metadata(catalog, request.indexed_only);
        if let Some(stats) = &found.stats {
            merge_stats(&mut field_info, stats, catalog, &self.mapper);
        }

        info!(
            resource_id = %request.resource_id,
            total,
            records = records.len(),
            "Search completed"
        );

        Ok(SearchResponse {
            resource_id: request.resource_id.clone(),
            filters: request.filters.clone(),
            q: request.q.clone(),
            limit: request.limit,
            offset: match request.paging {
                Paging::Offset(offset) => Some(offset),
                Paging::Cursor(_) => None,
            },
            sort: sort.clone(),
            fields: field_info,
            total,
            records,
            backend: BACKEND.to_string(),
            facets: found.facets,
            next_cursor: found.next_cursor,
        })
    }
}

/// Fail on the first parameter no extension claimed.
///
/// Empty values (null, false, zero, empty strings, lists and objects) do not
/// count. The message names the offending value: a string itself, the first
/// entry of a list, or the first key of an object.
fn reject_leftovers(working: &Map<String, Value>) -> Result<()> {
    for (key, value) in working {
        if key == "resource_id" || is_empty_value(value) {
            continue;
        }
        let shown = match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items.first().map(display_value).unwrap_or_default(),
            Value::Object(map) => map.keys().next().cloned().unwrap_or_default(),
            other => display_value(other),
        };
        let mut errors = ValidationErrors::new();
        errors.add(key.clone(), format!("invalid value \"{}\"", shown));
        return errors.into_result();
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
