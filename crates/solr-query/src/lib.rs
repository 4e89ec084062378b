//! # datasolr-query
//!
//! Translation of datastore search requests into Solr queries, and of Solr
//! results into relational fetch statements.
//!
//! ## Features
//!
//! - **Sort parsing** - Quote-aware `field [ASC|DESC], ...` statements
//! - **Word splitting** - Free text to words, keeping quoted phrases whole
//! - **Field mapping** - Pluggable API-to-Solr field name functions
//! - **Query building** - Filters, full text, sort, paging, distinct, facets
//!   and stats as a [`SolrQuery`](datasolr_client::SolrQuery)
//! - **Fetch translation** - Matched ids to a single `SELECT ... ANY(VALUES ...)`
//!   statement
//!
//! ## Example
//!
//! ```rust,ignore
//! use datasolr_client::SolrClient;
//! use datasolr_query::{parse_sort, FetchTranslator, FieldCatalog, QueryBuilder, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), datasolr_query::Error> {
//!     let catalog = FieldCatalog::from_types([("country", "text"), ("year", "int")]);
//!     let builder = QueryBuilder::new(catalog);
//!
//!     let request = SearchRequest::new("b4c1e7d2-aaaa-4bbb-8ccc-0123456789ab")
//!         .with_filter("country", vec!["UK", "France"])
//!         .with_sort(parse_sort("year desc")?);
//!     let query = builder.build(&request)?;
//!
//!     let solr = SolrClient::new("http://localhost:8983/solr/specimens/select")?;
//!     let translator = FetchTranslator::new(solr, "_id");
//!     let result = translator
//!         .fetch(&request.resource_id, &query, None, &request.sort)
//!         .await?;
//!
//!     println!("{} matches: {}", result.total, result.fetch.sql);
//!     Ok(())
//! }
//! ```

mod builder;
mod catalog;
mod error;
mod fetch;
mod mapper;
mod request;
mod sort;
mod words;

pub use builder::{QueryBuilder, DEFAULT_FACET_LIMIT, FULLTEXT_FIELD, MATCH_ALL};
pub use catalog::{FieldCatalog, FieldDef, FieldType};
pub use error::{Error, ErrorKind, Result};
pub use fetch::{build_fetch_spec, FetchResult, FetchSpec, FetchTranslator};
pub use mapper::{default_field_mapper, FieldMapper, FieldMapperRegistry, DEFAULT_MAPPER};
pub use request::{
    scalar_to_string, Distinct, Facets, FilterValue, Filters, FullText, Paging, SearchRequest,
    DEFAULT_LIMIT,
};
pub use sort::{parse_sort, SortDirection, SortTerm};
pub use words::split_words;
