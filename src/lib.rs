//! # datasolr
//!
//! Datastore search backed by Solr: the search index answers the query, the
//! relational store supplies the rows.
//!
//! A search runs in two steps. Solr is asked for the identifiers of the
//! matching documents, honouring filters, full-text terms, sorting, paging,
//! grouping, facets and statistics. Those identifiers then become a single
//! parameterised `SELECT` against the resource's table, ordered the same
//! way, and the rows come back typed according to the resource's fields.
//!
//! ## Crates
//!
//! - **datasolr-client** - Solr HTTP client, query model and input sanitizing
//! - **datasolr-query** - Request model, query building and fetch translation
//!
//! This crate adds request validation, configuration, the extension hooks
//! and the [`DatastoreSolrSearch`] orchestrator.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datasolr::{DataSolrSettings, DatastoreSolrSearch};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = DataSolrSettings::from_file("datasolr.json")?;
//!     let resource_id = "b4c1e7d2-aaaa-4bbb-8ccc-0123456789ab";
//!
//!     let mut search = DatastoreSolrSearch::new(
//!         settings.resource(resource_id)?.clone(),
//!         json!({
//!             "resource_id": resource_id,
//!             "filters": {"country": "UK"},
//!             "q": "Daucus carota",
//!             "limit": 10
//!         }),
//!         catalog_provider,
//!         connection,
//!     );
//!     search.validate().await?;
//!     let response = search.fetch().await?;
//!
//!     for record in &response.records {
//!         println!("{}", record["_id"]);
//!     }
//!     Ok(())
//! }
//! ```

pub mod collaborators;
pub mod config;
pub mod error;
pub mod extension;
pub mod params;
pub mod response;
pub mod search;

// Re-export the member crates for convenient access
pub use datasolr_client as client;
pub use datasolr_query as query;

pub use collaborators::{AccessCheck, AllowAll, FieldCatalogProvider, RequireUser, Row, RowExecutor};
pub use config::{DataSolrSettings, ResourceConfig, DEFAULTS_KEY};
pub use error::{Error, ErrorKind, Result, ValidationErrors};
pub use extension::{DefaultExtension, SearchContext, SearchExtension, SearchPlan};
pub use params::{parse_request, ParsedRequest};
pub use response::{FieldInfo, SearchResponse, BACKEND};
pub use search::{DatastoreSolrSearch, SearchState, SEARCH_ACTION};
