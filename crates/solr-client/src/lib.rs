//! # datasolr-client
//!
//! Solr search client and query-safety primitives for datasolr.
//!
//! This crate provides:
//! - Term escaping for Solr query syntax
//! - SQL safety helpers for the relational fetch statement
//! - The Solr query model with `{}` placeholder rendering
//! - A search client that returns total count, documents, stats, facets
//!   and the next cursor mark
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Query Layer                              │
//! │  (datasolr-query: builder, fetch translator)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SolrClient                               │
//! │  - Renders q from clause templates and escaped values       │
//! │  - Forces wt=json, defaults fl to the id field              │
//! │  - Parses numFound / docs / stats / nextCursorMark          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SolrHttpClient                           │
//! │  - Raw HTTP with compression, no retry                      │
//! │  - Solr error body extraction                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use datasolr_client::{SolrClient, SolrQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), datasolr_client::Error> {
//!     let solr = SolrClient::new("http://localhost:8080/solr/specimen_collection/select")?;
//!
//!     let query = SolrQuery::from_clauses(
//!         vec!["_fulltext:{}".into(), "scientificName:{}".into()],
//!         vec!["himalaya".into(), "carrot".into()],
//!     );
//!     let result = solr.search(&query).await?;
//!     println!("{} matches, first page: {:?}", result.total, result.docs);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod query;
mod request;
mod response;
mod solr;
pub mod security;

pub use client::SolrHttpClient;
pub use config::{SolrClientConfig, SolrClientConfigBuilder, DEFAULT_ID_FIELD};
pub use error::{Error, ErrorKind, Result};
pub use query::{fill_placeholders, QueryBase, QueryOperator, QueryTemplate, SolrParams, SolrQuery};
pub use request::{RequestBuilder, RequestMethod, MAX_GET_QUERY_LENGTH};
pub use response::{Response, ResponseExt};
pub use solr::{extract_ids, SearchResult, SolrClient, SolrDocument};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("datasolr/", env!("CARGO_PKG_VERSION"));
