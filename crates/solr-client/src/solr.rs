//! Search handler client.
//!
//! [`SolrClient`] sends a [`SolrQuery`] to a Solr search handler and
//! normalizes the JSON response into a [`SearchResult`]: the reported
//! total, the documents (passed through a formatter), and the optional
//! statistics, facet and cursor blocks.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument};

use crate::client::SolrHttpClient;
use crate::config::SolrClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::query::SolrQuery;
use crate::request::RequestBuilder;
use crate::security;

/// A single document as returned by Solr.
pub type SolrDocument = Map<String, Value>;

/// Normalized search response.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<T> {
    /// `numFound` as reported. When the request used grouping this counts
    /// the matching documents, not the groups.
    pub total: u64,
    /// The documents, as shaped by the formatter.
    pub docs: T,
    /// The `stats` block, if statistics were requested.
    pub stats: Option<Value>,
    /// The `facet_counts` block, if facets were requested.
    pub facets: Option<Value>,
    /// `nextCursorMark`, when cursor paging is in use.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    response: RawDocList,
    #[serde(default)]
    stats: Option<Value>,
    #[serde(default)]
    facet_counts: Option<Value>,
    #[serde(default, rename = "nextCursorMark")]
    next_cursor_mark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocList {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<SolrDocument>,
}

/// Client for a single Solr search handler, e.g.
/// `http://localhost:8983/solr/collection/select`.
#[derive(Debug, Clone)]
pub struct SolrClient {
    http: SolrHttpClient,
    search_url: url::Url,
}

impl SolrClient {
    /// Create a client with the default configuration. Any query string or
    /// fragment on `search_url` is dropped.
    pub fn new(search_url: &str) -> Result<Self> {
        Self::with_config(search_url, SolrClientConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(search_url: &str, config: SolrClientConfig) -> Result<Self> {
        let search_url = security::url::search_endpoint(search_url)?;
        let http = SolrHttpClient::new(config)?;
        Ok(Self { http, search_url })
    }

    pub fn search_url(&self) -> &url::Url {
        &self.search_url
    }

    /// The identifier field requested from Solr.
    pub fn id_field(&self) -> &str {
        &self.http.config().id_field
    }

    pub fn config(&self) -> &SolrClientConfig {
        self.http.config()
    }

    /// Flatten `query` into the wire parameters: `wt=json`, `fl` (the id
    /// field unless the query sets it), the rendered `q`, then everything
    /// else.
    pub fn wire_params(&self, query: &SolrQuery) -> Result<Vec<(String, String)>> {
        let mut params = query.params.clone();
        params.set("wt", "json");
        params.set_default("fl", self.id_field());
        params.set("q", query.render_q(self.config().query_operator)?);
        Ok(params.to_pairs())
    }

    /// Run `query` and return the identifiers of the matching documents.
    pub async fn search(&self, query: &SolrQuery) -> Result<SearchResult<Vec<Value>>> {
        self.search_with(query, extract_ids).await
    }

    /// Run `query`, passing the id field name and the raw documents to
    /// `formatter`.
    ///
    /// Failures are logged and returned as-is; nothing is retried.
    #[instrument(skip(self, query, formatter), fields(url = %self.search_url))]
    pub async fn search_with<T, F>(&self, query: &SolrQuery, formatter: F) -> Result<SearchResult<T>>
    where
        F: FnOnce(&str, Vec<SolrDocument>) -> Result<T>,
    {
        let params = self.wire_params(query)?;

        if self.config().enable_tracing {
            debug!(params = ?params, "Executing Solr search");
        }

        let request = RequestBuilder::search(self.search_url.as_str(), params);
        let raw: RawSearchResponse = match self.http.send_json(request).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(
                    q = ?query.q,
                    params = ?query.params,
                    error = %err,
                    "Solr search failed"
                );
                return Err(err);
            }
        };

        let docs = formatter(self.id_field(), raw.response.docs)?;

        Ok(SearchResult {
            total: raw.response.num_found,
            docs,
            stats: raw.stats,
            facets: raw.facet_counts,
            next_cursor: raw.next_cursor_mark,
        })
    }
}

/// Default formatter: the value of the id field of every document.
pub fn extract_ids(id_field: &str, docs: Vec<SolrDocument>) -> Result<Vec<Value>> {
    docs.into_iter()
        .map(|mut doc| {
            doc.remove(id_field).ok_or_else(|| {
                Error::new(ErrorKind::Json(format!(
                    "Solr document is missing the '{}' field",
                    id_field
                )))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryOperator, SolrQuery};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SolrClient {
        SolrClient::new(&format!("{}/solr/core/select?wt=xml", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_ids() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/solr/core/select"))
            .and(query_param("wt", "json"))
            .and(query_param("fl", "_id"))
            .and(query_param("q", "field1:value\\ 1 AND field2:value\\ 2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 12, "docs": [{"_id": 1}, {"_id": 2}]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let query = SolrQuery::from_clauses(
            vec!["field1:{}".into(), "field2:{}".into()],
            vec!["value 1".into(), "value 2".into()],
        );
        let result = client.search(&query).await.unwrap();

        assert_eq!(result.total, 12);
        assert_eq!(result.docs, vec![json!(1), json!(2)]);
        assert!(result.stats.is_none());
        assert!(result.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_search_keeps_explicit_fl_and_operator() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/select"))
            .and(query_param("fl", "_id,name"))
            .and(query_param("q", "a:x OR b:y"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 0, "docs": []}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = SolrClientConfig::builder()
            .with_query_operator(QueryOperator::Or)
            .build();
        let client = SolrClient::with_config(&format!("{}/select", mock_server.uri()), config).unwrap();

        let mut query = SolrQuery::from_clauses(
            vec!["a:{}".into(), "b:{}".into()],
            vec!["x".into(), "y".into()],
        );
        query.params.set("fl", "_id,name");

        let result = client.search(&query).await.unwrap();
        assert_eq!(result.total, 0);
        assert!(result.docs.is_empty());
    }

    #[tokio::test]
    async fn test_search_parses_stats_facets_and_cursor() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/solr/core/select"))
            .and(query_param("cursorMark", "*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 1, "docs": [{"_id": "a"}]},
                "stats": {"stats_fields": {"year": {"min": 1900, "max": 2000}}},
                "facet_counts": {"facet_fields": {"country": ["UK", 3]}},
                "nextCursorMark": "AoE="
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let mut query = SolrQuery::raw("*:*");
        query.params.set("cursorMark", "*");

        let result = client.search(&query).await.unwrap();
        assert_eq!(result.next_cursor.as_deref(), Some("AoE="));
        assert_eq!(result.stats.unwrap()["stats_fields"]["year"]["max"], 2000);
        assert_eq!(result.facets.unwrap()["facet_fields"]["country"][1], 3);
    }

    #[tokio::test]
    async fn test_search_with_custom_formatter() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {"numFound": 2, "docs": [{"_id": "a"}, {"_id": "b"}]}
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client
            .search_with(&SolrQuery::raw("*:*"), |id_field, docs| {
                Ok(format!("{}={}", id_field, docs.len()))
            })
            .await
            .unwrap();

        assert_eq!(result.docs, "_id=2");
    }

    #[tokio::test]
    async fn test_solr_error_is_propagated() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"msg": "undefined field nope", "code": 400}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.search(&SolrQuery::raw("nope:1")).await.unwrap_err();

        assert!(err.is_transport());
        assert!(err.to_string().contains("undefined field nope"));
    }

    #[tokio::test]
    async fn test_malformed_response_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.search(&SolrQuery::raw("*:*")).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_misaligned_template_fails_before_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let query = SolrQuery::from_clauses(vec!["a:{}".into()], vec![]);
        let err = client.search(&query).await.unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn test_extract_ids_requires_id_field() {
        let mut doc = SolrDocument::new();
        doc.insert("other".into(), json!(1));
        let err = extract_ids("_id", vec![doc]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Json(_)));
    }

    #[test]
    fn test_wire_params() {
        let client = SolrClient::new("http://localhost:8983/solr/core/select").unwrap();
        let mut query = SolrQuery::from_clauses(vec!["*:*".into()], vec![]);
        query.params.set("rows", 10).set("wt", "xml");

        let params = client.wire_params(&query).unwrap();
        assert!(params.contains(&("wt".into(), "json".into())));
        assert!(params.contains(&("fl".into(), "_id".into())));
        assert!(params.contains(&("q".into(), "*:*".into())));
        assert!(params.contains(&("rows".into(), "10".into())));
    }
}
