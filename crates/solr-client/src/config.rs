//! Client configuration.

use std::time::Duration;

use crate::query::QueryOperator;

/// Default identifier field requested from Solr (`fl`).
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Configuration for the Solr client.
///
/// Failed searches are never retried; the error goes straight back to the
/// caller.
#[derive(Debug, Clone)]
pub struct SolrClientConfig {
    /// Stored field returned for every matching document.
    pub id_field: String,
    /// Operator used to join a clause list into a single query string.
    pub query_operator: QueryOperator,
    /// Accept gzip/deflate compressed responses.
    pub accept_compressed: bool,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Pool idle timeout.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether to enable request/response tracing.
    pub enable_tracing: bool,
}

impl Default for SolrClientConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            query_operator: QueryOperator::And,
            accept_compressed: true,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: crate::USER_AGENT.to_string(),
            enable_tracing: true,
        }
    }
}

impl SolrClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> SolrClientConfigBuilder {
        SolrClientConfigBuilder::default()
    }
}

/// Builder for SolrClientConfig.
#[derive(Debug, Default)]
pub struct SolrClientConfigBuilder {
    config: SolrClientConfig,
}

impl SolrClientConfigBuilder {
    /// Set the identifier field returned for each document.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.config.id_field = field.into();
        self
    }

    /// Set the operator used to join clause lists.
    pub fn with_query_operator(mut self, operator: QueryOperator) -> Self {
        self.config.query_operator = operator;
        self
    }

    /// Enable or disable compressed responses.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.accept_compressed = enabled;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set pool idle timeout.
    pub fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    pub fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable request/response tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> SolrClientConfig {
        self.config
    }
}
