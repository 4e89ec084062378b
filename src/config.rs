//! Per-resource search settings.
//!
//! Settings are keyed by resource id. A `_defaults` entry, when present, is
//! merged under every other entry, so shared values only need writing once:
//!
//! ```json
//! {
//!   "resources": {
//!     "_defaults": {"search_url": "http://localhost:8983/solr/specimens/select"},
//!     "a1b2c3d4-0000-4e5f-9abc-def012345678": {"solr_resource_id_field": "resource_id"}
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use datasolr_client::{QueryOperator, SolrClientConfig, DEFAULT_ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};

/// Key of the entry merged under every resource.
pub const DEFAULTS_KEY: &str = "_defaults";

/// Search settings of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Solr search handler, e.g. `http://localhost:8983/solr/core/select`.
    pub search_url: String,
    /// Relational column joining rows to search results.
    pub id_field: String,
    /// Solr field holding the row identifier.
    pub solr_id_field: String,
    /// Solr field holding the resource id, for cores shared by several
    /// resources.
    pub solr_resource_id_field: Option<String>,
    /// Registered name of the field mapper; the default mapper when unset.
    pub field_mapper: Option<String>,
    /// Operator joining query clauses.
    pub query_operator: QueryOperator,
    /// Search request timeout in seconds; the client default when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            search_url: String::new(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            solr_id_field: DEFAULT_ID_FIELD.to_string(),
            solr_resource_id_field: None,
            field_mapper: None,
            query_operator: QueryOperator::And,
            timeout_secs: None,
        }
    }
}

impl ResourceConfig {
    pub fn new(search_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
            ..Self::default()
        }
    }

    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn with_solr_id_field(mut self, field: impl Into<String>) -> Self {
        self.solr_id_field = field.into();
        self
    }

    pub fn with_solr_resource_id_field(mut self, field: impl Into<String>) -> Self {
        self.solr_resource_id_field = Some(field.into());
        self
    }

    pub fn with_field_mapper(mut self, name: impl Into<String>) -> Self {
        self.field_mapper = Some(name.into());
        self
    }

    pub fn with_query_operator(mut self, operator: QueryOperator) -> Self {
        self.query_operator = operator;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Client configuration for this resource's search handler.
    pub fn client_config(&self) -> SolrClientConfig {
        let mut builder = SolrClientConfig::builder()
            .with_id_field(self.solr_id_field.clone())
            .with_query_operator(self.query_operator);
        if let Some(secs) = self.timeout_secs {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    fn check(&self, resource_id: &str) -> Result<()> {
        if self.search_url.trim().is_empty() {
            return Err(Error::new(ErrorKind::Config(format!(
                "No search_url configured for resource {}",
                resource_id
            ))));
        }
        Ok(())
    }
}

/// Search settings of every resource served by datasolr.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSolrSettings {
    pub resources: BTreeMap<String, ResourceConfig>,
}

#[derive(Deserialize)]
struct RawSettings {
    #[serde(default)]
    resources: Map<String, Value>,
}

impl DataSolrSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>, config: ResourceConfig) -> Self {
        self.resources.insert(resource_id.into(), config);
        self
    }

    /// Parse settings from JSON, merging `_defaults` under every resource.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawSettings = serde_json::from_str(json)?;
        let mut entries = raw.resources;
        let defaults = match entries.remove(DEFAULTS_KEY) {
            Some(Value::Object(defaults)) => defaults,
            Some(_) => {
                return Err(Error::new(ErrorKind::Config(format!(
                    "{} must be an object",
                    DEFAULTS_KEY
                ))))
            }
            None => Map::new(),
        };

        let mut resources = BTreeMap::new();
        for (resource_id, entry) in entries {
            let Value::Object(entry) = entry else {
                return Err(Error::new(ErrorKind::Config(format!(
                    "settings for resource {} must be an object",
                    resource_id
                ))));
            };
            let mut merged = defaults.clone();
            merged.extend(entry);
            let config: ResourceConfig = serde_json::from_value(Value::Object(merged))?;
            config.check(&resource_id)?;
            resources.insert(resource_id, config);
        }

        Ok(Self { resources })
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Whether searches on `resource_id` should be routed to datasolr.
    pub fn is_datasolr_resource(&self, resource_id: &str) -> bool {
        self.resources.contains_key(resource_id)
    }

    /// Settings of `resource_id`.
    pub fn resource(&self, resource_id: &str) -> Result<&ResourceConfig> {
        self.resources.get(resource_id).ok_or_else(|| {
            Error::new(ErrorKind::Config(format!(
                "Resource {} is not configured for datasolr",
                resource_id
            )))
        })
    }
}
