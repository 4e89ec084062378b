use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use datasolr::query::{FieldCatalog, FieldDef};
use datasolr::{Error, ErrorKind, FieldCatalogProvider, ResourceConfig, Result, Row, RowExecutor};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resource id used throughout; survives table name sanitizing unchanged.
pub const RESOURCE_ID: &str = "b4c1e7d2-aaaa-4bbb-8ccc-0123456789ab";

pub const SELECT_PATH: &str = "/solr/specimens/select";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Schema source backed by a fixed table list.
#[derive(Clone, Default)]
pub struct MockCatalog {
    tables: BTreeMap<String, FieldCatalog>,
    aliases: BTreeMap<String, String>,
}

impl MockCatalog {
    pub fn with_table(mut self, name: &str, catalog: FieldCatalog) -> Self {
        self.tables.insert(name.to_string(), catalog);
        self
    }

    pub fn with_alias(mut self, alias: &str, table: &str) -> Self {
        self.aliases.insert(alias.to_string(), table.to_string());
        self
    }
}

impl FieldCatalogProvider for MockCatalog {
    async fn resolve_alias(&self, resource_id: &str) -> Result<String> {
        if let Some(table) = self.aliases.get(resource_id) {
            return Ok(table.clone());
        }
        if self.tables.contains_key(resource_id) {
            return Ok(resource_id.to_string());
        }
        Err(Error::new(ErrorKind::NotFound(format!(
            "Resource \"{}\" was not found.",
            resource_id
        ))))
    }

    async fn get_fields(&self, resource_id: &str) -> Result<FieldCatalog> {
        self.tables.get(resource_id).cloned().ok_or_else(|| {
            Error::new(ErrorKind::NotFound(format!(
                "Resource \"{}\" was not found.",
                resource_id
            )))
        })
    }
}

/// Relational store double: returns canned rows, records every statement
/// and counts closes.
#[derive(Clone, Default)]
pub struct MockExecutor {
    rows: Vec<Row>,
    fail: bool,
    pub statements: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    pub closes: Arc<AtomicUsize>,
}

impl MockExecutor {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.lock().unwrap().clone()
    }
}

impl RowExecutor for MockExecutor {
    async fn execute(&self, sql: &str, values: &[Value]) -> Result<Vec<Row>> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), values.to_vec()));
        if self.fail {
            return Err(Error::new(ErrorKind::Collaborator(
                "connection reset".to_string(),
            )));
        }
        Ok(self.rows.clone())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// The specimen table used by most tests.
pub fn specimen_catalog() -> FieldCatalog {
    FieldCatalog::new([
        FieldDef::new("_id", "int"),
        FieldDef::new("field1", "text"),
        FieldDef::new("field2", "text"),
        FieldDef::new("year", "int"),
        FieldDef::new("collected", "date"),
        FieldDef::new("_fulltext", "text").with_stored(false),
    ])
}

pub fn catalog_provider() -> MockCatalog {
    MockCatalog::default()
        .with_table(RESOURCE_ID, specimen_catalog())
        .with_alias("specimens", RESOURCE_ID)
}

pub fn resource_config(server: &MockServer) -> ResourceConfig {
    ResourceConfig::new(format!("{}{}", server.uri(), SELECT_PATH))
}

/// A Solr JSON response listing `ids` out of `total` matches.
pub fn solr_body(total: u64, ids: &[i64]) -> Value {
    let docs: Vec<Value> = ids.iter().map(|id| json!({"_id": id})).collect();
    json!({
        "responseHeader": {"status": 0, "QTime": 1},
        "response": {"numFound": total, "start": 0, "docs": docs}
    })
}

/// Answer every search with `body`.
pub async fn mount_solr(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
