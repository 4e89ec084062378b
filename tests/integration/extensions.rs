use std::sync::{Arc, Mutex};

use datasolr::query::{FieldCatalog, SearchRequest};
use datasolr::{DatastoreSolrSearch, Result, SearchContext, SearchExtension, SearchPlan};
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    catalog_provider, resource_config, solr_body, MockExecutor, RESOURCE_ID, SELECT_PATH,
};

/// Claims `year_between: [from, to]` and turns it into a range filter.
struct YearRange {
    seen: Arc<Mutex<Vec<String>>>,
}

impl SearchExtension for YearRange {
    fn name(&self) -> &str {
        "year_range"
    }

    fn validate(
        &self,
        _context: &SearchContext,
        mut working: Map<String, Value>,
        catalog: &FieldCatalog,
    ) -> Map<String, Value> {
        if catalog.contains("year") {
            working.remove("year_between");
        }
        working
    }

    fn search(
        &self,
        _context: &SearchContext,
        request: &SearchRequest,
        _catalog: &FieldCatalog,
        mut plan: SearchPlan,
    ) -> Result<SearchPlan> {
        // The built-in extension has already laid out the baseline query.
        if let Some(rows) = plan.query.params.get("rows") {
            self.seen.lock().unwrap().push(format!("rows={rows}"));
        }
        if let Some(Value::Array(bounds)) = request.extras.get("year_between") {
            if let [from, to] = bounds.as_slice() {
                plan.query
                    .params
                    .append("fq", format!("year:[{} TO {}]", from, to));
            }
        }
        plan.fields.retain(|f| f != "collected");
        Ok(plan)
    }
}

/// Overrides computed parameters through the plan's additional params.
struct SmallPages;

impl SearchExtension for SmallPages {
    fn name(&self) -> &str {
        "small_pages"
    }

    fn search(
        &self,
        _context: &SearchContext,
        _request: &SearchRequest,
        _catalog: &FieldCatalog,
        mut plan: SearchPlan,
    ) -> Result<SearchPlan> {
        plan.additional.set("rows", 5);
        Ok(plan)
    }
}

#[tokio::test]
async fn test_extension_claims_parameter_and_extends_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("fq", "year:[1990 TO 2000]"))
        .and(query_param("rows", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(1, &[7])))
        .expect(1)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let executor = MockExecutor::default();
    let mut search = DatastoreSolrSearch::new(
        resource_config(&server),
        json!({"resource_id": RESOURCE_ID, "year_between": [1990, 2000]}),
        catalog_provider(),
        executor.clone(),
    )
    .with_extension(YearRange { seen: seen.clone() })
    .with_extension(SmallPages);

    search.validate().await.unwrap();
    search.fetch().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["rows=100".to_string()]);
    let executed = executor.executed();
    assert!(executed[0].0.starts_with("SELECT \"_id\",\"field1\",\"field2\",\"year\" FROM"));
}

#[tokio::test]
async fn test_unclaimed_parameter_without_extension_fails() {
    let server = MockServer::start().await;
    let executor = MockExecutor::default();
    let mut search = DatastoreSolrSearch::new(
        resource_config(&server),
        json!({"resource_id": RESOURCE_ID, "year_between": [1990, 2000]}),
        catalog_provider(),
        executor,
    );

    let err = search.validate().await.unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(
        errors.get("year_between"),
        Some(&["invalid value \"1990\"".to_string()][..])
    );
}
