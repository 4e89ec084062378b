use datasolr::{
    DatastoreSolrSearch, ErrorKind, RequireUser, ResourceConfig, SearchContext, SearchState,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    catalog_provider, init_tracing, mount_solr, resource_config, solr_body, MockCatalog,
    MockExecutor, RESOURCE_ID, SELECT_PATH,
};

fn search(
    server: &MockServer,
    raw: Value,
    executor: &MockExecutor,
) -> DatastoreSolrSearch<MockCatalog, MockExecutor> {
    DatastoreSolrSearch::new(resource_config(server), raw, catalog_provider(), executor.clone())
}

#[tokio::test]
async fn test_filter_search_fetches_matching_rows() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("q", "field1:value1"))
        .and(query_param("wt", "json"))
        .and(query_param("fl", "_id"))
        .and(query_param("rows", "100"))
        .and(query_param("start", "0"))
        .and(query_param("sort", "_id ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(2, &[7, 9])))
        .expect(1)
        .mount(&server)
        .await;

    let executor = MockExecutor::with_rows(vec![
        json!({"_id": 7, "field1": "value1", "field2": "a", "year": "1999", "collected": "2019-03-04T10:00:00"}),
        json!({"_id": 9, "field1": "value1", "field2": "b", "year": "2001", "collected": "not a date"}),
    ]);
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "filters": {"field1": "value1"}}),
        &executor,
    );

    search.validate().await.unwrap();
    assert_eq!(search.state(), SearchState::Validated);
    let response = search.fetch().await.unwrap();
    assert_eq!(search.state(), SearchState::Fetched);

    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0].0,
        format!(
            "SELECT \"_id\",\"field1\",\"field2\",\"year\",\"collected\" FROM \"{}\" \
             WHERE \"_id\" = ANY(VALUES (%s),(%s))",
            RESOURCE_ID
        )
    );
    assert_eq!(executed[0].1, vec![json!(7), json!(9)]);
    assert_eq!(executor.close_count(), 1);

    assert_eq!(response.resource_id, RESOURCE_ID);
    assert_eq!(response.total, 2);
    assert_eq!(response.backend, "datasolr");
    assert_eq!(response.records.len(), 2);
    assert_eq!(response.records[0]["year"], json!(1999));
    assert_eq!(response.records[0]["collected"], json!("2019-03-04"));
    assert_eq!(response.records[1]["collected"], json!(""));

    let field_ids: Vec<&str> = response.fields.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(field_ids, vec!["_id", "field1", "field2", "year", "collected"]);

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["filters"], json!({"field1": "value1"}));
    assert_eq!(body["offset"], json!(0));
    assert_eq!(body["_backend"], json!("datasolr"));
}

#[tokio::test]
async fn test_alias_resolves_to_source_table() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(0, &[])).await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": "specimens"}), &executor);

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    assert_eq!(response.resource_id, RESOURCE_ID);
    assert!(executor.executed()[0].0.contains(RESOURCE_ID));
}

#[tokio::test]
async fn test_no_matches_still_runs_column_query() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(0, &[])).await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "fields": ["field1", "year"], "q": "nothing"}),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    let executed = executor.executed();
    assert_eq!(
        executed[0].0,
        format!("SELECT \"field1\",\"year\" FROM \"{}\" LIMIT 0", RESOURCE_ID)
    );
    assert!(executed[0].1.is_empty());
    assert_eq!(response.total, 0);
    assert!(response.records.is_empty());
}

#[tokio::test]
async fn test_unknown_resource_is_not_found() {
    let server = MockServer::start().await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": "missing"}), &executor);

    let err = search.validate().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::NotFound(_)));
    assert_eq!(err.http_status(), 404);
    assert_eq!(search.state(), SearchState::Created);

    drop(search);
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_unrecognised_parameters_fail_validation() {
    let server = MockServer::start().await;
    let cases = [
        (json!({"filters": {"colour": "red"}}), "filters", "invalid value \"colour\""),
        (json!({"fields": ["field1", "colour"]}), "fields", "invalid value \"colour\""),
        (json!({"sort": "colour desc"}), "sort", "invalid value \"colour\""),
        (json!({"q": {"shape": "round"}}), "q", "invalid value \"shape\""),
        (json!({"facets": "colour"}), "facets", "invalid value \"colour\""),
        (json!({"flavour": "vanilla"}), "flavour", "invalid value \"vanilla\""),
        (json!({"distinct": "colour"}), "distinct", "invalid value \"colour\""),
    ];

    for (extra, key, message) in cases {
        let mut raw = json!({"resource_id": RESOURCE_ID});
        for (k, v) in extra.as_object().unwrap() {
            raw[k] = v.clone();
        }
        let executor = MockExecutor::default();
        let mut search = search(&server, raw, &executor);

        let err = search.validate().await.unwrap_err();
        assert_eq!(err.http_status(), 400);
        let errors = err.validation_errors().unwrap();
        assert_eq!(
            errors.get(key),
            Some(&[message.to_string()][..]),
            "unexpected errors for {key}: {errors}"
        );
    }
}

#[tokio::test]
async fn test_malformed_parameters_are_all_reported() {
    let server = MockServer::start().await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"limit": "ten", "offset": -1, "sort": "field1,"}),
        &executor,
    );

    let err = search.validate().await.unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.get("resource_id"), Some(&["Missing value".to_string()][..]));
    assert_eq!(errors.get("limit"), Some(&["Invalid integer".to_string()][..]));
    assert_eq!(errors.get("offset"), Some(&["Invalid integer".to_string()][..]));
    assert!(errors.contains("sort"));
}

#[tokio::test]
async fn test_fetch_requires_validate() {
    let server = MockServer::start().await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor);

    let err = search.fetch().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::State(_)));
    assert!(executor.executed().is_empty());
    assert_eq!(executor.close_count(), 0);
}

#[tokio::test]
async fn test_fetch_runs_once() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(0, &[])).await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor);

    search.validate().await.unwrap();
    search.fetch().await.unwrap();
    let err = search.fetch().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::State(_)));
    assert!(search.validate().await.is_err());
    assert_eq!(executor.executed().len(), 1);
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_solr_failure_closes_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor);

    search.validate().await.unwrap();
    let err = search.fetch().await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Transport(_)));
    assert_eq!(err.http_status(), 500);
    assert!(executor.executed().is_empty());
    assert_eq!(executor.close_count(), 1);
    assert_eq!(search.state(), SearchState::Fetched);
}

#[tokio::test]
async fn test_bad_search_url_is_config_error() {
    let executor = MockExecutor::default();
    let mut search = DatastoreSolrSearch::new(
        ResourceConfig::new("not a url"),
        json!({"resource_id": RESOURCE_ID}),
        catalog_provider(),
        executor.clone(),
    );

    search.validate().await.unwrap();
    let err = search.fetch().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Config(_)));
    assert!(executor.executed().is_empty());
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_executor_failure_closes_connection() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(1, &[7])).await;
    let executor = MockExecutor::failing();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor);

    search.validate().await.unwrap();
    let err = search.fetch().await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Collaborator(_)));
    assert_eq!(executor.close_count(), 1);
    drop(search);
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_distinct_over_several_fields_never_reaches_solr() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(0, &[])))
        .expect(0)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "distinct": true, "fields": ["field1", "field2"]}),
        &executor,
    );

    search.validate().await.unwrap();
    let err = search.fetch().await.unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Query(_)));
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_distinct_groups_and_suppresses_empty_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("group", "true"))
        .and(query_param("group.field", "field1"))
        .and(query_param("group.main", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(12, &[])))
        .expect(1)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "distinct": true, "fields": "field1"}),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    assert_eq!(search.request().unwrap().distinct_field().unwrap(), Some("field1"));
    assert_eq!(response.total, 0);
}

#[tokio::test]
async fn test_distinct_total_is_reported_when_groups_match() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(12, &[7, 9])).await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "distinct": "field2"}),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();
    assert_eq!(response.total, 12);
}

#[tokio::test]
async fn test_cursor_paging_sorts_on_identifier() {
    let server = MockServer::start().await;
    let mut body = solr_body(40, &[7, 9]);
    body["nextCursorMark"] = json!("AoEjNw==");
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("cursorMark", "*"))
        .and(query_param("sort", "_id ASC"))
        .and(query_param("rows", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "cursor": "*", "sort": "year desc", "limit": 2, "offset": 10}),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    assert!(executor.executed()[0].0.ends_with("ORDER BY \"_id\" ASC"));
    assert_eq!(response.next_cursor.as_deref(), Some("AoEjNw=="));
    assert_eq!(response.offset, None);
    assert_eq!(response.total, 40);
}

#[tokio::test]
async fn test_sort_is_mirrored_in_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("sort", "year DESC, field1 ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(2, &[9, 7])))
        .expect(1)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({"resource_id": RESOURCE_ID, "sort": ["year desc", "field1"]}),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    assert!(executor.executed()[0]
        .0
        .ends_with("ORDER BY \"year\" DESC, \"field1\" ASC"));
    assert_eq!(response.sort.len(), 2);
}

#[tokio::test]
async fn test_facets_and_stats_are_returned() {
    let server = MockServer::start().await;
    let mut body = solr_body(3, &[7]);
    body["facet_counts"] = json!({"facet_fields": {"field1": ["value1", 3]}});
    body["stats"] = json!({"stats_fields": {"year": {"min": 1999, "max": 2001}}});
    Mock::given(method("GET"))
        .and(path(SELECT_PATH))
        .and(query_param("facet", "true"))
        .and(query_param("facet.field", "field1"))
        .and(query_param("facet.limit", "5"))
        .and(query_param("facet.mincount", "1"))
        .and(query_param("f.field1.facet.limit", "2"))
        .and(query_param("stats", "true"))
        .and(query_param("stats.field", "year"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(
        &server,
        json!({
            "resource_id": RESOURCE_ID,
            "facets": "field1",
            "facets_limit": 5,
            "facets_field_limit": {"field1": 2},
            "solr_stats_fields": ["year"]
        }),
        &executor,
    );

    search.validate().await.unwrap();
    let response = search.fetch().await.unwrap();

    assert_eq!(
        response.facets,
        Some(json!({"facet_fields": {"field1": ["value1", 3]}}))
    );
    let year = response.fields.iter().find(|f| f.id == "year").unwrap();
    assert_eq!(year.stats["max"], json!(2001));
}

#[tokio::test]
async fn test_access_denied_before_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(solr_body(0, &[])))
        .expect(0)
        .mount(&server)
        .await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor)
        .with_access_check(RequireUser);

    search.validate().await.unwrap();
    let err = search.fetch().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Authorization(_)));
    assert_eq!(err.http_status(), 403);
    assert_eq!(executor.close_count(), 1);
}

#[tokio::test]
async fn test_access_granted_for_user() {
    let server = MockServer::start().await;
    mount_solr(&server, solr_body(0, &[])).await;
    let executor = MockExecutor::default();
    let mut search = search(&server, json!({"resource_id": RESOURCE_ID}), &executor)
        .with_access_check(RequireUser)
        .with_context(SearchContext::default().with_user("curator"));

    search.validate().await.unwrap();
    assert!(search.fetch().await.is_ok());
}
