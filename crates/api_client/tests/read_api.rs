//! Integration tests for ReadApiClient.
//!
//! Uses wiremock for the upstream read API. Covers query execution, the
//! call log, protobuf decoding of lookups, explore, and the raw forward path.

use std::time::Duration;

use api_client::{CallLog, CancellationToken, QueryParams, QueryType, ReadApiClient};
use core_types::HttpMethod;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEPARTMENT_HEX: &str = "4465706172746D656E74";

fn wrapped(hex: &str) -> serde_json::Value {
    json!({"typeUrl": "type.googleapis.com/google.protobuf.StringValue", "value": hex})
}

fn create_test_client(mock_server: &MockServer) -> ReadApiClient {
    ReadApiClient::with_log(
        &format!("{}/v1/entities", mock_server.uri()),
        Duration::from_secs(5),
        CallLog::new(50),
    )
    .expect("failed to create client")
}

#[tokio::test]
async fn test_execute_metadata_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entities/e1/metadata"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"owner": wrapped(DEPARTMENT_HEX)})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let params = QueryParams::new(QueryType::Metadata).with_entity("e1");
    let response = client.execute_query(&params).await;

    assert_eq!(response.status, 200);
    assert!(response.error.is_none());
    assert_eq!(response.method, HttpMethod::Get);
    assert!(response.endpoint.ends_with("/v1/entities/e1/metadata"));
    // execute_query returns the data as received
    assert_eq!(response.data, json!({"owner": wrapped(DEPARTMENT_HEX)}));

    let calls = client.call_log().list().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].status, Some(200));
    assert!(calls[0].duration_ms.is_some());
    assert!(calls[0].curl.starts_with("curl -X GET '"));
}

#[tokio::test]
async fn test_execute_query_mirrors_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/search"))
        .and(body_json(json!({"name": "Health"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let mut params = QueryParams::new(QueryType::Search);
    params.entity_name = Some("Health".to_string());

    let response = client.execute_query(&params).await;

    assert_eq!(response.status, 404);
    assert_eq!(response.request_body, Some(json!({"name": "Health"})));
    assert_eq!(response.data, json!({"message": "not found"}));
}

#[tokio::test]
async fn test_execute_query_non_json_reports_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entities/e1/metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let response = client
        .execute_query(&QueryParams::new(QueryType::Metadata).with_entity("e1"))
        .await;

    assert_eq!(response.status, 500);
    assert!(response.error.is_some());
    assert!(response.data.is_null());
}

#[tokio::test]
async fn test_execute_query_unreachable_upstream() {
    let client = ReadApiClient::with_log(
        "http://127.0.0.1:9/v1/entities",
        Duration::from_secs(2),
        CallLog::default(),
    )
    .unwrap();

    let response = client
        .execute_query(&QueryParams::new(QueryType::Metadata).with_entity("e1"))
        .await;

    assert_eq!(response.status, 500);
    assert!(response.error.is_some());

    let calls = client.call_log().list().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].error.is_some());
    assert!(calls[0].status.is_none());
}

#[tokio::test]
async fn test_run_query_validates() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    let err = client
        .run_query(&QueryParams::new(QueryType::Attributes).with_entity("e1"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Attribute name is required");
    assert!(client.call_log().is_empty().await);
}

#[tokio::test]
async fn test_fetch_attribute_value_decodes_struct() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entities/e1/attributes/budget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "start": "2020-01-01",
            "value": {"columns": ["ministry", "amount"], "rows": [[wrapped(DEPARTMENT_HEX), 10]]}
        }])))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let table = client.fetch_attribute_value("e1", "budget").await.unwrap();

    assert_eq!(table.columns, vec!["ministry", "amount"]);
    assert_eq!(table.rows, vec![vec![json!("Department"), json!(10)]]);
}

#[tokio::test]
async fn test_fetch_attribute_value_failure_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entities/e1/attributes/missing"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    assert!(client.get_attribute_value("e1", "missing").await.is_none());
}

#[tokio::test]
async fn test_fetch_entity_by_id_decodes_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/search"))
        .and(body_json(json!({"id": "cat_1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": [{"id": "cat_1", "name": wrapped(DEPARTMENT_HEX), "kind": {"major": "Category"}}]
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let entity = client.fetch_entity_by_id("cat_1", None).await.unwrap();

    assert_eq!(entity.name, "Department");
    assert_eq!(entity.kind.major, "Category");
}

#[tokio::test]
async fn test_explore_entity_builds_categories() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/e1/relations"))
        .and(body_json(json!({"name": "AS_CATEGORY"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"relations": [
            {"id": "r1", "relatedEntityId": "cat_1", "name": "AS_CATEGORY", "direction": "OUTGOING", "startTime": "2020-01-01"},
            {"id": "r2", "relatedEntityId": "cat_2", "name": "AS_CATEGORY", "direction": "OUTGOING", "startTime": "2021-01-01"}
        ]})))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/search"))
        .and(body_json(json!({"id": "cat_1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": [{"id": "cat_1", "name": "Budget", "kind": {"major": "Category", "minor": "finance"}}]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/search"))
        .and(body_json(json!({"id": "cat_2"})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client.explore_entity("e1", None).await;

    assert!(result.error.is_none());
    assert!(!result.loading);
    assert_eq!(result.relations.len(), 2);
    assert_eq!(result.categories.len(), 2);

    let budget = &result.categories[0];
    assert_eq!(budget.name, "Budget");
    assert_eq!(budget.kind.minor.as_deref(), Some("finance"));
    assert_eq!(budget.relation_id, "r1");

    let unresolved = &result.categories[1];
    assert_eq!(unresolved.name, "cat_2");
    assert_eq!(unresolved.kind.major, "UNKNOWN");

    assert_eq!(client.call_log().len().await, 3);
}

#[tokio::test]
async fn test_explore_entity_cancelled_mid_flight() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/e1/relations"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = client.explore_entity("e1", Some(&token)).await;

    assert_eq!(result.error.as_deref(), Some("Cancelled"));
    assert!(result.categories.is_empty());

    let calls = client.call_log().list().await;
    assert_eq!(calls[0].error.as_deref(), Some("Cancelled"));
}

#[tokio::test]
async fn test_forward_preserves_path_query_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/entities/e1/relations"))
        .and(query_param("debug", "1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "AS_CATEGORY"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let response = client
        .forward(
            HttpMethod::Post,
            "e1/relations",
            Some("debug=1"),
            br#"{"name":"AS_CATEGORY"}"#.to_vec(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_json());
    assert_eq!(response.json().unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_forward_relays_non_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/entities/e1/metadata"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("content-type", "text/plain")
                .set_body_string("upstream maintenance"),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let response = client
        .forward(HttpMethod::Get, "e1/metadata", None, Vec::new())
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_json());
    assert_eq!(response.preview(200), "upstream maintenance");
}
