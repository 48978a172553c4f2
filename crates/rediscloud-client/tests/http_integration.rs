//! Integration tests for the REST client using wiremock
//!
//! These tests verify auth-header propagation, response decoding, and the
//! mapping of 404 responses into typed not-found errors.

use rediscloud_client::{ApiError, Client, ClientConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig {
        base_url: Some(server.uri()),
        api_key: Some("test-key".to_string()),
        secret_key: Some("test-secret".to_string()),
    })
    .unwrap()
}

#[tokio::test]
async fn auth_headers_are_sent_on_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/1"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-api-secret-key", "test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "name": "sub",
            "status": "active"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let subscription = client_for(&server).subscriptions().get(1).await.unwrap();
    assert_eq!(subscription.id, 1);
    assert_eq!(subscription.status.as_deref(), Some("active"));
}

#[tokio::test]
async fn subscription_404_maps_to_typed_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let err = client_for(&server).subscriptions().get(999).await.unwrap_err();
    assert!(matches!(err, ApiError::SubscriptionNotFound(999)));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn database_404_carries_both_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/12/databases/34"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).databases().get(12, 34).await.unwrap_err();
    match err {
        ApiError::DatabaseNotFound {
            subscription,
            database,
        } => {
            assert_eq!(subscription, 12);
            assert_eq!(database, 34);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn create_subscription_returns_task_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_partial_json(json!({"name": "example"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "taskId": "task-77"
        })))
        .mount(&server)
        .await;

    let request = rediscloud_client::subscription::CreateSubscriptionRequest {
        name: Some("example".to_string()),
        ..Default::default()
    };
    let task_id = client_for(&server)
        .subscriptions()
        .create(&request)
        .await
        .unwrap();
    assert_eq!(task_id, "task-77");
}

#[tokio::test]
async fn server_errors_surface_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).subscriptions().list().await.unwrap_err();
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn database_list_walks_pages() {
    let server = MockServer::start().await;

    let databases: Vec<_> = (0..100)
        .map(|i| json!({"databaseId": i, "name": format!("db-{i}")}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/subscriptions/5/databases"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subscription": [{"databases": databases}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/5/databases"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subscription": [{"databases": [{"databaseId": 100, "name": "db-100"}]}]
        })))
        .mount(&server)
        .await;

    let all = client_for(&server).databases().list(5).await.unwrap();
    assert_eq!(all.len(), 101);
    assert_eq!(all[100].id, 100);
}

#[tokio::test]
async fn database_import_posts_source_uris() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions/5/databases/9/import"))
        .and(body_partial_json(json!({
            "sourceType": "aws-s3",
            "importFromUri": ["s3://bucket/dump.rdb"]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "taskId": "task-import"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = rediscloud_client::database::ImportDatabaseRequest {
        source_type: "aws-s3".to_string(),
        import_from_uri: vec!["s3://bucket/dump.rdb".to_string()],
    };
    let task_id = client_for(&server)
        .databases()
        .import(5, 9, &request)
        .await
        .unwrap();
    assert_eq!(task_id, "task-import");
}

#[tokio::test]
async fn task_envelope_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-1",
            "status": "processing-completed",
            "response": {"resourceId": 4321}
        })))
        .mount(&server)
        .await;

    let task = client_for(&server).tasks().get("task-1").await.unwrap();
    assert!(task.is_completed());
    assert_eq!(task.response.unwrap().resource_id, Some(4321));
}
