//! Task tracker behaviour against a mocked task endpoint

use rediscloud_client::{Client, ClientConfig};
use rediscloud_core::task_waiter::{Backoff, wait_for_resource_id, wait_for_task};
use rediscloud_core::CoreError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_backoff() -> Backoff {
    Backoff {
        initial: Duration::from_millis(1),
        max: Duration::from_millis(5),
    }
}

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig {
        base_url: Some(server.uri()),
        api_key: Some("k".to_string()),
        secret_key: Some("s".to_string()),
    })
    .unwrap()
}

#[tokio::test]
async fn polls_until_completed_and_returns_resource_id() {
    let server = MockServer::start().await;

    // First two polls report the task as still running.
    Mock::given(method("GET"))
        .and(path("/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t1",
            "status": "processing-in-progress"
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t1",
            "status": "processing-completed",
            "response": {"resourceId": 9876}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = wait_for_resource_id(&client.tasks(), "t1", &fast_backoff())
        .await
        .unwrap();
    assert_eq!(id, 9876);
}

#[tokio::test]
async fn terminal_failure_surfaces_description() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks/t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t2",
            "status": "processing-error-received",
            "response": {
                "error": {
                    "type": "QUOTA_EXCEEDED",
                    "status": "403 FORBIDDEN",
                    "description": "quota exceeded"
                }
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = wait_for_task(&client.tasks(), "t2", &fast_backoff())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("quota exceeded"), "{err}");
}

#[tokio::test]
async fn error_block_wins_even_while_status_pending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks/t3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t3",
            "status": "processing-in-progress",
            "response": {
                "error": {
                    "type": "DATABASE_LIMIT",
                    "status": "400 BAD_REQUEST",
                    "description": "too many databases"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = wait_for_task(&client.tasks(), "t3", &fast_backoff())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::TaskFailed { .. }));
    assert!(err.to_string().contains("too many databases"));
}

#[tokio::test]
async fn http_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks/t4"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/t4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t4",
            "status": "processing-completed",
            "response": {"resourceId": 1}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = wait_for_resource_id(&client.tasks(), "t4", &fast_backoff())
        .await
        .unwrap();
    assert_eq!(id, 1);
}

#[tokio::test]
async fn completed_without_resource_id_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tasks/t5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "t5",
            "status": "processing-completed",
            "response": {}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = wait_for_resource_id(&client.tasks(), "t5", &fast_backoff())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::TaskMissingResource(_)));
}
