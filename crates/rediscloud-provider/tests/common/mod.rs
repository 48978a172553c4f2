//! Shared helpers for controller scenario tests

use rediscloud_client::{Client, ClientConfig};
use rediscloud_provider::Context;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Context wired to the mock server with millisecond polling.
#[allow(dead_code)]
pub fn fast_context(server: &MockServer) -> Context {
    let client = Client::new(ClientConfig {
        base_url: Some(server.uri()),
        api_key: Some("test-key".to_string()),
        secret_key: Some("test-secret".to_string()),
    })
    .unwrap();
    Context::with_fast_polling(client)
}

/// Mount a task that completes immediately.
#[allow(dead_code)]
pub async fn mount_completed_task(server: &MockServer, task_id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": task_id,
            "status": "processing-completed",
            "response": {}
        })))
        .mount(server)
        .await;
}

/// Mount a task that completes immediately carrying a resource id.
#[allow(dead_code)]
pub async fn mount_task_with_resource(server: &MockServer, task_id: &str, resource_id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/tasks/{task_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": task_id,
            "status": "processing-completed",
            "response": {"resourceId": resource_id}
        })))
        .mount(server)
        .await;
}

/// Mount an always-active subscription.
#[allow(dead_code)]
pub async fn mount_active_subscription(
    server: &MockServer,
    subscription: i64,
    public_endpoint_access: bool,
) {
    Mock::given(method("GET"))
        .and(path(format!("/subscriptions/{subscription}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": subscription,
            "name": "test-subscription",
            "status": "active",
            "paymentMethodId": 9090,
            "memoryStorage": "ram",
            "numberOfDatabases": 1,
            "publicEndpointAccess": public_endpoint_access,
            "cloudDetails": [{
                "provider": "AWS",
                "cloudAccountId": 1,
                "regions": [{
                    "region": "eu-west-1",
                    "networking": [{"deploymentCidr": "10.0.0.0/24", "vpcId": "vpc-1"}]
                }]
            }]
        })))
        .mount(server)
        .await;
}

/// Mount an empty tag set for a database.
#[allow(dead_code)]
pub async fn mount_empty_tags(server: &MockServer, subscription: i64, database: i64) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/subscriptions/{subscription}/databases/{database}/tags"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tags": []})))
        .mount(server)
        .await;
}
