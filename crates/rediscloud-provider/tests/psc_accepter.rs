//! Private Service Connect endpoint accept/reject scenarios

mod common;

use common::{fast_context, mount_completed_task};
use rediscloud_core::{AttrMap, AttrValue, ResourceData};
use rediscloud_provider::Resource;
use rediscloud_provider::psc::{PscEndpointAccepterResource, PscEndpointResource};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint_body(status: &str) -> serde_json::Value {
    json!({
        "endpoints": [{
            "id": 7,
            "gcpProjectId": "my-project",
            "gcpVpcName": "my-vpc",
            "gcpVpcSubnetName": "my-subnet",
            "endpointConnectionName": "redis-endpoint",
            "status": status,
            "serviceAttachments": []
        }]
    })
}

async fn mount_status_sequence(server: &MockServer, statuses: &[(&str, Option<u64>)]) {
    for (status, times) in statuses {
        let mock = Mock::given(method("GET"))
            .and(path("/subscriptions/20/private-service-connect/3/endpoints"))
            .respond_with(ResponseTemplate::new(200).set_body_json(endpoint_body(status)));
        match times {
            Some(times) => mock.up_to_n_times(*times).mount(server).await,
            None => mock.mount(server).await,
        }
    }
}

#[tokio::test]
async fn accepter_walks_the_state_machine_to_active() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    // initialized → processing → pending, then (after the accept call)
    // accept-pending → active.
    mount_status_sequence(
        &server,
        &[
            ("initialized", Some(1)),
            ("processing", Some(1)),
            ("pending", Some(1)),
            ("accept-pending", Some(1)),
            ("active", None),
        ],
    )
    .await;

    Mock::given(method("PUT"))
        .and(path("/subscriptions/20/private-service-connect/3/endpoints/7"))
        .and(body_partial_json(json!({"action": "accept"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-accept"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-accept").await;

    let mut config = AttrMap::new();
    config.insert("subscription_id".to_string(), AttrValue::Int(20));
    config.insert("psc_service_id".to_string(), AttrValue::Int(3));
    config.insert("endpoint_id".to_string(), AttrValue::Int(7));
    config.insert("action".to_string(), AttrValue::str("accept"));
    let mut data = ResourceData::new(config);

    PscEndpointAccepterResource.create(&ctx, &mut data).await.unwrap();

    assert_eq!(data.id(), "20/3/7");
    assert_eq!(data.get_str("status").as_deref(), Some("active"));
}

#[tokio::test]
async fn accepter_is_idempotent_once_active() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    // Already active: no accept call may be issued (no PUT mock mounted).
    mount_status_sequence(&server, &[("active", None)]).await;

    let mut config = AttrMap::new();
    config.insert("subscription_id".to_string(), AttrValue::Int(20));
    config.insert("psc_service_id".to_string(), AttrValue::Int(3));
    config.insert("endpoint_id".to_string(), AttrValue::Int(7));
    config.insert("action".to_string(), AttrValue::str("accept"));
    let mut data = ResourceData::new(config);

    PscEndpointAccepterResource.create(&ctx, &mut data).await.unwrap();
    assert_eq!(data.get_str("status").as_deref(), Some("active"));
}

#[tokio::test]
async fn endpoint_create_parks_in_initialized() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    Mock::given(method("POST"))
        .and(path("/subscriptions/20/private-service-connect/3/endpoints"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-ep"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/task-ep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "taskId": "task-ep",
            "status": "processing-completed",
            "response": {"resourceId": 7}
        })))
        .mount(&server)
        .await;
    mount_status_sequence(&server, &[("initialized", None)]).await;

    let mut config = AttrMap::new();
    config.insert("subscription_id".to_string(), AttrValue::Int(20));
    config.insert("psc_service_id".to_string(), AttrValue::Int(3));
    config.insert("gcp_project_id".to_string(), AttrValue::str("my-project"));
    config.insert("gcp_vpc_name".to_string(), AttrValue::str("my-vpc"));
    config.insert("gcp_vpc_subnet_name".to_string(), AttrValue::str("my-subnet"));
    config.insert(
        "endpoint_connection_name".to_string(),
        AttrValue::str("redis-endpoint"),
    );
    let mut data = ResourceData::new(config);

    PscEndpointResource.create(&ctx, &mut data).await.unwrap();
    assert_eq!(data.id(), "20/3/7");
    assert_eq!(data.get_str("status").as_deref(), Some("initialized"));
}

#[tokio::test]
async fn initialized_endpoint_deletes_directly() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    mount_status_sequence(&server, &[("initialized", None)]).await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/20/private-service-connect/3/endpoints/7"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-del"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-del").await;

    let mut data = ResourceData::from_id("20/3/7");
    PscEndpointResource.delete(&ctx, &mut data).await.unwrap();
    assert!(data.id().is_empty());
}

#[tokio::test]
async fn active_endpoint_waits_for_gcp_side_teardown() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    // Active for two polls, then gone. No DELETE call is legal here.
    mount_status_sequence(&server, &[("active", Some(3)), ("deleted", None)]).await;

    let mut data = ResourceData::from_id("20/3/7");
    PscEndpointResource.delete(&ctx, &mut data).await.unwrap();
    assert!(data.id().is_empty());
}
