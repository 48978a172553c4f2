//! PrivateLink principal reconciliation scenarios

mod common;

use common::{fast_context, mount_completed_task};
use rediscloud_core::{AttrMap, AttrValue, ResourceData};
use rediscloud_provider::Resource;
use rediscloud_provider::private_link::PrivateLinkResource;
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn principal_block(principal: &str) -> AttrValue {
    let mut block = BTreeMap::new();
    block.insert("principal".to_string(), AttrValue::str(principal));
    block.insert("principal_type".to_string(), AttrValue::str("aws_account"));
    AttrValue::Map(block)
}

fn link_body(principals: &[&str]) -> serde_json::Value {
    json!({
        "status": "active",
        "shareName": "share-1",
        "resourceConfigurationId": "rc-1",
        "resourceConfigurationArn": "arn:rc-1",
        "shareArn": "arn:share-1",
        "principals": principals
            .iter()
            .map(|principal| json!({"principal": principal, "principalType": "aws_account"}))
            .collect::<Vec<_>>(),
        "connections": [],
        "databases": []
    })
}

#[tokio::test]
async fn update_issues_exactly_the_set_difference() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    // Observed {A, B}; desired {A, C}: one create for C, one delete for B,
    // nothing for A.
    Mock::given(method("GET"))
        .and(path("/subscriptions/15/private-link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(link_body(&["arn:A", "arn:B"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/15/private-link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(link_body(&["arn:A", "arn:C"])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/subscriptions/15/private-link/principals"))
        .and(body_partial_json(json!({"principal": "arn:C"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-add"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/15/private-link/principals"))
        .and(body_partial_json(json!({"principal": "arn:B"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-remove"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-add").await;
    mount_completed_task(&server, "task-remove").await;

    let mut config = AttrMap::new();
    config.insert(
        "principal".to_string(),
        AttrValue::Set(vec![principal_block("arn:A"), principal_block("arn:C")]),
    );
    let mut data = ResourceData::with_state("15", config, AttrMap::new());
    PrivateLinkResource.update(&ctx, &mut data).await.unwrap();

    // The mock expectations verify call counts on drop; A saw no API call
    // because no endpoint for it was mounted.
    let principals = data.get_items("principal").unwrap();
    assert_eq!(principals.len(), 2);
}

#[tokio::test]
async fn create_attaches_first_principal_then_the_rest() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    Mock::given(method("POST"))
        .and(path("/subscriptions/15/private-link"))
        .and(body_partial_json(json!({"principal": "arn:A"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-share"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-share").await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/15/private-link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(link_body(&["arn:A", "arn:B"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions/15/private-link/principals"))
        .and(body_partial_json(json!({"principal": "arn:B"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-second"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-second").await;

    let mut config = AttrMap::new();
    config.insert("subscription_id".to_string(), AttrValue::Int(15));
    config.insert("share_name".to_string(), AttrValue::str("share-1"));
    config.insert(
        "principal".to_string(),
        AttrValue::Set(vec![principal_block("arn:A"), principal_block("arn:B")]),
    );
    let mut data = ResourceData::new(config);
    PrivateLinkResource.create(&ctx, &mut data).await.unwrap();

    assert_eq!(data.id(), "15");
    assert_eq!(data.get_str("share_name").as_deref(), Some("share-1"));
    assert_eq!(data.get_str("share_arn").as_deref(), Some("arn:share-1"));
}

#[tokio::test]
async fn delete_removes_principals_one_by_one() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    Mock::given(method("GET"))
        .and(path("/subscriptions/15/private-link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(link_body(&["arn:A", "arn:B"])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/15/private-link/principals"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"taskId": "task-del"})))
        .expect(2)
        .mount(&server)
        .await;
    mount_completed_task(&server, "task-del").await;

    let mut data = ResourceData::from_id("15");
    PrivateLinkResource.delete(&ctx, &mut data).await.unwrap();
    assert!(data.id().is_empty());
}

#[tokio::test]
async fn create_without_principals_is_rejected_locally() {
    let server = MockServer::start().await;
    let ctx = fast_context(&server);

    let mut config = AttrMap::new();
    config.insert("subscription_id".to_string(), AttrValue::Int(15));
    let mut data = ResourceData::new(config);
    let err = PrivateLinkResource.create(&ctx, &mut data).await.unwrap_err();
    assert!(err.to_string().contains("principal"), "{err}");
    // No mocks mounted: any API call would have failed the test.
}
