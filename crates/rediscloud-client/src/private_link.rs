//! AWS PrivateLink endpoints
//!
//! The create endpoint accepts exactly one principal; additional principals
//! are attached one at a time through the principal endpoints. There is no
//! aggregate delete.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PRIVATE_LINK_STATUS_ACTIVE: &str = "active";
pub const PRIVATE_LINK_STATUS_CREATE_REQUEST_RECEIVED: &str = "create-request-received";
pub const PRIVATE_LINK_STATUS_IN_PROGRESS: &str = "processing-in-progress";
pub const PRIVATE_LINK_STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrivateLinkRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_name: Option<String>,
    pub principal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_alias: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrincipalRequest {
    pub principal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLink {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub share_name: Option<String>,
    #[serde(default)]
    pub resource_configuration_id: Option<String>,
    #[serde(default)]
    pub resource_configuration_arn: Option<String>,
    #[serde(default)]
    pub share_arn: Option<String>,
    #[serde(default)]
    pub principals: Vec<Principal>,
    #[serde(default)]
    pub connections: Vec<PrivateLinkConnection>,
    #[serde(default)]
    pub databases: Vec<PrivateLinkDatabase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub principal: String,
    #[serde(default)]
    pub principal_type: Option<String>,
    #[serde(default)]
    pub principal_alias: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkConnection {
    #[serde(default)]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub association_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkDatabase {
    #[serde(default)]
    pub database_id: Option<i64>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub resource_link_endpoint: Option<String>,
}

fn scope(subscription: i64, region: Option<i64>) -> String {
    match region {
        Some(region) => format!("/subscriptions/{subscription}/regions/{region}"),
        None => format!("/subscriptions/{subscription}"),
    }
}

/// PrivateLink endpoints
#[derive(Clone)]
pub struct PrivateLinks {
    http: Arc<HttpClient>,
}

impl PrivateLinks {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn get(&self, subscription: i64, region: Option<i64>) -> Result<PrivateLink> {
        map_not_found(
            self.http
                .get(&format!("{}/private-link", scope(subscription, region)))
                .await,
            || ApiError::PrivateLinkNotFound(subscription),
        )
    }

    pub async fn create(
        &self,
        subscription: i64,
        region: Option<i64>,
        request: &CreatePrivateLinkRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(&format!("{}/private-link", scope(subscription, region)), request)
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn create_principal(
        &self,
        subscription: i64,
        region: Option<i64>,
        request: &CreatePrincipalRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(
                    &format!("{}/private-link/principals", scope(subscription, region)),
                    request,
                )
                .await,
            || ApiError::PrivateLinkNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_principal(
        &self,
        subscription: i64,
        region: Option<i64>,
        principal: &str,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete_with_body(
                    &format!("{}/private-link/principals", scope(subscription, region)),
                    &serde_json::json!({ "principal": principal }),
                )
                .await,
            || ApiError::PrivateLinkNotFound(subscription),
        )?;
        Ok(created.task_id)
    }
}
