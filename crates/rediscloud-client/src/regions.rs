//! Active-active subscription region endpoints

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub databases: Option<Vec<CreateRegionDatabase>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegionDatabase {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_write_operations_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_read_operations_per_second: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRegionsRequest {
    pub regions: Vec<DeleteRegionSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRegionSpec {
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub deployment_cidr: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub databases: Vec<RegionDatabase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDatabase {
    #[serde(default)]
    pub database_id: Option<i64>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub write_operations_per_second: Option<i64>,
    #[serde(default)]
    pub read_operations_per_second: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRegionsResponse {
    #[serde(default)]
    regions: Vec<Region>,
}

/// Region endpoints of active-active subscriptions
#[derive(Clone)]
pub struct Regions {
    http: Arc<HttpClient>,
}

impl Regions {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn list(&self, subscription: i64) -> Result<Vec<Region>> {
        let response: ListRegionsResponse = map_not_found(
            self.http
                .get(&format!("/subscriptions/{subscription}/regions"))
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(response.regions)
    }

    pub async fn create(&self, subscription: i64, request: &CreateRegionRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(&format!("/subscriptions/{subscription}/regions"), request)
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    /// Delete one or more regions in a single call.
    pub async fn delete(&self, subscription: i64, request: &DeleteRegionsRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete_with_body(
                    &format!("/subscriptions/{subscription}/regions"),
                    request,
                )
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }
}
