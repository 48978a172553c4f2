//! GCP Private Service Connect endpoints
//!
//! A PSC service is created per subscription (or per region for
//! active-active). Endpoints attach to a service and pass through an
//! accept/reject state machine driven by the endpoint update call.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PSC_STATUS_INITIALIZED: &str = "initialized";
pub const PSC_STATUS_PROCESSING: &str = "processing";
pub const PSC_STATUS_PENDING: &str = "pending";
pub const PSC_STATUS_ACCEPT_PENDING: &str = "accept-pending";
pub const PSC_STATUS_REJECT_PENDING: &str = "reject-pending";
pub const PSC_STATUS_ACTIVE: &str = "active";
pub const PSC_STATUS_REJECTED: &str = "rejected";
pub const PSC_STATUS_DELETED: &str = "deleted";
pub const PSC_STATUS_FAILED: &str = "failed";

pub const PSC_ENDPOINT_ACTION_ACCEPT: &str = "accept";
pub const PSC_ENDPOINT_ACTION_REJECT: &str = "reject";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePscEndpointRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_vpc_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_vpc_subnet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_connection_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePscEndpointRequest {
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PscService {
    #[serde(rename = "pscServiceId", default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub connection_host_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PscEndpoint {
    pub id: i64,
    #[serde(default)]
    pub gcp_project_id: Option<String>,
    #[serde(default)]
    pub gcp_vpc_name: Option<String>,
    #[serde(default)]
    pub gcp_vpc_subnet_name: Option<String>,
    #[serde(default)]
    pub endpoint_connection_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service_attachments: Vec<ServiceAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAttachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dns_record: Option<String>,
    #[serde(default)]
    pub ip_address_name: Option<String>,
    #[serde(default)]
    pub forwarding_rule_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEndpointsResponse {
    #[serde(default)]
    endpoints: Vec<PscEndpoint>,
}

fn scope(subscription: i64, region: Option<i64>) -> String {
    match region {
        Some(region) => format!("/subscriptions/{subscription}/regions/{region}"),
        None => format!("/subscriptions/{subscription}"),
    }
}

/// Private Service Connect endpoints
#[derive(Clone)]
pub struct Psc {
    http: Arc<HttpClient>,
}

impl Psc {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn get_service(&self, subscription: i64, region: Option<i64>) -> Result<PscService> {
        map_not_found(
            self.http
                .get(&format!(
                    "{}/private-service-connect",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::PscServiceNotFound(subscription),
        )
    }

    pub async fn create_service(&self, subscription: i64, region: Option<i64>) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(
                    &format!("{}/private-service-connect", scope(subscription, region)),
                    &serde_json::json!({}),
                )
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_service(&self, subscription: i64, region: Option<i64>) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete(&format!(
                    "{}/private-service-connect",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::PscServiceNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn list_endpoints(
        &self,
        subscription: i64,
        region: Option<i64>,
        service: i64,
    ) -> Result<Vec<PscEndpoint>> {
        let response: ListEndpointsResponse = map_not_found(
            self.http
                .get(&format!(
                    "{}/private-service-connect/{service}/endpoints",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::PscServiceNotFound(subscription),
        )?;
        Ok(response.endpoints)
    }

    pub async fn get_endpoint(
        &self,
        subscription: i64,
        region: Option<i64>,
        service: i64,
        endpoint: i64,
    ) -> Result<PscEndpoint> {
        self.list_endpoints(subscription, region, service)
            .await?
            .into_iter()
            .find(|e| e.id == endpoint)
            .ok_or(ApiError::PscEndpointNotFound(endpoint))
    }

    pub async fn create_endpoint(
        &self,
        subscription: i64,
        region: Option<i64>,
        service: i64,
        request: &CreatePscEndpointRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(
                    &format!(
                        "{}/private-service-connect/{service}/endpoints",
                        scope(subscription, region)
                    ),
                    request,
                )
                .await,
            || ApiError::PscServiceNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    /// Drive the accept/reject transition of an endpoint.
    pub async fn update_endpoint(
        &self,
        subscription: i64,
        region: Option<i64>,
        service: i64,
        endpoint: i64,
        request: &UpdatePscEndpointRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!(
                        "{}/private-service-connect/{service}/endpoints/{endpoint}",
                        scope(subscription, region)
                    ),
                    request,
                )
                .await,
            || ApiError::PscEndpointNotFound(endpoint),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_endpoint(
        &self,
        subscription: i64,
        region: Option<i64>,
        service: i64,
        endpoint: i64,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete(&format!(
                    "{}/private-service-connect/{service}/endpoints/{endpoint}",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::PscEndpointNotFound(endpoint),
        )?;
        Ok(created.task_id)
    }
}
