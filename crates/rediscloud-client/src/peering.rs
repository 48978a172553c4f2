//! VPC peering endpoints

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PEERING_STATUS_INITIATING_REQUEST: &str = "initiating-request";
pub const PEERING_STATUS_PENDING_ACCEPTANCE: &str = "pending-acceptance";
pub const PEERING_STATUS_ACTIVE: &str = "active";
pub const PEERING_STATUS_INACTIVE: &str = "inactive";
pub const PEERING_STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePeeringRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    // AWS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    // GCP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_project_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_network_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peering {
    #[serde(rename = "vpcPeeringId")]
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub aws_peering_uid: Option<String>,
    #[serde(default)]
    pub vpc_uid: Option<String>,
    #[serde(default)]
    pub vpc_cidr: Option<String>,
    #[serde(default)]
    pub vpc_cidrs: Option<Vec<PeeringCidr>>,
    #[serde(default)]
    pub vpc_project_uid: Option<String>,
    #[serde(default)]
    pub vpc_network_name: Option<String>,
    #[serde(default)]
    pub cloud_peering_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeeringCidr {
    #[serde(default)]
    pub vpc_cidr: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPeeringsResponse {
    #[serde(default)]
    peerings: Vec<Peering>,
}

/// VPC peering endpoints
#[derive(Clone)]
pub struct Peerings {
    http: Arc<HttpClient>,
}

impl Peerings {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn list(&self, subscription: i64) -> Result<Vec<Peering>> {
        let response: ListPeeringsResponse = map_not_found(
            self.http
                .get(&format!("/subscriptions/{subscription}/peerings"))
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(response.peerings)
    }

    /// The peering list is the only read the API offers; a single peering is
    /// found by filtering the list.
    pub async fn get(&self, subscription: i64, peering: i64) -> Result<Peering> {
        self.list(subscription)
            .await?
            .into_iter()
            .find(|p| p.id == peering)
            .ok_or(ApiError::PeeringNotFound {
                subscription,
                peering,
            })
    }

    pub async fn create(&self, subscription: i64, request: &CreatePeeringRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(&format!("/subscriptions/{subscription}/peerings"), request)
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete(&self, subscription: i64, peering: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete(&format!("/subscriptions/{subscription}/peerings/{peering}"))
                .await,
            || ApiError::PeeringNotFound {
                subscription,
                peering,
            },
        )?;
        Ok(created.task_id)
    }
}
