//! Subscription endpoints
//!
//! Subscriptions are the billing and isolation boundary. Creation takes a
//! creation plan (a representative database spec used by the API to size
//! capacity); the databases it materialises are ephemeral and deleted by the
//! caller once the subscription settles.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SUBSCRIPTION_STATUS_ACTIVE: &str = "active";
pub const SUBSCRIPTION_STATUS_PENDING: &str = "pending";
pub const SUBSCRIPTION_STATUS_DELETING: &str = "deleting";
pub const SUBSCRIPTION_STATUS_ERROR: &str = "error";

pub const DEPLOYMENT_TYPE_SINGLE_REGION: &str = "single-region";
pub const DEPLOYMENT_TYPE_ACTIVE_ACTIVE: &str = "active-active";

// ---------------------------------------------------------------------------
// Request types

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_storage_encryption: Option<bool>,
    pub cloud_providers: Vec<CreateCloudProvider>,
    /// Creation plan: representative database specs, not user databases.
    pub databases: Vec<CreateDatabaseSpec>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCloudProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<i64>,
    pub regions: Vec<CreateRegion>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_availability_zones: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_availability_zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking: Option<CreateNetworking>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_operations_per_second: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_operations_per_second: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNetworking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<Throughput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<DatabaseModuleSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Throughput {
    pub by: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseModuleSpec {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCidrAllowlistRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindows {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<MaintenanceWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    pub start_hour: i64,
    pub duration_in_hours: i64,
    pub days: Vec<String>,
}

// ---------------------------------------------------------------------------
// Response types

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub memory_storage: Option<String>,
    #[serde(default)]
    pub number_of_databases: Option<i64>,
    #[serde(default)]
    pub public_endpoint_access: Option<bool>,
    #[serde(default)]
    pub cloud_details: Vec<CloudDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDetail {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub cloud_account_id: Option<i64>,
    #[serde(default)]
    pub total_size_in_gb: Option<f64>,
    #[serde(default)]
    pub regions: Vec<CloudRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudRegion {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub multiple_availability_zones: Option<bool>,
    #[serde(default)]
    pub preferred_availability_zones: Option<Vec<String>>,
    #[serde(default)]
    pub networking: Vec<Networking>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default)]
    pub deployment_cidr: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSubscriptionsResponse {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CidrAllowlist {
    #[serde(default)]
    pub cidr_ips: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingEntry {
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(rename = "type", default)]
    pub pricing_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub quantity_measurement: Option<String>,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub price_period: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingResponse {
    #[serde(default)]
    pricing: Vec<PricingEntry>,
}

// ---------------------------------------------------------------------------
// Service

/// Subscription endpoints
#[derive(Clone)]
pub struct Subscriptions {
    http: Arc<HttpClient>,
}

impl Subscriptions {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Create a subscription; returns the task id to poll.
    pub async fn create(&self, request: &CreateSubscriptionRequest) -> Result<String> {
        let created: TaskCreated = self.http.post("/subscriptions", request).await?;
        Ok(created.task_id)
    }

    pub async fn get(&self, id: i64) -> Result<Subscription> {
        map_not_found(self.http.get(&format!("/subscriptions/{id}")).await, || {
            ApiError::SubscriptionNotFound(id)
        })
    }

    pub async fn list(&self) -> Result<Vec<Subscription>> {
        let response: ListSubscriptionsResponse = self.http.get("/subscriptions").await?;
        Ok(response.subscriptions)
    }

    pub async fn update(&self, id: i64, request: &UpdateSubscriptionRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.put(&format!("/subscriptions/{id}"), request).await,
            || ApiError::SubscriptionNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete(&self, id: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.delete(&format!("/subscriptions/{id}")).await,
            || ApiError::SubscriptionNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn get_cidr_allowlist(&self, id: i64) -> Result<CidrAllowlist> {
        map_not_found(
            self.http.get(&format!("/subscriptions/{id}/cidr")).await,
            || ApiError::SubscriptionNotFound(id),
        )
    }

    pub async fn update_cidr_allowlist(
        &self,
        id: i64,
        request: &UpdateCidrAllowlistRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(&format!("/subscriptions/{id}/cidr"), request)
                .await,
            || ApiError::SubscriptionNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn get_maintenance_windows(&self, id: i64) -> Result<MaintenanceWindows> {
        map_not_found(
            self.http
                .get(&format!("/subscriptions/{id}/maintenance-windows"))
                .await,
            || ApiError::SubscriptionNotFound(id),
        )
    }

    /// Replaces the maintenance-window configuration. Synchronous endpoint.
    pub async fn update_maintenance_windows(
        &self,
        id: i64,
        windows: &MaintenanceWindows,
    ) -> Result<()> {
        map_not_found(
            self.http
                .put_empty(&format!("/subscriptions/{id}/maintenance-windows"), windows)
                .await,
            || ApiError::SubscriptionNotFound(id),
        )
    }

    pub async fn get_pricing(&self, id: i64) -> Result<Vec<PricingEntry>> {
        let response: PricingResponse = map_not_found(
            self.http.get(&format!("/subscriptions/{id}/pricing")).await,
            || ApiError::SubscriptionNotFound(id),
        )?;
        Ok(response.pricing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_skips_unset_fields() {
        let request = CreateSubscriptionRequest {
            name: Some("sub".to_string()),
            payment_method: Some("credit-card".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["name"], "sub");
        assert_eq!(json["paymentMethod"], "credit-card");
        assert!(json.get("deploymentType").is_none());
        assert!(json.get("memoryStorage").is_none());
    }

    #[test]
    fn subscription_deserializes_nested_networking() {
        let subscription: Subscription = serde_json::from_str(
            r#"{
                "id": 1234,
                "name": "sub",
                "status": "active",
                "publicEndpointAccess": false,
                "cloudDetails": [{
                    "provider": "AWS",
                    "regions": [{
                        "region": "us-east-1",
                        "networking": [{"deploymentCidr": "10.0.0.0/24", "vpcId": "vpc-1"}]
                    }]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(subscription.id, 1234);
        let networking = &subscription.cloud_details[0].regions[0].networking[0];
        assert_eq!(networking.deployment_cidr.as_deref(), Some("10.0.0.0/24"));
    }
}
