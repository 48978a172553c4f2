//! Cloud account and payment method endpoints

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CLOUD_ACCOUNT_STATUS_ACTIVE: &str = "active";
pub const CLOUD_ACCOUNT_STATUS_DRAFT: &str = "draft";
pub const CLOUD_ACCOUNT_STATUS_ERROR: &str = "error";

/// Cloud-account id the API reserves for Redis-internal resources. Used for
/// active-active subscriptions, which always deploy into the internal account.
pub const INTERNAL_CLOUD_ACCOUNT_ID: i64 = 1;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCloudAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_login_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccount {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCloudAccountsResponse {
    #[serde(default)]
    cloud_accounts: Vec<CloudAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub method_type: Option<String>,
    #[serde(default)]
    pub credit_card_ending_in: Option<i64>,
    #[serde(default)]
    pub expiration_month: Option<i64>,
    #[serde(default)]
    pub expiration_year: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPaymentMethodsResponse {
    #[serde(default)]
    payment_methods: Vec<PaymentMethod>,
}

/// Account-level endpoints
#[derive(Clone)]
pub struct Accounts {
    http: Arc<HttpClient>,
}

impl Accounts {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn list_cloud_accounts(&self) -> Result<Vec<CloudAccount>> {
        let response: ListCloudAccountsResponse = self.http.get("/cloud-accounts").await?;
        Ok(response.cloud_accounts)
    }

    pub async fn get_cloud_account(&self, id: i64) -> Result<CloudAccount> {
        map_not_found(self.http.get(&format!("/cloud-accounts/{id}")).await, || {
            ApiError::CloudAccountNotFound(id)
        })
    }

    pub async fn create_cloud_account(
        &self,
        request: &CreateCloudAccountRequest,
    ) -> Result<String> {
        let created: TaskCreated = self.http.post("/cloud-accounts", request).await?;
        Ok(created.task_id)
    }

    pub async fn update_cloud_account(
        &self,
        id: i64,
        request: &CreateCloudAccountRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.put(&format!("/cloud-accounts/{id}"), request).await,
            || ApiError::CloudAccountNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_cloud_account(&self, id: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.delete(&format!("/cloud-accounts/{id}")).await,
            || ApiError::CloudAccountNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let response: ListPaymentMethodsResponse = self.http.get("/payment-methods").await?;
        Ok(response.payment_methods)
    }
}
