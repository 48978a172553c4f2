//! Transit Gateway attachment and invitation endpoints
//!
//! Attachments exist per subscription (Pro) or per subscription region
//! (active-active); the optional `region` argument selects the path shape.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const TGW_ATTACHMENT_STATUS_AVAILABLE: &str = "available";
pub const TGW_ATTACHMENT_STATUS_PENDING_ACCEPTANCE: &str = "pending-acceptance";

pub const TGW_INVITATION_STATUS_PENDING: &str = "pending";
pub const TGW_INVITATION_STATUS_ACCEPTED: &str = "accepted";
pub const TGW_INVITATION_STATUS_REJECTED: &str = "rejected";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTgwCidrsRequest {
    pub cidrs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgwAttachment {
    pub id: i64,
    #[serde(default)]
    pub aws_tgw_uid: Option<String>,
    #[serde(default)]
    pub attachment_uid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attachment_status: Option<String>,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub cidrs: Vec<TgwCidr>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgwCidr {
    #[serde(default)]
    pub cidr_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListTgwResponse {
    #[serde(default)]
    transit_gateway_attachment: Vec<TgwAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgwInvitation {
    pub id: i64,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub aws_tgw_uid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInvitationsResponse {
    #[serde(default)]
    invitations: Vec<TgwInvitation>,
}

fn scope(subscription: i64, region: Option<i64>) -> String {
    match region {
        Some(region) => format!("/subscriptions/{subscription}/regions/{region}"),
        None => format!("/subscriptions/{subscription}"),
    }
}

/// Transit Gateway endpoints
#[derive(Clone)]
pub struct TransitGateways {
    http: Arc<HttpClient>,
}

impl TransitGateways {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn list_attachments(
        &self,
        subscription: i64,
        region: Option<i64>,
    ) -> Result<Vec<TgwAttachment>> {
        let response: ListTgwResponse = map_not_found(
            self.http
                .get(&format!("{}/transitGateways", scope(subscription, region)))
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(response.transit_gateway_attachment)
    }

    /// Create an attachment to the referenced gateway. CIDRs cannot be
    /// supplied here; they are pushed after the share invitation is accepted.
    pub async fn create_attachment(
        &self,
        subscription: i64,
        region: Option<i64>,
        tgw: i64,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(
                    &format!(
                        "{}/transitGateways/{tgw}/attachment",
                        scope(subscription, region)
                    ),
                    &serde_json::json!({}),
                )
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    /// Replace the attachment's CIDR list.
    pub async fn update_attachment_cidrs(
        &self,
        subscription: i64,
        region: Option<i64>,
        attachment: i64,
        request: &UpdateTgwCidrsRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!(
                        "{}/transitGateways/attachments/{attachment}",
                        scope(subscription, region)
                    ),
                    request,
                )
                .await,
            || ApiError::TgwAttachmentNotFound(attachment.to_string()),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_attachment(
        &self,
        subscription: i64,
        region: Option<i64>,
        attachment: i64,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete(&format!(
                    "{}/transitGateways/attachments/{attachment}",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::TgwAttachmentNotFound(attachment.to_string()),
        )?;
        Ok(created.task_id)
    }

    pub async fn list_invitations(
        &self,
        subscription: i64,
        region: Option<i64>,
    ) -> Result<Vec<TgwInvitation>> {
        let response: ListInvitationsResponse = map_not_found(
            self.http
                .get(&format!(
                    "{}/transitGateways/invitations",
                    scope(subscription, region)
                ))
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(response.invitations)
    }

    pub async fn accept_invitation(
        &self,
        subscription: i64,
        region: Option<i64>,
        invitation: i64,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!(
                        "{}/transitGateways/invitations/{invitation}/accept",
                        scope(subscription, region)
                    ),
                    &serde_json::json!({}),
                )
                .await,
            || ApiError::TgwInvitationNotFound(invitation),
        )?;
        Ok(created.task_id)
    }

    pub async fn reject_invitation(
        &self,
        subscription: i64,
        region: Option<i64>,
        invitation: i64,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!(
                        "{}/transitGateways/invitations/{invitation}/reject",
                        scope(subscription, region)
                    ),
                    &serde_json::json!({}),
                )
                .await,
            || ApiError::TgwInvitationNotFound(invitation),
        )?;
        Ok(created.task_id)
    }
}
