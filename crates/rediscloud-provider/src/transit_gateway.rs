//! Transit Gateway controllers
//!
//! The attachment resource cannot carry CIDRs at create time; the share
//! invitation has to be accepted first, after which Update replaces the full
//! CIDR list. The invitation acceptor is a separate resource so a single
//! apply can create the AWS-side share, accept it here, and then attach.

use crate::resource::{Context, ReadOutcome, Resource};
use async_trait::async_trait;
use rediscloud_client::transit_gateway::{
    TGW_INVITATION_STATUS_ACCEPTED, TGW_INVITATION_STATUS_REJECTED, TgwAttachment,
    UpdateTgwCidrsRequest,
};
use rediscloud_core::ids::{build_tgw_attachment_id, parse_tgw_attachment_id};
use rediscloud_core::task_waiter::wait_for_task;
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};

pub const INVITATION_ACTION_ACCEPT: &str = "accept";
pub const INVITATION_ACTION_REJECT: &str = "reject";

// ---------------------------------------------------------------------------
// Attachment

pub struct TgwAttachmentResource;

impl TgwAttachmentResource {
    fn attachment_into_attrs(attachment: &TgwAttachment, data: &mut ResourceData) {
        data.set(
            "status",
            AttrValue::str(attachment.status.clone().unwrap_or_default()),
        );
        data.set(
            "attachment_status",
            AttrValue::str(attachment.attachment_status.clone().unwrap_or_default()),
        );
        data.set(
            "aws_tgw_uid",
            AttrValue::str(attachment.aws_tgw_uid.clone().unwrap_or_default()),
        );
        data.set(
            "attachment_uid",
            AttrValue::str(attachment.attachment_uid.clone().unwrap_or_default()),
        );
        data.set(
            "aws_account_id",
            AttrValue::str(attachment.aws_account_id.clone().unwrap_or_default()),
        );
        data.set(
            "cidrs",
            AttrValue::str_list(
                attachment
                    .cidrs
                    .iter()
                    .filter_map(|cidr| cidr.cidr_address.clone()),
            ),
        );
    }

    async fn find_attachment(
        ctx: &Context,
        subscription: i64,
        region: Option<i64>,
        tgw: i64,
    ) -> Result<Option<TgwAttachment>> {
        let attachments = ctx
            .client
            .transit_gateways()
            .list_attachments(subscription, region)
            .await?;
        Ok(attachments.into_iter().find(|attachment| attachment.id == tgw))
    }
}

#[async_trait]
impl Resource for TgwAttachmentResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_transit_gateway_attachment"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let tgw = data
            .get_i64("tgw_id")
            .ok_or_else(|| CoreError::validation("tgw_id is required"))?;
        let region = data.get_i64("region_id");

        // The API rejects CIDRs before the invitation is accepted; catching
        // it here keeps the failure local and cheap.
        if data.get_ok("cidrs").is_some() {
            return Err(CoreError::validation(
                "cidrs cannot be set at create time; accept the share invitation first, then update",
            ));
        }

        let _guard = ctx.lock_subscription(subscription).await;
        let task_id = ctx
            .client
            .transit_gateways()
            .create_attachment(subscription, region, tgw)
            .await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(build_tgw_attachment_id(subscription, region, tgw));
        tracing::info!("created transit gateway attachment {}", data.id());
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription, region, tgw) = parse_tgw_attachment_id(data.id())?;
        let Some(attachment) = Self::find_attachment(ctx, subscription, region, tgw).await? else {
            data.clear_id();
            return Ok(ReadOutcome::Removed);
        };
        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("tgw_id", AttrValue::Int(tgw));
        Self::attachment_into_attrs(&attachment, data);
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region, tgw) = parse_tgw_attachment_id(data.id())?;
        let cidrs = data.get_str_items("cidrs").unwrap_or_default();

        let _guard = ctx.lock_subscription(subscription).await;
        let request = UpdateTgwCidrsRequest { cidrs };
        let task_id = ctx
            .client
            .transit_gateways()
            .update_attachment_cidrs(subscription, region, tgw, &request)
            .await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region, tgw) = parse_tgw_attachment_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;
        match ctx
            .client
            .transit_gateways()
            .delete_attachment(subscription, region, tgw)
            .await
        {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("attachment {} already deleted", data.id());
            }
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let (subscription, region, tgw) = parse_tgw_attachment_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("tgw_id", AttrValue::Int(tgw));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Invitation acceptor

pub struct TgwInvitationAccepterResource;

impl TgwInvitationAccepterResource {
    fn desired_terminal(action: &str) -> Result<&'static str> {
        match action {
            INVITATION_ACTION_ACCEPT => Ok(TGW_INVITATION_STATUS_ACCEPTED),
            INVITATION_ACTION_REJECT => Ok(TGW_INVITATION_STATUS_REJECTED),
            other => Err(CoreError::validation(format!(
                "action must be {INVITATION_ACTION_ACCEPT:?} or {INVITATION_ACTION_REJECT:?}, got {other:?}"
            ))),
        }
    }
}

#[async_trait]
impl Resource for TgwInvitationAccepterResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_transit_gateway_invitation_accepter"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let invitation = data
            .get_i64("invitation_id")
            .ok_or_else(|| CoreError::validation("invitation_id is required"))?;
        let region = data.get_i64("region_id");
        let action = data
            .get_str("action")
            .unwrap_or_else(|| INVITATION_ACTION_ACCEPT.to_string());
        let terminal = Self::desired_terminal(&action)?;

        let _guard = ctx.lock_subscription(subscription).await;
        let invitations = ctx
            .client
            .transit_gateways()
            .list_invitations(subscription, region)
            .await?;
        let current = invitations
            .iter()
            .find(|candidate| candidate.id == invitation)
            .ok_or(rediscloud_client::ApiError::TgwInvitationNotFound(invitation))?;

        // Re-running against an already-settled invitation is a no-op.
        if current.status.as_deref() == Some(terminal) {
            tracing::debug!("invitation {} already {}", invitation, terminal);
        } else {
            let task_id = match action.as_str() {
                INVITATION_ACTION_ACCEPT => {
                    ctx.client
                        .transit_gateways()
                        .accept_invitation(subscription, region, invitation)
                        .await?
                }
                _ => {
                    ctx.client
                        .transit_gateways()
                        .reject_invitation(subscription, region, invitation)
                        .await?
                }
            };
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        }

        data.set_id(rediscloud_core::ids::build_invitation_id(
            subscription,
            region,
            invitation,
        ));
        drop(_guard);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription, region, invitation) =
            rediscloud_core::ids::parse_invitation_id(data.id())?;
        let invitations = ctx
            .client
            .transit_gateways()
            .list_invitations(subscription, region)
            .await?;
        let Some(current) = invitations
            .into_iter()
            .find(|candidate| candidate.id == invitation)
        else {
            data.clear_id();
            return Ok(ReadOutcome::Removed);
        };

        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("invitation_id", AttrValue::Int(invitation));
        data.set(
            "status",
            AttrValue::str(current.status.unwrap_or_default()),
        );
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(CoreError::validation(
            "an invitation decision is final; recreate the accepter to change it",
        ))
    }

    /// Forgetting the accepter does not undo the remote decision.
    async fn delete(&self, _ctx: &Context, data: &mut ResourceData) -> Result<()> {
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let (subscription, region, invitation) = rediscloud_core::ids::parse_invitation_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("invitation_id", AttrValue::Int(invitation));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_terminal_statuses() {
        assert_eq!(
            TgwInvitationAccepterResource::desired_terminal("accept").unwrap(),
            TGW_INVITATION_STATUS_ACCEPTED
        );
        assert_eq!(
            TgwInvitationAccepterResource::desired_terminal("reject").unwrap(),
            TGW_INVITATION_STATUS_REJECTED
        );
        assert!(TgwInvitationAccepterResource::desired_terminal("ignore").is_err());
    }
}
