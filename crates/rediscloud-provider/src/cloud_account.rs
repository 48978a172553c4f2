//! Cloud account controller
//!
//! Stored credentials for a user-owned cloud account. The secret key and
//! console password are write-only; reads preserve the stored values.

use crate::resource::{Context, ReadOutcome, Resource};
use async_trait::async_trait;
use rediscloud_client::account::CreateCloudAccountRequest;
use rediscloud_core::ids::parse_scalar_id;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, ResourceData, Result};

pub struct CloudAccountResource;

impl CloudAccountResource {
    fn build_request(data: &ResourceData) -> CreateCloudAccountRequest {
        CreateCloudAccountRequest {
            name: data.get_str("name"),
            provider: data.get_str("provider_type"),
            access_key_id: data.get_str("access_key_id"),
            access_secret_key: data.get_str("access_secret_key"),
            console_username: data.get_str("console_username"),
            console_password: data.get_str("console_password"),
            sign_in_login_url: data.get_str("sign_in_login_url"),
        }
    }
}

#[async_trait]
impl Resource for CloudAccountResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_cloud_account"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let request = Self::build_request(data);
        let task_id = ctx.client.accounts().create_cloud_account(&request).await?;
        let account = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(account.to_string());
        tracing::info!("created cloud account {}", account);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_scalar_id(data.id())?;
        let account = match ctx.client.accounts().get_cloud_account(id).await {
            Ok(account) => account,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("name", AttrValue::str(account.name.unwrap_or_default()));
        data.set(
            "provider_type",
            AttrValue::str(account.provider.unwrap_or_default()),
        );
        data.set(
            "status",
            AttrValue::str(account.status.unwrap_or_default()),
        );
        if let Some(access_key_id) = account.access_key_id {
            data.set("access_key_id", AttrValue::str(access_key_id));
        }
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        let request = Self::build_request(data);
        let task_id = ctx.client.accounts().update_cloud_account(id, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        match ctx.client.accounts().delete_cloud_account(id).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {}
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }
}
