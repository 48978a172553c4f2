//! Subscription controller
//!
//! Create sends the desired configuration plus a creation plan; the API
//! provisions capacity from the plan and materialises planner databases,
//! which are deleted here as soon as the subscription settles. Update is a
//! sequence of partial updates (subscription fields, CIDR allow list,
//! maintenance windows) with an active-wait between each.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::translate;
use crate::waits;
use async_trait::async_trait;
use rediscloud_client::subscription::{
    CreateSubscriptionRequest, MaintenanceWindows, UpdateCidrAllowlistRequest,
    UpdateSubscriptionRequest,
};
use rediscloud_core::ids::parse_scalar_id;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{CoreError, ResourceData, Result};

pub struct SubscriptionResource;

impl SubscriptionResource {
    fn build_create_request(data: &ResourceData) -> Result<CreateSubscriptionRequest> {
        let creation_plan = translate::creation_plan_from_attr(data)?;
        Ok(CreateSubscriptionRequest {
            name: data.get_str("name"),
            deployment_type: None,
            payment_method: data.get_str("payment_method"),
            payment_method_id: data.get_i64("payment_method_id"),
            memory_storage: data.get_str("memory_storage"),
            persistent_storage_encryption: data.get_bool("persistent_storage_encryption"),
            cloud_providers: translate::cloud_providers_from_attr(data)?,
            databases: vec![creation_plan],
        })
    }

    /// The API auto-creates databases from the creation plan; they are not
    /// user resources and are removed before the subscription is handed back.
    async fn delete_planner_databases(
        &self,
        ctx: &Context,
        subscription: i64,
        timeout: std::time::Duration,
    ) -> Result<()> {
        let planner = ctx.client.databases().list(subscription).await?;
        for database in planner {
            tracing::info!(
                "deleting planner database {} from subscription {}",
                database.id,
                subscription
            );
            let task_id = ctx.client.databases().delete(subscription, database.id).await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            waits::subscription_active(ctx, subscription, timeout).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for SubscriptionResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_subscription"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let request = Self::build_create_request(data)?;

        let task_id = ctx.client.subscriptions().create(&request).await?;
        let subscription =
            wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(subscription.to_string());
        tracing::info!("created subscription {}", subscription);

        let _guard = ctx.lock_subscription(subscription).await;
        waits::subscription_active(ctx, subscription, timeouts.create).await?;
        self.delete_planner_databases(ctx, subscription, timeouts.create).await?;
        waits::subscription_active(ctx, subscription, timeouts.create).await?;
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let subscription_id = parse_scalar_id(data.id())?;
        let subscription = match ctx.client.subscriptions().get(subscription_id).await {
            Ok(subscription) => subscription,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };

        translate::subscription_into_attrs(&subscription, data);

        // The semantic payment-method string is never returned by the API;
        // the stored value stands.
        let allowlist = ctx
            .client
            .subscriptions()
            .get_cidr_allowlist(subscription_id)
            .await?;
        translate::allowlist_into_attrs(&allowlist, data);

        let windows = ctx
            .client
            .subscriptions()
            .get_maintenance_windows(subscription_id)
            .await?;
        translate::maintenance_windows_into_attrs(&windows, data);

        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let subscription = parse_scalar_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        if data.has_change("name") || data.has_change("payment_method_id") {
            let request = UpdateSubscriptionRequest {
                name: data.get_str("name"),
                payment_method_id: data.get_i64("payment_method_id"),
            };
            let task_id = ctx.client.subscriptions().update(subscription, &request).await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            waits::subscription_active(ctx, subscription, timeouts.update).await?;
        }

        if data.has_change("allowlist") {
            let request = UpdateCidrAllowlistRequest {
                cidr_ips: translate::allowlist_cidrs_from_attr(data),
                security_group_ids: translate::allowlist_security_groups_from_attr(data),
            };
            let task_id = ctx
                .client
                .subscriptions()
                .update_cidr_allowlist(subscription, &request)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            waits::subscription_active(ctx, subscription, timeouts.update).await?;
        }

        if data.has_change("maintenance_windows") {
            let windows = translate::maintenance_windows_from_attr(data).unwrap_or(
                MaintenanceWindows {
                    mode: "automatic".to_string(),
                    windows: Vec::new(),
                },
            );
            ctx.client
                .subscriptions()
                .update_maintenance_windows(subscription, &windows)
                .await?;
            waits::subscription_active(ctx, subscription, timeouts.update).await?;
        }

        drop(_guard);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let subscription = parse_scalar_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        // Guard against a mutation still settling before draining databases.
        waits::subscription_active(ctx, subscription, timeouts.delete).await?;
        self.delete_planner_databases(ctx, subscription, timeouts.delete).await?;

        match ctx.client.subscriptions().delete(subscription).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("subscription {} already deleted", subscription);
                data.clear_id();
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }
        waits::subscription_deleted(ctx, subscription, timeouts.delete).await?;
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        parse_scalar_id(id)?;
        data.set_id(id);
        Ok(())
    }
}

/// Validate creation-plan constraints shared by both deployment variants.
pub fn validate_creation_plan(data: &ResourceData) -> Result<()> {
    let plan = data
        .get_items("creation_plan")
        .filter(|items| !items.is_empty())
        .ok_or_else(|| CoreError::validation("a creation_plan block is required"))?;
    let plan = plan[0]
        .as_map()
        .ok_or_else(|| CoreError::validation("creation_plan must be a block"))?;

    let memory = plan.get("memory_limit_in_gb").map(|v| !v.is_null()).unwrap_or(false);
    let dataset = plan.get("dataset_size_in_gb").map(|v| !v.is_null()).unwrap_or(false);
    if memory && dataset {
        return Err(CoreError::validation(
            "creation_plan sets both memory_limit_in_gb and dataset_size_in_gb; choose one",
        ));
    }
    if !memory && !dataset {
        return Err(CoreError::validation(
            "creation_plan needs one of memory_limit_in_gb or dataset_size_in_gb",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rediscloud_core::{AttrMap, AttrValue};
    use std::collections::BTreeMap;

    fn plan_attr(memory: Option<f64>, dataset: Option<f64>) -> ResourceData {
        let mut plan = BTreeMap::new();
        if let Some(memory) = memory {
            plan.insert("memory_limit_in_gb".to_string(), AttrValue::Float(memory));
        }
        if let Some(dataset) = dataset {
            plan.insert("dataset_size_in_gb".to_string(), AttrValue::Float(dataset));
        }
        let mut config = AttrMap::new();
        config.insert(
            "creation_plan".to_string(),
            AttrValue::List(vec![AttrValue::Map(plan)]),
        );
        ResourceData::new(config)
    }

    #[test]
    fn creation_plan_requires_exactly_one_size_field() {
        assert!(validate_creation_plan(&plan_attr(Some(1.0), None)).is_ok());
        assert!(validate_creation_plan(&plan_attr(None, Some(2.0))).is_ok());
        assert!(validate_creation_plan(&plan_attr(Some(1.0), Some(2.0))).is_err());
        assert!(validate_creation_plan(&plan_attr(None, None)).is_err());
    }

    #[test]
    fn missing_creation_plan_is_rejected() {
        let data = ResourceData::new(AttrMap::new());
        assert!(validate_creation_plan(&data).is_err());
    }
}
