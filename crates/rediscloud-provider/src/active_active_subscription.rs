//! Active-active subscription controller
//!
//! Same lifecycle as the single-region subscription, but the creation plan
//! carries per-region write/read throughput, the deployment type is pinned,
//! and deployment always lands in the Redis-internal cloud account.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::subscription::{SubscriptionResource, validate_creation_plan};
use crate::translate;
use crate::waits;
use async_trait::async_trait;
use rediscloud_client::account::INTERNAL_CLOUD_ACCOUNT_ID;
use rediscloud_client::subscription::{
    CreateCloudProvider, CreateDatabaseSpec, CreateNetworking, CreateRegion,
    CreateSubscriptionRequest, DEPLOYMENT_TYPE_ACTIVE_ACTIVE, Throughput,
};
use rediscloud_core::ids::parse_scalar_id;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};

pub struct ActiveActiveSubscriptionResource;

impl ActiveActiveSubscriptionResource {
    fn build_create_request(data: &ResourceData) -> Result<CreateSubscriptionRequest> {
        validate_creation_plan(data)?;
        let plan = translate::single_block(data, "creation_plan")
            .ok_or_else(|| CoreError::validation("a creation_plan block is required"))?;

        let regions = plan
            .get("region")
            .and_then(AttrValue::as_items)
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                CoreError::validation("creation_plan needs at least one region block")
            })?
            .iter()
            .filter_map(AttrValue::as_map)
            .map(|region| CreateRegion {
                region: translate::map_str(region, "region"),
                multiple_availability_zones: None,
                preferred_availability_zones: None,
                networking: Some(CreateNetworking {
                    deployment_cidr: translate::map_str(region, "networking_deployment_cidr"),
                    vpc_id: None,
                }),
                write_operations_per_second: translate::map_i64(
                    region,
                    "write_operations_per_second",
                ),
                read_operations_per_second: translate::map_i64(
                    region,
                    "read_operations_per_second",
                ),
            })
            .collect();

        let creation_plan = CreateDatabaseSpec {
            name: Some("creation-plan-db".to_string()),
            protocol: None,
            memory_limit_in_gb: translate::map_f64(&plan, "memory_limit_in_gb"),
            dataset_size_in_gb: translate::map_f64(&plan, "dataset_size_in_gb"),
            support_oss_cluster_api: translate::map_bool(&plan, "support_oss_cluster_api"),
            data_persistence: None,
            replication: None,
            throughput_measurement: None::<Throughput>,
            average_item_size_in_bytes: None,
            modules: translate::map_str_items(&plan, "modules").map(|names| {
                names
                    .into_iter()
                    .map(|name| rediscloud_client::subscription::DatabaseModuleSpec { name })
                    .collect()
            }),
            quantity: translate::map_i64(&plan, "quantity"),
        };

        Ok(CreateSubscriptionRequest {
            name: data.get_str("name"),
            deployment_type: Some(DEPLOYMENT_TYPE_ACTIVE_ACTIVE.to_string()),
            payment_method: data.get_str("payment_method"),
            payment_method_id: data.get_i64("payment_method_id"),
            memory_storage: None,
            persistent_storage_encryption: None,
            cloud_providers: vec![CreateCloudProvider {
                provider: data.get_str("cloud_provider"),
                cloud_account_id: Some(INTERNAL_CLOUD_ACCOUNT_ID),
                regions,
            }],
            databases: vec![creation_plan],
        })
    }
}

#[async_trait]
impl Resource for ActiveActiveSubscriptionResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_active_active_subscription"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let request = Self::build_create_request(data)?;

        let task_id = ctx.client.subscriptions().create(&request).await?;
        let subscription =
            wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(subscription.to_string());
        tracing::info!("created active-active subscription {}", subscription);

        let _guard = ctx.lock_subscription(subscription).await;
        waits::subscription_active(ctx, subscription, timeouts.create).await?;

        // Planner databases materialised from the creation plan are not user
        // resources.
        let planner = ctx.client.databases().list(subscription).await?;
        for database in planner {
            let task_id = ctx.client.databases().delete(subscription, database.id).await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            waits::subscription_active(ctx, subscription, timeouts.create).await?;
        }
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
        if let Some(detail) = subscription.cloud_details.first() {
            data.set(
                "cloud_provider",
                AttrValue::str(detail.provider.clone().unwrap_or_default()),
            );
        }
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        // Only name and payment method are mutable; region membership is the
        // regions resource's concern.
        SubscriptionResource.update(ctx, data).await
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        SubscriptionResource.delete(ctx, data).await
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        parse_scalar_id(id)?;
        data.set_id(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rediscloud_core::AttrMap;
    use std::collections::BTreeMap;

    fn region_block(name: &str, cidr: &str, write: i64, read: i64) -> AttrValue {
        let mut map = BTreeMap::new();
        map.insert("region".to_string(), AttrValue::str(name));
        map.insert(
            "networking_deployment_cidr".to_string(),
            AttrValue::str(cidr),
        );
        map.insert(
            "write_operations_per_second".to_string(),
            AttrValue::Int(write),
        );
        map.insert(
            "read_operations_per_second".to_string(),
            AttrValue::Int(read),
        );
        AttrValue::Map(map)
    }

    fn config_with_two_regions() -> AttrMap {
        let mut plan = BTreeMap::new();
        plan.insert("memory_limit_in_gb".to_string(), AttrValue::Float(1.0));
        plan.insert("quantity".to_string(), AttrValue::Int(1));
        plan.insert(
            "region".to_string(),
            AttrValue::Set(vec![
                region_block("us-east-1", "192.168.0.0/24", 1000, 1000),
                region_block("us-east-2", "10.0.1.0/24", 1000, 1000),
            ]),
        );

        let mut config = AttrMap::new();
        config.insert("name".to_string(), AttrValue::str("acc-test"));
        config.insert("cloud_provider".to_string(), AttrValue::str("AWS"));
        config.insert(
            "creation_plan".to_string(),
            AttrValue::List(vec![AttrValue::Map(plan)]),
        );
        config
    }

    #[test]
    fn request_pins_deployment_type_and_internal_account() {
        let data = ResourceData::new(config_with_two_regions());
        let request = ActiveActiveSubscriptionResource::build_create_request(&data).unwrap();
        assert_eq!(
            request.deployment_type.as_deref(),
            Some(DEPLOYMENT_TYPE_ACTIVE_ACTIVE)
        );
        assert_eq!(
            request.cloud_providers[0].cloud_account_id,
            Some(INTERNAL_CLOUD_ACCOUNT_ID)
        );
        assert_eq!(request.cloud_providers[0].regions.len(), 2);
        assert_eq!(
            request.cloud_providers[0].regions[0].write_operations_per_second,
            Some(1000)
        );
    }

    #[test]
    fn plan_without_regions_is_rejected() {
        let mut plan = BTreeMap::new();
        plan.insert("memory_limit_in_gb".to_string(), AttrValue::Float(1.0));
        let mut config = AttrMap::new();
        config.insert(
            "creation_plan".to_string(),
            AttrValue::List(vec![AttrValue::Map(plan)]),
        );
        let data = ResourceData::new(config);
        assert!(ActiveActiveSubscriptionResource::build_create_request(&data).is_err());
    }
}
