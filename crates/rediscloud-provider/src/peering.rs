//! VPC peering controller
//!
//! Every attribute forces replacement, so Update is rejected outright. The
//! create waits for the peering to leave `initiating-request`; acceptance on
//! the far side happens out of band, so `pending-acceptance` and `inactive`
//! both count as settled.

use crate::resource::{Context, ReadOutcome, Resource, Timeouts};
use async_trait::async_trait;
use rediscloud_client::peering::{
    CreatePeeringRequest, PEERING_STATUS_ACTIVE, PEERING_STATUS_INACTIVE,
    PEERING_STATUS_INITIATING_REQUEST, PEERING_STATUS_PENDING_ACCEPTANCE, Peering,
};
use rediscloud_core::ids::{build_peering_id, parse_peering_id};
use rediscloud_core::state_waiter::{Observed, WaitConfig, wait_for_state};
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};

const PROVIDER_AWS: &str = "AWS";
const PROVIDER_GCP: &str = "GCP";

pub struct PeeringResource;

impl PeeringResource {
    fn build_create_request(data: &ResourceData) -> Result<CreatePeeringRequest> {
        let provider = data
            .get_str("provider_name")
            .unwrap_or_else(|| PROVIDER_AWS.to_string());
        match provider.as_str() {
            PROVIDER_AWS => Ok(CreatePeeringRequest {
                provider: Some(provider),
                aws_account_id: data.get_str("aws_account_id"),
                vpc_id: data.get_str("vpc_id"),
                vpc_cidr: data.get_str("vpc_cidr"),
                vpc_cidrs: data.get_ok("vpc_cidrs").and_then(AttrValue::as_str_items),
                region: data.get_str("region"),
                vpc_project_uid: None,
                vpc_network_name: None,
            }),
            PROVIDER_GCP => Ok(CreatePeeringRequest {
                provider: Some(provider),
                vpc_project_uid: data.get_str("gcp_project_id"),
                vpc_network_name: data.get_str("gcp_network_name"),
                ..Default::default()
            }),
            other => Err(CoreError::validation(format!(
                "unsupported peering provider {other:?}"
            ))),
        }
    }

    fn peering_into_attrs(peering: &Peering, data: &mut ResourceData) {
        data.set(
            "status",
            AttrValue::str(peering.status.clone().unwrap_or_default()),
        );
        if let Some(account) = &peering.aws_account_id {
            data.set("aws_account_id", AttrValue::str(account));
        }
        if let Some(vpc) = &peering.vpc_uid {
            data.set("vpc_id", AttrValue::str(vpc));
        }
        if let Some(cidr) = &peering.vpc_cidr {
            data.set("vpc_cidr", AttrValue::str(cidr));
        }
        if let Some(cidrs) = &peering.vpc_cidrs {
            data.set(
                "vpc_cidrs",
                AttrValue::str_set(
                    cidrs
                        .iter()
                        .filter_map(|cidr| cidr.vpc_cidr.clone()),
                ),
            );
        }
        if let Some(region) = &peering.region {
            data.set("region", AttrValue::str(region));
        }
        if let Some(peering_uid) = &peering.aws_peering_uid {
            data.set("aws_peering_id", AttrValue::str(peering_uid));
        }
        if let Some(project) = &peering.vpc_project_uid {
            data.set("gcp_project_id", AttrValue::str(project));
        }
        if let Some(network) = &peering.vpc_network_name {
            data.set("gcp_network_name", AttrValue::str(network));
        }
        if let Some(cloud_peering) = &peering.cloud_peering_id {
            data.set("gcp_redis_network_name", AttrValue::str(cloud_peering));
        }
    }
}

#[async_trait]
impl Resource for PeeringResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_subscription_peering"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let request = Self::build_create_request(data)?;

        let _guard = ctx.lock_subscription(subscription).await;
        let task_id = ctx.client.peerings().create(subscription, &request).await?;
        let peering = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(build_peering_id(subscription, peering));
        tracing::info!("created peering {}/{}", subscription, peering);

        let config = WaitConfig::new(
            vec![PEERING_STATUS_INITIATING_REQUEST],
            vec![
                PEERING_STATUS_ACTIVE,
                PEERING_STATUS_INACTIVE,
                PEERING_STATUS_PENDING_ACCEPTANCE,
            ],
        )
        .with_delay(ctx.polling.delay)
        .with_poll_interval(ctx.polling.interval)
        .with_timeout(Timeouts::capped(timeouts.create));
        wait_for_state(&config, || async move {
            let peering = ctx.client.peerings().get(subscription, peering).await?;
            let state = peering.status.clone().unwrap_or_default();
            Ok(Observed::new(peering, state))
        })
        .await?;
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription, peering_id) = parse_peering_id(data.id())?;
        let peering = match ctx.client.peerings().get(subscription, peering_id).await {
            Ok(peering) => peering,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("subscription_id", AttrValue::Int(subscription));
        Self::peering_into_attrs(&peering, data);
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(CoreError::validation(
            "peering attributes force replacement; there is nothing to update in place",
        ))
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, peering) = parse_peering_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;
        match ctx.client.peerings().delete(subscription, peering).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("peering {}/{} already deleted", subscription, peering);
            }
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let (subscription, _) = parse_peering_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rediscloud_core::AttrMap;

    #[test]
    fn aws_request_uses_aws_fields() {
        let mut config = AttrMap::new();
        config.insert("provider_name".to_string(), AttrValue::str("AWS"));
        config.insert("aws_account_id".to_string(), AttrValue::str("123456789012"));
        config.insert("vpc_id".to_string(), AttrValue::str("vpc-1"));
        config.insert("vpc_cidr".to_string(), AttrValue::str("10.0.0.0/16"));
        config.insert("region".to_string(), AttrValue::str("eu-west-1"));
        let request = PeeringResource::build_create_request(&ResourceData::new(config)).unwrap();
        assert_eq!(request.aws_account_id.as_deref(), Some("123456789012"));
        assert!(request.vpc_project_uid.is_none());
    }

    #[test]
    fn gcp_request_uses_gcp_fields() {
        let mut config = AttrMap::new();
        config.insert("provider_name".to_string(), AttrValue::str("GCP"));
        config.insert("gcp_project_id".to_string(), AttrValue::str("my-project"));
        config.insert("gcp_network_name".to_string(), AttrValue::str("my-network"));
        let request = PeeringResource::build_create_request(&ResourceData::new(config)).unwrap();
        assert_eq!(request.vpc_project_uid.as_deref(), Some("my-project"));
        assert!(request.aws_account_id.is_none());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = AttrMap::new();
        config.insert("provider_name".to_string(), AttrValue::str("Azure"));
        assert!(PeeringResource::build_create_request(&ResourceData::new(config)).is_err());
    }
}
