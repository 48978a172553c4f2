//! Private Service Connect controllers
//!
//! Three resources share the endpoint state machine:
//! `initialized → processing → pending → accept-/reject-pending →
//! active/rejected → deleted`. The service and endpoint resources only
//! create and delete; the accepter drives the accept/reject transition.

use crate::resource::{Context, ReadOutcome, Resource, Timeouts};
use async_trait::async_trait;
use rediscloud_client::psc::{
    CreatePscEndpointRequest, PSC_ENDPOINT_ACTION_ACCEPT, PSC_ENDPOINT_ACTION_REJECT,
    PSC_STATUS_ACCEPT_PENDING, PSC_STATUS_ACTIVE, PSC_STATUS_DELETED, PSC_STATUS_INITIALIZED,
    PSC_STATUS_PENDING, PSC_STATUS_PROCESSING, PSC_STATUS_REJECT_PENDING, PSC_STATUS_REJECTED,
    PscEndpoint, UpdatePscEndpointRequest,
};
use rediscloud_core::ids::{
    PscEndpointId, build_psc_endpoint_id, build_regional_id, parse_psc_endpoint_id,
    parse_regional_id, parse_scalar_id,
};
use rediscloud_core::state_waiter::{Observed, WaitConfig, wait_for_state};
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Service

pub struct PscServiceResource;

impl PscServiceResource {
    fn parse_id(id: &str) -> Result<(i64, Option<i64>)> {
        if let Ok(subscription) = parse_scalar_id(id) {
            return Ok((subscription, None));
        }
        let (subscription, region) = parse_regional_id(id)?;
        Ok((subscription, Some(region)))
    }
}

#[async_trait]
impl Resource for PscServiceResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_private_service_connect"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let region = data.get_i64("region_id");

        let _guard = ctx.lock_subscription(subscription).await;
        let task_id = ctx.client.psc().create_service(subscription, region).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        match region {
            Some(region) => data.set_id(build_regional_id(subscription, region)),
            None => data.set_id(subscription.to_string()),
        }
        tracing::info!("created PSC service {}", data.id());

        let config = WaitConfig::new(
            vec![
                PSC_STATUS_INITIALIZED,
                PSC_STATUS_PROCESSING,
                PSC_STATUS_PENDING,
            ],
            vec![PSC_STATUS_ACTIVE],
        )
        .with_delay(ctx.polling.delay)
        .with_poll_interval(ctx.polling.interval)
        .with_timeout(Timeouts::capped(self.timeouts().create));
        wait_for_state::<(), _, _>(&config, || async move {
            let service = ctx.client.psc().get_service(subscription, region).await?;
            Ok(Observed::state_only(service.status.unwrap_or_default()))
        })
        .await?;
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription, region) = Self::parse_id(data.id())?;
        let service = match ctx.client.psc().get_service(subscription, region).await {
            Ok(service) => service,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set(
            "psc_service_id",
            AttrValue::Int(service.id.unwrap_or_default()),
        );
        data.set(
            "connection_host_name",
            AttrValue::str(service.connection_host_name.unwrap_or_default()),
        );
        data.set(
            "status",
            AttrValue::str(service.status.unwrap_or_default()),
        );
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(CoreError::validation(
            "a Private Service Connect service has no updatable attributes",
        ))
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region) = Self::parse_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;
        match ctx.client.psc().delete_service(subscription, region).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("PSC service {} already deleted", data.id());
            }
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let (subscription, region) = Self::parse_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        if let Some(region) = region {
            data.set("region_id", AttrValue::Int(region));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Endpoint

pub struct PscEndpointResource;

impl PscEndpointResource {
    fn ids_from_attrs(data: &ResourceData) -> Result<(i64, Option<i64>, i64)> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let service = data
            .get_i64("psc_service_id")
            .ok_or_else(|| CoreError::validation("psc_service_id is required"))?;
        Ok((subscription, data.get_i64("region_id"), service))
    }

    fn endpoint_into_attrs(endpoint: &PscEndpoint, data: &mut ResourceData) {
        data.set("endpoint_id", AttrValue::Int(endpoint.id));
        data.set(
            "gcp_project_id",
            AttrValue::str(endpoint.gcp_project_id.clone().unwrap_or_default()),
        );
        data.set(
            "gcp_vpc_name",
            AttrValue::str(endpoint.gcp_vpc_name.clone().unwrap_or_default()),
        );
        data.set(
            "gcp_vpc_subnet_name",
            AttrValue::str(endpoint.gcp_vpc_subnet_name.clone().unwrap_or_default()),
        );
        data.set(
            "endpoint_connection_name",
            AttrValue::str(endpoint.endpoint_connection_name.clone().unwrap_or_default()),
        );
        data.set(
            "status",
            AttrValue::str(endpoint.status.clone().unwrap_or_default()),
        );
        data.set(
            "service_attachments",
            AttrValue::List(
                endpoint
                    .service_attachments
                    .iter()
                    .map(|attachment| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "name".to_string(),
                            AttrValue::str(attachment.name.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "dns_record".to_string(),
                            AttrValue::str(attachment.dns_record.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "ip_address_name".to_string(),
                            AttrValue::str(attachment.ip_address_name.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "forwarding_rule_name".to_string(),
                            AttrValue::str(
                                attachment.forwarding_rule_name.clone().unwrap_or_default(),
                            ),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
    }
}

#[async_trait]
impl Resource for PscEndpointResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_private_service_connect_endpoint"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region, service) = Self::ids_from_attrs(data)?;
        let request = CreatePscEndpointRequest {
            gcp_project_id: data.get_str("gcp_project_id"),
            gcp_vpc_name: data.get_str("gcp_vpc_name"),
            gcp_vpc_subnet_name: data.get_str("gcp_vpc_subnet_name"),
            endpoint_connection_name: data.get_str("endpoint_connection_name"),
        };

        let _guard = ctx.lock_subscription(subscription).await;
        let task_id = ctx
            .client
            .psc()
            .create_endpoint(subscription, region, service, &request)
            .await?;
        let endpoint = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(build_psc_endpoint_id(&PscEndpointId {
            subscription,
            region,
            service,
            endpoint,
        }));
        tracing::info!("created PSC endpoint {}", data.id());
        drop(_guard);

        // The endpoint stays `initialized` until the GCP-side resources
        // exist; nothing to wait for here.
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_psc_endpoint_id(data.id())?;
        let endpoint = match ctx
            .client
            .psc()
            .get_endpoint(id.subscription, id.region, id.service, id.endpoint)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        if endpoint.status.as_deref() == Some(PSC_STATUS_DELETED) {
            data.clear_id();
            return Ok(ReadOutcome::Removed);
        }
        data.set("subscription_id", AttrValue::Int(id.subscription));
        if let Some(region) = id.region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("psc_service_id", AttrValue::Int(id.service));
        Self::endpoint_into_attrs(&endpoint, data);
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(CoreError::validation(
            "endpoint attributes force replacement; accept/reject is the accepter resource's concern",
        ))
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let id = parse_psc_endpoint_id(data.id())?;
        let _guard = ctx.lock_subscription(id.subscription).await;

        let endpoint = match ctx
            .client
            .psc()
            .get_endpoint(id.subscription, id.region, id.service, id.endpoint)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        if endpoint.status.as_deref() == Some(PSC_STATUS_INITIALIZED) {
            // Never connected on the GCP side: a direct delete works.
            let task_id = ctx
                .client
                .psc()
                .delete_endpoint(id.subscription, id.region, id.service, id.endpoint)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        } else {
            // Once connected, the endpoint disappears as a side effect of the
            // user tearing down the GCP resources; all we can do is watch.
            let config = WaitConfig::new(
                vec![
                    PSC_STATUS_PROCESSING,
                    PSC_STATUS_PENDING,
                    PSC_STATUS_ACCEPT_PENDING,
                    PSC_STATUS_REJECT_PENDING,
                    PSC_STATUS_ACTIVE,
                    PSC_STATUS_REJECTED,
                ],
                vec![PSC_STATUS_DELETED],
            )
            .with_delay(ctx.polling.delay)
            .with_poll_interval(ctx.polling.interval)
            .with_timeout(Timeouts::capped(timeouts.delete));
            wait_for_state::<(), _, _>(&config, || async move {
                match ctx
                    .client
                    .psc()
                    .get_endpoint(id.subscription, id.region, id.service, id.endpoint)
                    .await
                {
                    Ok(endpoint) => {
                        Ok(Observed::state_only(endpoint.status.unwrap_or_default()))
                    }
                    Err(error) if error.is_not_found() => {
                        Ok(Observed::state_only(PSC_STATUS_DELETED))
                    }
                    Err(error) => Err(error.into()),
                }
            })
            .await?;
        }
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let parsed = parse_psc_endpoint_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(parsed.subscription));
        if let Some(region) = parsed.region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("psc_service_id", AttrValue::Int(parsed.service));
        data.set("endpoint_id", AttrValue::Int(parsed.endpoint));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Endpoint accepter

pub struct PscEndpointAccepterResource;

impl PscEndpointAccepterResource {
    fn transition_for(action: &str) -> Result<(&'static [&'static str], &'static str)> {
        match action {
            PSC_ENDPOINT_ACTION_ACCEPT => Ok((
                &[
                    PSC_STATUS_PENDING,
                    PSC_STATUS_ACCEPT_PENDING,
                    PSC_STATUS_PROCESSING,
                ],
                PSC_STATUS_ACTIVE,
            )),
            PSC_ENDPOINT_ACTION_REJECT => Ok((
                &[
                    PSC_STATUS_PENDING,
                    PSC_STATUS_REJECT_PENDING,
                    PSC_STATUS_PROCESSING,
                ],
                PSC_STATUS_REJECTED,
            )),
            other => Err(CoreError::validation(format!(
                "action must be {PSC_ENDPOINT_ACTION_ACCEPT:?} or {PSC_ENDPOINT_ACTION_REJECT:?}, got {other:?}"
            ))),
        }
    }
}

#[async_trait]
impl Resource for PscEndpointAccepterResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_private_service_connect_endpoint_accepter"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let (subscription, region, service) = PscEndpointResource::ids_from_attrs(data)?;
        let endpoint = data
            .get_i64("endpoint_id")
            .ok_or_else(|| CoreError::validation("endpoint_id is required"))?;
        let action = data
            .get_str("action")
            .unwrap_or_else(|| PSC_ENDPOINT_ACTION_ACCEPT.to_string());
        let (pending_after, terminal) = Self::transition_for(&action)?;

        let _guard = ctx.lock_subscription(subscription).await;

        // The endpoint must first reach `pending` before the decision can be
        // submitted.
        let config = WaitConfig::new(
            vec![PSC_STATUS_INITIALIZED, PSC_STATUS_PROCESSING],
            vec![PSC_STATUS_PENDING, terminal],
        )
        .with_delay(ctx.polling.delay)
        .with_poll_interval(ctx.polling.interval)
        .with_timeout(Timeouts::capped(timeouts.create));
        let reached = wait_for_state(&config, || async move {
            let endpoint = ctx
                .client
                .psc()
                .get_endpoint(subscription, region, service, endpoint)
                .await?;
            let state = endpoint.status.clone().unwrap_or_default();
            Ok(Observed::new(endpoint, state))
        })
        .await?;

        let already_settled =
            reached.is_some_and(|endpoint| endpoint.status.as_deref() == Some(terminal));
        if !already_settled {
            let request = UpdatePscEndpointRequest {
                action: action.clone(),
            };
            let task_id = ctx
                .client
                .psc()
                .update_endpoint(subscription, region, service, endpoint, &request)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;

            let config = WaitConfig::new(pending_after.to_vec(), vec![terminal])
                .with_delay(ctx.polling.delay)
                .with_poll_interval(ctx.polling.interval)
                .with_timeout(Timeouts::capped(timeouts.create));
            wait_for_state::<(), _, _>(&config, || async move {
                let endpoint = ctx
                    .client
                    .psc()
                    .get_endpoint(subscription, region, service, endpoint)
                    .await?;
                Ok(Observed::state_only(endpoint.status.unwrap_or_default()))
            })
            .await?;
        }

        data.set_id(build_psc_endpoint_id(&PscEndpointId {
            subscription,
            region,
            service,
            endpoint,
        }));
        drop(_guard);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_psc_endpoint_id(data.id())?;
        let endpoint = match ctx
            .client
            .psc()
            .get_endpoint(id.subscription, id.region, id.service, id.endpoint)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("subscription_id", AttrValue::Int(id.subscription));
        if let Some(region) = id.region {
            data.set("region_id", AttrValue::Int(region));
        }
        data.set("psc_service_id", AttrValue::Int(id.service));
        data.set("endpoint_id", AttrValue::Int(id.endpoint));
        data.set(
            "status",
            AttrValue::str(endpoint.status.unwrap_or_default()),
        );
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, _ctx: &Context, _data: &mut ResourceData) -> Result<()> {
        Err(CoreError::validation(
            "an endpoint decision is final; recreate the accepter to change it",
        ))
    }

    /// Forgetting the accepter leaves the endpoint in whatever state the
    /// decision put it in.
    async fn delete(&self, _ctx: &Context, data: &mut ResourceData) -> Result<()> {
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        PscEndpointResource.import(id, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_transition_targets_active() {
        let (pending, terminal) =
            PscEndpointAccepterResource::transition_for("accept").unwrap();
        assert!(pending.contains(&PSC_STATUS_ACCEPT_PENDING));
        assert_eq!(terminal, PSC_STATUS_ACTIVE);
    }

    #[test]
    fn reject_transition_targets_rejected() {
        let (pending, terminal) =
            PscEndpointAccepterResource::transition_for("reject").unwrap();
        assert!(pending.contains(&PSC_STATUS_REJECT_PENDING));
        assert_eq!(terminal, PSC_STATUS_REJECTED);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(PscEndpointAccepterResource::transition_for("maybe").is_err());
    }
}
