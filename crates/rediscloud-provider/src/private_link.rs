//! PrivateLink controller
//!
//! The create endpoint takes exactly one principal, so Create issues the
//! share with the first principal, waits for the service to settle, and
//! attaches the rest one by one. Update reconciles the principal set by
//! set-difference; untouched principals see no API call.

use crate::resource::{Context, ReadOutcome, Resource, Timeouts};
use async_trait::async_trait;
use rediscloud_client::private_link::{
    CreatePrincipalRequest, CreatePrivateLinkRequest, PRIVATE_LINK_STATUS_ACTIVE,
    PRIVATE_LINK_STATUS_CREATE_REQUEST_RECEIVED, PRIVATE_LINK_STATUS_IN_PROGRESS, PrivateLink,
};
use rediscloud_core::ids::{build_regional_id, parse_regional_id, parse_scalar_id};
use rediscloud_core::state_waiter::{Observed, WaitConfig, wait_for_state};
use rediscloud_core::task_waiter::wait_for_task;
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;

pub struct PrivateLinkResource;

/// One desired principal from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredPrincipal {
    pub principal: String,
    pub principal_type: Option<String>,
    pub principal_alias: Option<String>,
}

/// Set-difference between desired and observed principals, keyed by the
/// principal identifier.
pub fn principal_changes(
    desired: &[DesiredPrincipal],
    observed: &[String],
) -> (Vec<DesiredPrincipal>, Vec<String>) {
    let to_add = desired
        .iter()
        .filter(|principal| !observed.contains(&principal.principal))
        .cloned()
        .collect();
    let to_remove = observed
        .iter()
        .filter(|principal| {
            !desired
                .iter()
                .any(|candidate| &&candidate.principal == principal)
        })
        .cloned()
        .collect();
    (to_add, to_remove)
}

impl PrivateLinkResource {
    fn parse_id(id: &str) -> Result<(i64, Option<i64>)> {
        // Pro links use the bare subscription id; active-active links carry
        // the region.
        if let Ok(subscription) = parse_scalar_id(id) {
            return Ok((subscription, None));
        }
        let (subscription, region) = parse_regional_id(id)?;
        Ok((subscription, Some(region)))
    }

    fn desired_principals(data: &ResourceData) -> Vec<DesiredPrincipal> {
        crate::translate::blocks(data, "principal")
            .iter()
            .map(|block| DesiredPrincipal {
                principal: crate::translate::map_str(block, "principal").unwrap_or_default(),
                principal_type: crate::translate::map_str(block, "principal_type"),
                principal_alias: crate::translate::map_str(block, "principal_alias"),
            })
            .collect()
    }

    fn link_into_attrs(link: &PrivateLink, data: &mut ResourceData) {
        data.set(
            "share_name",
            AttrValue::str(link.share_name.clone().unwrap_or_default()),
        );
        data.set(
            "status",
            AttrValue::str(link.status.clone().unwrap_or_default()),
        );
        data.set(
            "resource_configuration_id",
            AttrValue::str(link.resource_configuration_id.clone().unwrap_or_default()),
        );
        data.set(
            "resource_configuration_arn",
            AttrValue::str(link.resource_configuration_arn.clone().unwrap_or_default()),
        );
        data.set(
            "share_arn",
            AttrValue::str(link.share_arn.clone().unwrap_or_default()),
        );
        data.set(
            "principal",
            AttrValue::Set(
                link.principals
                    .iter()
                    .map(|principal| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "principal".to_string(),
                            AttrValue::str(&principal.principal),
                        );
                        if let Some(principal_type) = &principal.principal_type {
                            block.insert(
                                "principal_type".to_string(),
                                AttrValue::str(principal_type),
                            );
                        }
                        if let Some(alias) = &principal.principal_alias {
                            block.insert("principal_alias".to_string(), AttrValue::str(alias));
                        }
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
        data.set(
            "connections",
            AttrValue::List(
                link.connections
                    .iter()
                    .map(|connection| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "connection_id".to_string(),
                            AttrValue::str(connection.connection_id.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "connection_type".to_string(),
                            AttrValue::str(connection.connection_type.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "owner_id".to_string(),
                            AttrValue::str(connection.owner_id.clone().unwrap_or_default()),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
        data.set(
            "databases",
            AttrValue::List(
                link.databases
                    .iter()
                    .map(|database| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "database_id".to_string(),
                            AttrValue::Int(database.database_id.unwrap_or_default()),
                        );
                        block.insert(
                            "port".to_string(),
                            AttrValue::Int(database.port.unwrap_or_default()),
                        );
                        block.insert(
                            "resource_link_endpoint".to_string(),
                            AttrValue::str(
                                database.resource_link_endpoint.clone().unwrap_or_default(),
                            ),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
    }

    async fn wait_service_active(
        &self,
        ctx: &Context,
        subscription: i64,
        region: Option<i64>,
    ) -> Result<()> {
        let config = WaitConfig::new(
            vec![
                PRIVATE_LINK_STATUS_CREATE_REQUEST_RECEIVED,
                PRIVATE_LINK_STATUS_IN_PROGRESS,
            ],
            vec![PRIVATE_LINK_STATUS_ACTIVE],
        )
        .with_delay(ctx.polling.delay)
        .with_poll_interval(ctx.polling.interval)
        .with_timeout(Timeouts::capped(self.timeouts().create));
        wait_for_state::<(), _, _>(&config, || async move {
            let link = ctx.client.private_links().get(subscription, region).await?;
            Ok(Observed::state_only(link.status.unwrap_or_default()))
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for PrivateLinkResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_private_link"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let region = data.get_i64("region_id");
        let principals = Self::desired_principals(data);
        let Some((first, rest)) = principals.split_first() else {
            return Err(CoreError::validation(
                "at least one principal block is required",
            ));
        };

        let _guard = ctx.lock_subscription(subscription).await;
        let request = CreatePrivateLinkRequest {
            share_name: data.get_str("share_name"),
            principal: first.principal.clone(),
            principal_type: first.principal_type.clone(),
            principal_alias: first.principal_alias.clone(),
        };
        let task_id = ctx
            .client
            .private_links()
            .create(subscription, region, &request)
            .await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        match region {
            Some(region) => data.set_id(build_regional_id(subscription, region)),
            None => data.set_id(subscription.to_string()),
        }
        tracing::info!("created PrivateLink {}", data.id());

        self.wait_service_active(ctx, subscription, region).await?;

        // The create call only accepts one principal; attach the rest now.
        for principal in rest {
            let request = CreatePrincipalRequest {
                principal: principal.principal.clone(),
                principal_type: principal.principal_type.clone(),
                principal_alias: principal.principal_alias.clone(),
            };
            let task_id = ctx
                .client
                .private_links()
                .create_principal(subscription, region, &request)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        }
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription, region) = Self::parse_id(data.id())?;
        let link = match ctx.client.private_links().get(subscription, region).await {
            Ok(link) => link,
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
        Self::link_into_attrs(&link, data);
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region) = Self::parse_id(data.id())?;
        let desired = Self::desired_principals(data);

        let _guard = ctx.lock_subscription(subscription).await;
        let link = ctx.client.private_links().get(subscription, region).await?;
        let observed: Vec<String> = link
            .principals
            .iter()
            .map(|principal| principal.principal.clone())
            .collect();
        let (to_add, to_remove) = principal_changes(&desired, &observed);

        for principal in to_add {
            tracing::info!("attaching PrivateLink principal {}", principal.principal);
            let request = CreatePrincipalRequest {
                principal: principal.principal,
                principal_type: principal.principal_type,
                principal_alias: principal.principal_alias,
            };
            let task_id = ctx
                .client
                .private_links()
                .create_principal(subscription, region, &request)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        }
        for principal in to_remove {
            tracing::info!("detaching PrivateLink principal {}", principal);
            let task_id = ctx
                .client
                .private_links()
                .delete_principal(subscription, region, &principal)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        }
        drop(_guard);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let (subscription, region) = Self::parse_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        // No aggregate delete exists; the share dissolves with its last
        // principal.
        let link = match ctx.client.private_links().get(subscription, region).await {
            Ok(link) => link,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };
        for principal in &link.principals {
            let task_id = ctx
                .client
                .private_links()
                .delete_principal(subscription, region, &principal.principal)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn desired(principals: &[&str]) -> Vec<DesiredPrincipal> {
        principals
            .iter()
            .map(|principal| DesiredPrincipal {
                principal: principal.to_string(),
                principal_type: Some("aws_account".to_string()),
                principal_alias: None,
            })
            .collect()
    }

    #[test]
    fn set_diff_adds_and_removes_only_what_changed() {
        let observed = vec!["arn:a".to_string(), "arn:b".to_string()];
        let (to_add, to_remove) = principal_changes(&desired(&["arn:a", "arn:c"]), &observed);
        assert_eq!(to_add.len(), 1);
        assert_eq!(to_add[0].principal, "arn:c");
        assert_eq!(to_remove, vec!["arn:b".to_string()]);
    }

    #[test]
    fn identical_sets_produce_no_changes() {
        let observed = vec!["arn:a".to_string()];
        let (to_add, to_remove) = principal_changes(&desired(&["arn:a"]), &observed);
        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }

    #[test]
    fn id_parses_both_shapes() {
        assert_eq!(PrivateLinkResource::parse_id("12").unwrap(), (12, None));
        assert_eq!(
            PrivateLinkResource::parse_id("12/7").unwrap(),
            (12, Some(7))
        );
        assert!(PrivateLinkResource::parse_id("12/7/9").is_err());
    }
}
