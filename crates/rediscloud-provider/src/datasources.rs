//! Read-only data sources
//!
//! Data sources never acquire the subscription lock; they may observe
//! intermediate states (size fields mid-resize, statuses in flight) and
//! simply report what they see.

use crate::resource::{Context, DataSource};
use crate::translate;
use async_trait::async_trait;
use rediscloud_client::account::INTERNAL_CLOUD_ACCOUNT_ID;
use rediscloud_core::filters::{Filters, single};
use rediscloud_core::state_waiter::{Observed, WaitConfig, wait_for_state};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Subscription

pub struct SubscriptionDataSource;

#[async_trait]
impl DataSource for SubscriptionDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_subscription"
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscriptions = ctx.client.subscriptions().list().await?;
        let filters = Filters::new().push_if(
            data.get_str("name"),
            |subscription: &rediscloud_client::subscription::Subscription, name| {
                subscription.name.as_deref() == Some(name.as_str())
            },
        );
        let subscription = single(filters.apply(subscriptions), "subscriptions")?;
        data.set_id(subscription.id.to_string());
        translate::subscription_into_attrs(&subscription, data);

        let pricing = ctx.client.subscriptions().get_pricing(subscription.id).await?;
        data.set(
            "pricing",
            AttrValue::List(
                pricing
                    .iter()
                    .map(|entry| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "database_name".to_string(),
                            AttrValue::str(entry.database_name.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "type".to_string(),
                            AttrValue::str(entry.pricing_type.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "quantity".to_string(),
                            AttrValue::Float(entry.quantity.unwrap_or_default()),
                        );
                        block.insert(
                            "quantity_measurement".to_string(),
                            AttrValue::str(entry.quantity_measurement.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "price_per_unit".to_string(),
                            AttrValue::Float(entry.price_per_unit.unwrap_or_default()),
                        );
                        block.insert(
                            "price_currency".to_string(),
                            AttrValue::str(entry.price_currency.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "price_period".to_string(),
                            AttrValue::str(entry.price_period.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "region".to_string(),
                            AttrValue::str(entry.region.clone().unwrap_or_default()),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Database

pub struct DatabaseDataSource;

#[async_trait]
impl DataSource for DatabaseDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_database"
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let databases = ctx.client.databases().list(subscription).await?;
        let filters = Filters::new()
            .push_if(data.get_str("name"), |database: &rediscloud_client::database::Database, name| {
                database.name.as_deref() == Some(name.as_str())
            })
            .push_if(data.get_str("protocol"), |database, protocol| {
                database.protocol.as_deref() == Some(protocol.as_str())
            });
        let database = single(filters.apply(databases), "databases")?;

        data.set_id(rediscloud_core::ids::build_database_id(
            subscription,
            database.id,
        ));
        data.set("db_id", AttrValue::Int(database.id));
        data.set(
            "name",
            AttrValue::str(database.name.clone().unwrap_or_default()),
        );
        data.set(
            "protocol",
            AttrValue::str(database.protocol.clone().unwrap_or_default()),
        );
        data.set(
            "status",
            AttrValue::str(database.status.clone().unwrap_or_default()),
        );
        // Transient mid-mutation reads may miss the size fields; null beats
        // a fabricated zero.
        match database.memory_limit_in_gb {
            Some(memory) => data.set("memory_limit_in_gb", AttrValue::Float(memory)),
            None => data.set_null("memory_limit_in_gb"),
        }
        match database.dataset_size_in_gb {
            Some(dataset) => data.set("dataset_size_in_gb", AttrValue::Float(dataset)),
            None => data.set_null("dataset_size_in_gb"),
        }
        data.set(
            "public_endpoint",
            AttrValue::str(database.public_endpoint.clone().unwrap_or_default()),
        );
        data.set(
            "private_endpoint",
            AttrValue::str(database.private_endpoint.clone().unwrap_or_default()),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Active-active regions

pub struct RegionsDataSource;

#[async_trait]
impl DataSource for RegionsDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_regions"
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let regions = ctx.client.regions().list(subscription).await?;
        data.set_id(subscription.to_string());
        data.set(
            "regions",
            AttrValue::List(
                regions
                    .iter()
                    .map(|region| {
                        let mut block = BTreeMap::new();
                        block.insert(
                            "region".to_string(),
                            AttrValue::str(region.region.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "region_id".to_string(),
                            AttrValue::Int(region.region_id.unwrap_or_default()),
                        );
                        block.insert(
                            "deployment_cidr".to_string(),
                            AttrValue::str(region.deployment_cidr.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "vpc_id".to_string(),
                            AttrValue::str(region.vpc_id.clone().unwrap_or_default()),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payment method

pub struct PaymentMethodDataSource;

#[async_trait]
impl DataSource for PaymentMethodDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_payment_method"
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let methods = ctx.client.accounts().list_payment_methods().await?;
        let filters = Filters::new()
            .push_if(data.get_str("card_type"), |method: &rediscloud_client::account::PaymentMethod, card_type| {
                method.method_type.as_deref() == Some(card_type.as_str())
            })
            .push_if(
                data.get_str("last_four_numbers"),
                |method, last_four| {
                    method
                        .credit_card_ending_in
                        .map(|ending| format!("{ending:04}"))
                        .as_deref()
                        == Some(last_four.as_str())
                },
            );
        let method = single(filters.apply(methods), "payment methods")?;
        data.set_id(method.id.to_string());
        data.set(
            "card_type",
            AttrValue::str(method.method_type.unwrap_or_default()),
        );
        if let Some(ending) = method.credit_card_ending_in {
            data.set("last_four_numbers", AttrValue::str(format!("{ending:04}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cloud account

pub struct CloudAccountDataSource;

#[async_trait]
impl DataSource for CloudAccountDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_cloud_account"
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let accounts = ctx.client.accounts().list_cloud_accounts().await?;
        let filters = Filters::new()
            // The internal account is not a user resource.
            .push(|account: &rediscloud_client::account::CloudAccount| {
                account.id != INTERNAL_CLOUD_ACCOUNT_ID
            })
            .push_if(data.get_str("name"), |account, name| {
                account.name.as_deref() == Some(name.as_str())
            })
            .push_if(data.get_str("provider_type"), |account, provider| {
                account.provider.as_deref() == Some(provider.as_str())
            });
        let account = single(filters.apply(accounts), "cloud accounts")?;
        data.set_id(account.id.to_string());
        data.set("name", AttrValue::str(account.name.unwrap_or_default()));
        data.set(
            "provider_type",
            AttrValue::str(account.provider.unwrap_or_default()),
        );
        if let Some(access_key_id) = account.access_key_id {
            data.set("access_key_id", AttrValue::str(access_key_id));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transit Gateway invitations

pub struct TgwInvitationsDataSource;

#[async_trait]
impl DataSource for TgwInvitationsDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_transit_gateway_invitations"
    }

    /// Lists pending invitations. With `wait_for_invitations_seconds` set,
    /// blocks until at least one invitation appears or the window elapses,
    /// so a single apply can race an out-of-band AWS RAM share.
    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let region = data.get_i64("region_id");

        let mut invitations = ctx
            .client
            .transit_gateways()
            .list_invitations(subscription, region)
            .await?;

        if invitations.is_empty()
            && let Some(wait_seconds) = data.get_i64("wait_for_invitations_seconds")
            && wait_seconds > 0
        {
            let config = WaitConfig::new(vec!["empty"], vec!["present"])
                .with_delay(ctx.polling.delay)
                .with_poll_interval(ctx.polling.interval)
                .with_timeout(Duration::from_secs(wait_seconds as u64));
            invitations = wait_for_state(&config, || async move {
                let invitations = ctx
                    .client
                    .transit_gateways()
                    .list_invitations(subscription, region)
                    .await?;
                if invitations.is_empty() {
                    Ok(Observed::state_only("empty"))
                } else {
                    Ok(Observed::new(invitations, "present"))
                }
            })
            .await?
            .unwrap_or_default();
        }

        data.set_id(subscription.to_string());
        data.set(
            "invitations",
            AttrValue::List(
                invitations
                    .iter()
                    .map(|invitation| {
                        let mut block = BTreeMap::new();
                        block.insert("id".to_string(), AttrValue::Int(invitation.id));
                        block.insert(
                            "aws_account_id".to_string(),
                            AttrValue::str(invitation.aws_account_id.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "aws_tgw_uid".to_string(),
                            AttrValue::str(invitation.aws_tgw_uid.clone().unwrap_or_default()),
                        );
                        block.insert(
                            "status".to_string(),
                            AttrValue::str(invitation.status.clone().unwrap_or_default()),
                        );
                        AttrValue::Map(block)
                    })
                    .collect(),
            ),
        );
        Ok(())
    }
}
