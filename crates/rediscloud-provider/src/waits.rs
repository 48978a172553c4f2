//! Shared status waits over subscriptions and databases
//!
//! Thin specialisations of the generic state waiter, used by every
//! controller that mutates a subscription or its children.

use crate::resource::{Context, Timeouts};
use rediscloud_client::database::{
    DATABASE_STATUS_ACTIVE, DATABASE_STATUS_ACTIVE_CHANGE_DRAFT,
    DATABASE_STATUS_ACTIVE_CHANGE_PENDING, DATABASE_STATUS_DRAFT,
    DATABASE_STATUS_DYNAMIC_ENDPOINTS_CREATION_PENDING, DATABASE_STATUS_PENDING, Database,
};
use rediscloud_client::subscription::{
    SUBSCRIPTION_STATUS_ACTIVE, SUBSCRIPTION_STATUS_DELETING, SUBSCRIPTION_STATUS_PENDING,
    Subscription,
};
use rediscloud_core::state_waiter::{Observed, WaitConfig, wait_for_state};
use rediscloud_core::{CoreError, Result};
use std::time::Duration;

const STATE_PRESENT: &str = "present";
const STATE_DELETED: &str = "deleted";

fn configure(ctx: &Context, mut config: WaitConfig, timeout: Duration) -> WaitConfig {
    config.delay = ctx.polling.delay;
    config.poll_interval = ctx.polling.interval;
    config.timeout = Timeouts::capped(timeout);
    config
}

/// Wait until the subscription reports `active`.
pub async fn subscription_active(
    ctx: &Context,
    subscription: i64,
    timeout: Duration,
) -> Result<Subscription> {
    let config = configure(
        ctx,
        WaitConfig::new(
            vec![SUBSCRIPTION_STATUS_PENDING],
            vec![SUBSCRIPTION_STATUS_ACTIVE],
        ),
        timeout,
    );
    tracing::debug!("waiting for subscription {} to become active", subscription);
    let observed = wait_for_state(&config, || async move {
        let subscription = ctx.client.subscriptions().get(subscription).await?;
        let state = subscription.status.clone().unwrap_or_default();
        Ok(Observed::new(subscription, state))
    })
    .await?;
    observed.ok_or_else(|| CoreError::validation("subscription wait returned no value"))
}

/// Wait until the subscription is gone (Get reports not-found).
pub async fn subscription_deleted(ctx: &Context, subscription: i64, timeout: Duration) -> Result<()> {
    let config = configure(
        ctx,
        WaitConfig::new(
            vec![
                SUBSCRIPTION_STATUS_ACTIVE,
                SUBSCRIPTION_STATUS_PENDING,
                SUBSCRIPTION_STATUS_DELETING,
            ],
            vec![STATE_DELETED],
        ),
        timeout,
    );
    tracing::debug!("waiting for subscription {} to be deleted", subscription);
    wait_for_state::<(), _, _>(&config, || async move {
        match ctx.client.subscriptions().get(subscription).await {
            Ok(subscription) => Ok(Observed::state_only(
                subscription.status.unwrap_or_default(),
            )),
            Err(error) if error.is_not_found() => Ok(Observed::state_only(STATE_DELETED)),
            Err(error) => Err(error.into()),
        }
    })
    .await?;
    Ok(())
}

/// Wait until the database reports `active`.
pub async fn database_active(
    ctx: &Context,
    subscription: i64,
    database: i64,
    timeout: Duration,
) -> Result<Database> {
    let config = configure(
        ctx,
        WaitConfig::new(
            vec![
                DATABASE_STATUS_DRAFT,
                DATABASE_STATUS_PENDING,
                DATABASE_STATUS_ACTIVE_CHANGE_PENDING,
                DATABASE_STATUS_ACTIVE_CHANGE_DRAFT,
                DATABASE_STATUS_DYNAMIC_ENDPOINTS_CREATION_PENDING,
            ],
            vec![DATABASE_STATUS_ACTIVE],
        ),
        timeout,
    );
    tracing::debug!(
        "waiting for database {}/{} to become active",
        subscription,
        database
    );
    let observed = wait_for_state(&config, || async move {
        let database = ctx.client.databases().get(subscription, database).await?;
        let state = database.status.clone().unwrap_or_default();
        Ok(Observed::new(database, state))
    })
    .await?;
    observed.ok_or_else(|| CoreError::validation("database wait returned no value"))
}

/// Wait until the database is gone (Get reports not-found).
pub async fn database_deleted(
    ctx: &Context,
    subscription: i64,
    database: i64,
    timeout: Duration,
) -> Result<()> {
    let config = configure(
        ctx,
        WaitConfig::new(vec![STATE_PRESENT], vec![STATE_DELETED]),
        timeout,
    );
    tracing::debug!("waiting for database {}/{} to disappear", subscription, database);
    wait_for_state::<(), _, _>(&config, || async move {
        match ctx.client.databases().get(subscription, database).await {
            Ok(_) => Ok(Observed::state_only(STATE_PRESENT)),
            Err(error) if error.is_not_found() => Ok(Observed::state_only(STATE_DELETED)),
            Err(error) => Err(error.into()),
        }
    })
    .await?;
    Ok(())
}
