//! Resource controller contract
//!
//! Each resource kind implements [`Resource`]: the CRUD callbacks the host
//! invokes, an importer that parses the external composite id, and the
//! per-operation timeout defaults. Controllers share a [`Context`] carrying
//! the API client, the subscription lock registry, and polling cadence.

use async_trait::async_trait;
use rediscloud_client::Client;
use rediscloud_core::task_waiter::Backoff;
use rediscloud_core::{ResourceData, Result, SubscriptionLocks};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

/// Hard ceiling on any single status wait, regardless of configured timeout.
pub const SAFETY_CAP: Duration = Duration::from_secs(6 * 60 * 60);

/// Per-operation timeout defaults
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(10 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(10 * 60),
        }
    }
}

impl Timeouts {
    /// Clamp a configured timeout to the global safety cap.
    pub fn capped(timeout: Duration) -> Duration {
        timeout.min(SAFETY_CAP)
    }
}

/// Outcome of a Read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The resource exists; state was refreshed.
    InState,
    /// The API reported the resource gone; the host drops it from state.
    Removed,
}

/// Polling cadence for status waits
#[derive(Debug, Clone, Copy)]
pub struct Polling {
    pub delay: Duration,
    pub interval: Duration,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            interval: Duration::from_secs(10),
        }
    }
}

/// Shared dependencies handed to every controller call
pub struct Context {
    pub client: Client,
    pub locks: Arc<SubscriptionLocks>,
    pub backoff: Backoff,
    pub polling: Polling,
}

impl Context {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            locks: Arc::new(SubscriptionLocks::new()),
            backoff: Backoff::default(),
            polling: Polling::default(),
        }
    }

    /// Millisecond-scale cadence for tests against a mock server.
    pub fn with_fast_polling(client: Client) -> Self {
        Self {
            client,
            locks: Arc::new(SubscriptionLocks::new()),
            backoff: Backoff {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(5),
            },
            polling: Polling {
                delay: Duration::from_millis(1),
                interval: Duration::from_millis(1),
            },
        }
    }

    /// Serialise against every other mutation of this subscription.
    pub async fn lock_subscription(&self, subscription: i64) -> OwnedMutexGuard<()> {
        self.locks.lock(subscription).await
    }
}

/// One managed resource kind
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;
    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome>;
    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;
    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;

    /// Parse an externally-supplied composite id into importable state.
    ///
    /// Rejects malformed ids before any API call; the follow-up Read fills
    /// the attributes.
    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        data.set_id(id);
        Ok(())
    }
}

/// One read-only data source
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Data sources never take the subscription lock; they may observe
    /// transient intermediate states and must tolerate them.
    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<()>;
}
