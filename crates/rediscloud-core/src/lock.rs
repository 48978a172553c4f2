//! Per-subscription mutation lock
//!
//! The control-plane API rejects concurrent mutations against the same
//! subscription, so every mutating operation holds the subscription's mutex
//! for its full duration, task waits included. Mutexes are created lazily
//! and live for the process lifetime; the set of subscription ids is small
//! enough that the registry never needs to shrink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Registry of one async mutex per subscription id
#[derive(Debug, Default)]
pub struct SubscriptionLocks {
    registry: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl SubscriptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, subscription: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut registry = match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(
            registry
                .entry(subscription)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Acquire the mutation lock for a subscription.
    ///
    /// The guard releases on drop, which also covers cancellation: a dropped
    /// mutation future releases the lock on its way out.
    pub async fn lock(&self, subscription: i64) -> OwnedMutexGuard<()> {
        tracing::debug!("acquiring lock for subscription {}", subscription);
        let guard = self.entry(subscription).lock_owned().await;
        tracing::debug!("acquired lock for subscription {}", subscription);
        guard
    }

    /// Number of registered subscription mutexes (diagnostic only).
    pub fn len(&self) -> usize {
        match self.registry.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_subscription_is_serialised() {
        let locks = Arc::new(SubscriptionLocks::new());
        let concurrent = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(42).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_subscriptions_proceed_in_parallel() {
        let locks = Arc::new(SubscriptionLocks::new());
        let guard_a = locks.lock(1).await;
        // Holding subscription 1 must not block subscription 2.
        let guard_b = tokio::time::timeout(Duration::from_millis(100), locks.lock(2))
            .await
            .expect("lock for unrelated subscription should not block");
        drop(guard_a);
        drop(guard_b);
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn dropping_the_guard_releases_the_lock() {
        let locks = SubscriptionLocks::new();
        {
            let _guard = locks.lock(7).await;
        }
        // Re-acquisition succeeds immediately once the guard is gone.
        let _guard = tokio::time::timeout(Duration::from_millis(100), locks.lock(7))
            .await
            .expect("lock should be free after guard drop");
    }
}
