//! Task tracker
//!
//! Polls the task endpoint until the task settles, with exponential back-off
//! between polls. Transport and server-side HTTP failures are retried;
//! a task-level error block terminates the wait immediately. The caller's
//! timeout (applied by the surrounding waiter or host operation) bounds the
//! total duration; the loop itself is unbounded.

use crate::error::{CoreError, Result};
use rediscloud_client::ApiError;
use rediscloud_client::task::{TASK_PENDING_STATUSES, Task, TaskError, Tasks};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;

/// Back-off schedule between task polls
#[derive(Debug, Clone)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before poll number `attempt` (zero-based), doubling up to `max`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial
            .checked_mul(1u32 << attempt.min(31))
            .unwrap_or(self.max);
        doubled.min(self.max)
    }
}

fn task_failed(task_id: &str, error: &TaskError) -> CoreError {
    CoreError::TaskFailed {
        task_id: task_id.to_string(),
        error_type: error.error_type.clone().unwrap_or_default(),
        status: error.status.clone().unwrap_or_default(),
        description: error.description.clone().unwrap_or_default(),
    }
}

fn retryable(error: &ApiError) -> bool {
    matches!(error, ApiError::Transport(_) | ApiError::Api { .. })
}

/// Block until the task reaches a terminal status and return the envelope.
pub async fn wait_for_task(tasks: &Tasks, task_id: &str, backoff: &Backoff) -> Result<Task> {
    let mut attempt: u32 = 0;
    loop {
        match tasks.get(task_id).await {
            Ok(task) => {
                // A task-level error ends the wait even if the status still
                // claims the task is running.
                if let Some(error) = task.error() {
                    return Err(task_failed(task_id, error));
                }
                if task.is_completed() {
                    tracing::debug!("task {} completed", task_id);
                    return Ok(task);
                }
                if !TASK_PENDING_STATUSES.contains(&task.status.as_str()) {
                    return Err(CoreError::TaskFailed {
                        task_id: task_id.to_string(),
                        error_type: String::new(),
                        status: task.status.clone(),
                        description: task.description.clone().unwrap_or_default(),
                    });
                }
                tracing::debug!("task {} still {}, retrying", task_id, task.status);
            }
            Err(error) if retryable(&error) => {
                tracing::warn!("task {} poll failed, retrying: {}", task_id, error);
            }
            Err(error) => return Err(error.into()),
        }

        sleep(backoff.delay_for_attempt(attempt)).await;
        attempt = attempt.saturating_add(1);
    }
}

/// Wait for the task and extract the integer resource id it produced.
pub async fn wait_for_resource_id(tasks: &Tasks, task_id: &str, backoff: &Backoff) -> Result<i64> {
    let task = wait_for_task(tasks, task_id, backoff).await?;
    task.response
        .and_then(|r| r.resource_id)
        .ok_or_else(|| CoreError::TaskMissingResource(task_id.to_string()))
}

/// Wait for the task and marshal its embedded resource payload into `T`.
pub async fn wait_for_resource<T: DeserializeOwned>(
    tasks: &Tasks,
    task_id: &str,
    backoff: &Backoff,
) -> Result<T> {
    let task = wait_for_task(tasks, task_id, backoff).await?;
    let payload = task
        .response
        .and_then(|r| r.resource)
        .ok_or_else(|| CoreError::TaskMissingPayload(task_id.to_string()))?;
    Ok(serde_json::from_value(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(16));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_secs(30));
        assert_eq!(backoff.delay_for_attempt(20), Duration::from_secs(30));
        // absurd attempt numbers must not overflow
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn transport_errors_are_retryable() {
        assert!(retryable(&ApiError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }));
        assert!(!retryable(&ApiError::SubscriptionNotFound(1)));
    }
}
