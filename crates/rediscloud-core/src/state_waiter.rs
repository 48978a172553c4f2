//! State-change waiter
//!
//! Generic pending→target poller. The refresh callback reports the current
//! state (and optionally a value); the waiter returns the value once a target
//! state is observed, errors on a state outside pending ∪ target, and times
//! out at the configured cap. The future is cancel-safe: dropping it between
//! polls abandons the wait without side effects.

use crate::error::{CoreError, Result};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// One observation from the refresh callback
#[derive(Debug)]
pub struct Observed<T> {
    pub value: Option<T>,
    pub state: String,
}

impl<T> Observed<T> {
    pub fn new(value: T, state: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            state: state.into(),
        }
    }

    /// An observation with no value, e.g. "the resource is gone".
    pub fn state_only(state: impl Into<String>) -> Self {
        Self {
            value: None,
            state: state.into(),
        }
    }
}

/// Waiter parameters
#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub pending: Vec<&'static str>,
    pub target: Vec<&'static str>,
    pub delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitConfig {
    pub fn new(pending: Vec<&'static str>, target: Vec<&'static str>) -> Self {
        Self {
            pending,
            target,
            delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(10 * 60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Poll `refresh` until it reports a target state.
///
/// Returns the value observed at the target state (None when the refresh
/// reported the state without a value, e.g. deletion waits).
pub async fn wait_for_state<T, F, Fut>(config: &WaitConfig, refresh: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<T>>>,
{
    let mut last_state = String::new();
    let result = timeout(config.timeout, poll_loop(config, refresh, &mut last_state)).await;
    match result {
        Ok(outcome) => outcome,
        Err(_) => Err(CoreError::Timeout {
            timeout: config.timeout,
            target: config.target.iter().map(|s| s.to_string()).collect(),
            last_state,
        }),
    }
}

async fn poll_loop<T, F, Fut>(
    config: &WaitConfig,
    mut refresh: F,
    last_state: &mut String,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Observed<T>>>,
{
    sleep(config.delay).await;
    loop {
        let observed = refresh().await?;
        *last_state = observed.state.clone();

        if config.target.contains(&observed.state.as_str()) {
            tracing::debug!("reached target state {}", observed.state);
            return Ok(observed.value);
        }
        if !config.pending.contains(&observed.state.as_str()) {
            return Err(CoreError::UnexpectedState {
                state: observed.state,
                target: config.target.iter().map(|s| s.to_string()).collect(),
            });
        }

        tracing::debug!("state {} still pending", observed.state);
        sleep(config.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(pending: Vec<&'static str>, target: Vec<&'static str>) -> WaitConfig {
        WaitConfig::new(pending, target)
            .with_delay(Duration::from_millis(1))
            .with_poll_interval(Duration::from_millis(1))
            .with_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn returns_value_when_target_reached() {
        let polls = AtomicU32::new(0);
        let polls = &polls;
        let config = fast(vec!["pending"], vec!["active"]);
        let result = wait_for_state(&config, || async move {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Ok(Observed::new(n, "pending"))
            } else {
                Ok(Observed::new(n, "active"))
            }
        })
        .await
        .unwrap();
        assert_eq!(result, Some(3));
    }

    #[tokio::test]
    async fn unexpected_state_is_an_error() {
        let config = fast(vec!["pending"], vec!["active"]);
        let err = wait_for_state(&config, || async {
            Ok(Observed::<()>::state_only("error"))
        })
        .await
        .unwrap_err();
        match err {
            CoreError::UnexpectedState { state, target } => {
                assert_eq!(state, "error");
                assert_eq!(target, vec!["active".to_string()]);
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn times_out_with_last_state() {
        let config = fast(vec!["pending"], vec!["active"]);
        let err = wait_for_state(&config, || async {
            Ok(Observed::<()>::state_only("pending"))
        })
        .await
        .unwrap_err();
        match err {
            CoreError::Timeout { last_state, .. } => assert_eq!(last_state, "pending"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn refresh_errors_propagate() {
        let config = fast(vec!["pending"], vec!["active"]);
        let err = wait_for_state::<(), _, _>(&config, || async {
            Err(CoreError::validation("refresh broke"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn deletion_wait_returns_none() {
        let config = fast(vec!["deleting"], vec!["deleted"]);
        let result = wait_for_state::<(), _, _>(&config, || async {
            Ok(Observed::state_only("deleted"))
        })
        .await
        .unwrap();
        assert!(result.is_none());
    }
}
