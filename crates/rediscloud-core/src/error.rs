//! Core error taxonomy
//!
//! NotFound is recovered in Read paths (resource removed from state); every
//! other error propagates to the host untouched. Nothing is swallowed.

use rediscloud_client::ApiError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("task {task_id} failed: {status} - {error_type}: {description}")]
    TaskFailed {
        task_id: String,
        error_type: String,
        status: String,
        description: String,
    },

    #[error("task {0} completed without a resource id")]
    TaskMissingResource(String),

    #[error("task {0} completed without a resource payload")]
    TaskMissingPayload(String),

    #[error("unexpected state {state:?}, waiting for one of {target:?}")]
    UnexpectedState { state: String, target: Vec<String> },

    #[error("timed out after {timeout:?} waiting for one of {target:?} (last state: {last_state:?})")]
    Timeout {
        timeout: Duration,
        target: Vec<String>,
        last_state: String,
    },

    #[error("invalid resource id {0:?}")]
    InvalidId(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True when the underlying API reported a typed absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Api(e) if e.is_not_found())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
