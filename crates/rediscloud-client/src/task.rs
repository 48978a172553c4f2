//! Task envelope returned by mutating endpoints
//!
//! Every mutating call against the API answers with a task id. The task
//! endpoint is then polled until the task reaches a terminal status and
//! either carries a resource id or an error block.

use crate::error::Result;
use crate::http::{HttpClient, map_not_found};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

pub const TASK_STATUS_INITIALIZED: &str = "initialized";
pub const TASK_STATUS_RECEIVED: &str = "received";
pub const TASK_STATUS_PROCESSING_IN_PROGRESS: &str = "processing-in-progress";
pub const TASK_STATUS_PROCESSING_COMPLETED: &str = "processing-completed";

/// Statuses under which the task is still running.
pub const TASK_PENDING_STATUSES: [&str; 3] = [
    TASK_STATUS_INITIALIZED,
    TASK_STATUS_RECEIVED,
    TASK_STATUS_PROCESSING_IN_PROGRESS,
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub command_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response: Option<TaskResponse>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        !TASK_PENDING_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TASK_STATUS_PROCESSING_COMPLETED
    }

    /// Error block embedded in the response, if the task failed.
    pub fn error(&self) -> Option<&TaskError> {
        self.response.as_ref().and_then(|r| r.error.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(default)]
    pub resource_id: Option<i64>,
    #[serde(default)]
    pub additional_resource_id: Option<i64>,
    #[serde(default)]
    pub resource: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

/// Server-side failure description carried inside a task envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TaskError {
    /// Numeric code extracted from a status string like `"403 FORBIDDEN"`.
    pub fn status_code(&self) -> Option<u16> {
        let status = self.status.as_deref()?;
        let digits: String = status.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.status.as_deref().unwrap_or("unknown"),
            self.error_type.as_deref().unwrap_or("unknown"),
            self.description.as_deref().unwrap_or("no description")
        )
    }
}

/// Wire envelope answered by mutating endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub task_id: String,
}

/// Task endpoint
#[derive(Clone)]
pub struct Tasks {
    http: Arc<HttpClient>,
}

impl Tasks {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn get(&self, task_id: &str) -> Result<Task> {
        map_not_found(self.http.get(&format!("/tasks/{task_id}")).await, || {
            crate::error::ApiError::TaskNotFound(task_id.to_string())
        })
    }
}
