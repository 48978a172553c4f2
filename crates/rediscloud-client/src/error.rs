//! Redis Cloud API error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(i64),

    #[error("database {database} not found in subscription {subscription}")]
    DatabaseNotFound { subscription: i64, database: i64 },

    #[error("region not found: {0}")]
    RegionNotFound(String),

    #[error("VPC peering {peering} not found in subscription {subscription}")]
    PeeringNotFound { subscription: i64, peering: i64 },

    #[error("transit gateway attachment not found: {0}")]
    TgwAttachmentNotFound(String),

    #[error("transit gateway invitation not found: {0}")]
    TgwInvitationNotFound(i64),

    #[error("PrivateLink not found for subscription {0}")]
    PrivateLinkNotFound(i64),

    #[error("Private Service Connect service not found for subscription {0}")]
    PscServiceNotFound(i64),

    #[error("Private Service Connect endpoint not found: {0}")]
    PscEndpointNotFound(i64),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("ACL rule not found: {0}")]
    AclRuleNotFound(i64),

    #[error("ACL role not found: {0}")]
    AclRoleNotFound(i64),

    #[error("ACL user not found: {0}")]
    AclUserNotFound(i64),

    #[error("cloud account not found: {0}")]
    CloudAccountNotFound(i64),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// True for every typed absence, regardless of entity kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::SubscriptionNotFound(_)
                | ApiError::DatabaseNotFound { .. }
                | ApiError::RegionNotFound(_)
                | ApiError::PeeringNotFound { .. }
                | ApiError::TgwAttachmentNotFound(_)
                | ApiError::TgwInvitationNotFound(_)
                | ApiError::PrivateLinkNotFound(_)
                | ApiError::PscServiceNotFound(_)
                | ApiError::PscEndpointNotFound(_)
                | ApiError::TaskNotFound(_)
                | ApiError::AclRuleNotFound(_)
                | ApiError::AclRoleNotFound(_)
                | ApiError::AclUserNotFound(_)
                | ApiError::CloudAccountNotFound(_)
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
