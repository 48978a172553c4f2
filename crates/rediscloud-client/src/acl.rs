//! ACL rule, role, and user endpoints

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ACL_STATUS_ACTIVE: &str = "active";
pub const ACL_STATUS_PENDING: &str = "pending";
pub const ACL_STATUS_ERROR: &str = "error";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAclRuleRequest {
    pub name: String,
    pub redis_rule: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRule {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "acl")]
    pub rule: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAclRulesResponse {
    #[serde(default)]
    redis_rules: Vec<AclRule>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAclRoleRequest {
    pub name: String,
    pub redis_rules: Vec<RoleRedisRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleRedisRule {
    pub rule_name: String,
    pub databases: Vec<RoleDatabaseSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleDatabaseSpec {
    pub subscription_id: i64,
    pub database_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRole {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redis_rules: Vec<RoleRedisRule>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAclRolesResponse {
    #[serde(default)]
    roles: Vec<AclRole>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAclUserRequest {
    pub name: String,
    pub role: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAclUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAclUsersResponse {
    #[serde(default)]
    users: Vec<AclUser>,
}

/// ACL endpoints
#[derive(Clone)]
pub struct Acl {
    http: Arc<HttpClient>,
}

impl Acl {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    // -- rules --------------------------------------------------------------

    pub async fn list_rules(&self) -> Result<Vec<AclRule>> {
        let response: ListAclRulesResponse = self.http.get("/acl/redisRules").await?;
        Ok(response.redis_rules)
    }

    pub async fn get_rule(&self, id: i64) -> Result<AclRule> {
        self.list_rules()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(ApiError::AclRuleNotFound(id))
    }

    pub async fn create_rule(&self, request: &CreateAclRuleRequest) -> Result<String> {
        let created: TaskCreated = self.http.post("/acl/redisRules", request).await?;
        Ok(created.task_id)
    }

    pub async fn update_rule(&self, id: i64, request: &CreateAclRuleRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.put(&format!("/acl/redisRules/{id}"), request).await,
            || ApiError::AclRuleNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_rule(&self, id: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.delete(&format!("/acl/redisRules/{id}")).await,
            || ApiError::AclRuleNotFound(id),
        )?;
        Ok(created.task_id)
    }

    // -- roles --------------------------------------------------------------

    pub async fn list_roles(&self) -> Result<Vec<AclRole>> {
        let response: ListAclRolesResponse = self.http.get("/acl/roles").await?;
        Ok(response.roles)
    }

    pub async fn get_role(&self, id: i64) -> Result<AclRole> {
        self.list_roles()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(ApiError::AclRoleNotFound(id))
    }

    pub async fn create_role(&self, request: &CreateAclRoleRequest) -> Result<String> {
        let created: TaskCreated = self.http.post("/acl/roles", request).await?;
        Ok(created.task_id)
    }

    pub async fn update_role(&self, id: i64, request: &CreateAclRoleRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.put(&format!("/acl/roles/{id}"), request).await,
            || ApiError::AclRoleNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_role(&self, id: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.delete(&format!("/acl/roles/{id}")).await,
            || ApiError::AclRoleNotFound(id),
        )?;
        Ok(created.task_id)
    }

    // -- users --------------------------------------------------------------

    pub async fn list_users(&self) -> Result<Vec<AclUser>> {
        let response: ListAclUsersResponse = self.http.get("/acl/users").await?;
        Ok(response.users)
    }

    pub async fn get_user(&self, id: i64) -> Result<AclUser> {
        map_not_found(self.http.get(&format!("/acl/users/{id}")).await, || {
            ApiError::AclUserNotFound(id)
        })
    }

    pub async fn create_user(&self, request: &CreateAclUserRequest) -> Result<String> {
        let created: TaskCreated = self.http.post("/acl/users", request).await?;
        Ok(created.task_id)
    }

    pub async fn update_user(&self, id: i64, request: &UpdateAclUserRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.put(&format!("/acl/users/{id}"), request).await,
            || ApiError::AclUserNotFound(id),
        )?;
        Ok(created.task_id)
    }

    pub async fn delete_user(&self, id: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http.delete(&format!("/acl/users/{id}")).await,
            || ApiError::AclUserNotFound(id),
        )?;
        Ok(created.task_id)
    }
}
