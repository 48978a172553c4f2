//! ACL rule, role, and user controllers
//!
//! ACL entities are account-scoped. Rules and users touch no subscription;
//! roles bind rules to databases and therefore serialise against every
//! subscription they reference, acquired in ascending id order so two role
//! mutations can never deadlock against each other.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::translate;
use async_trait::async_trait;
use rediscloud_client::acl::{
    CreateAclRoleRequest, CreateAclRuleRequest, CreateAclUserRequest, RoleDatabaseSpec,
    RoleRedisRule, UpdateAclUserRequest,
};
use rediscloud_core::ids::parse_scalar_id;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use tokio::sync::OwnedMutexGuard;

// ---------------------------------------------------------------------------
// Rules

pub struct AclRuleResource;

#[async_trait]
impl Resource for AclRuleResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_rule"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let request = CreateAclRuleRequest {
            name: data
                .get_str("name")
                .ok_or_else(|| CoreError::validation("name is required"))?,
            redis_rule: data
                .get_str("rule")
                .ok_or_else(|| CoreError::validation("rule is required"))?,
        };
        let task_id = ctx.client.acl().create_rule(&request).await?;
        let rule = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(rule.to_string());
        tracing::info!("created ACL rule {}", rule);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_scalar_id(data.id())?;
        let rule = match ctx.client.acl().get_rule(id).await {
            Ok(rule) => rule,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("name", AttrValue::str(rule.name.unwrap_or_default()));
        data.set("rule", AttrValue::str(rule.rule.unwrap_or_default()));
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        let request = CreateAclRuleRequest {
            name: data
                .get_str("name")
                .ok_or_else(|| CoreError::validation("name is required"))?,
            redis_rule: data
                .get_str("rule")
                .ok_or_else(|| CoreError::validation("rule is required"))?,
        };
        let task_id = ctx.client.acl().update_rule(id, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        match ctx.client.acl().delete_rule(id).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {}
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Roles

pub struct AclRoleResource;

impl AclRoleResource {
    fn rules_from_attrs(data: &ResourceData) -> Result<Vec<RoleRedisRule>> {
        let rules: Vec<RoleRedisRule> = translate::blocks(data, "rule")
            .iter()
            .map(|block| RoleRedisRule {
                rule_name: translate::map_str(block, "name").unwrap_or_default(),
                databases: block
                    .get("database")
                    .and_then(AttrValue::as_items)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(AttrValue::as_map)
                    .map(|database| RoleDatabaseSpec {
                        subscription_id: translate::map_i64(database, "subscription")
                            .unwrap_or_default(),
                        database_id: translate::map_i64(database, "database").unwrap_or_default(),
                        regions: translate::map_str_items(database, "regions"),
                    })
                    .collect(),
            })
            .collect();
        if rules.is_empty() {
            return Err(CoreError::validation("at least one rule block is required"));
        }
        Ok(rules)
    }

    /// Locks for every subscription the role touches, ascending so
    /// concurrent role mutations acquire in the same order.
    async fn lock_referenced_subscriptions(
        ctx: &Context,
        rules: &[RoleRedisRule],
    ) -> Vec<OwnedMutexGuard<()>> {
        let subscriptions: BTreeSet<i64> = rules
            .iter()
            .flat_map(|rule| rule.databases.iter().map(|database| database.subscription_id))
            .filter(|id| *id > 0)
            .collect();
        let mut guards = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            guards.push(ctx.lock_subscription(subscription).await);
        }
        guards
    }

    fn rules_into_attr(rules: &[RoleRedisRule]) -> AttrValue {
        AttrValue::Set(
            rules
                .iter()
                .map(|rule| {
                    let mut block = BTreeMap::new();
                    block.insert("name".to_string(), AttrValue::str(&rule.rule_name));
                    block.insert(
                        "database".to_string(),
                        AttrValue::Set(
                            rule.databases
                                .iter()
                                .map(|database| {
                                    let mut database_block = BTreeMap::new();
                                    database_block.insert(
                                        "subscription".to_string(),
                                        AttrValue::Int(database.subscription_id),
                                    );
                                    database_block.insert(
                                        "database".to_string(),
                                        AttrValue::Int(database.database_id),
                                    );
                                    if let Some(regions) = &database.regions {
                                        database_block.insert(
                                            "regions".to_string(),
                                            AttrValue::str_set(regions.clone()),
                                        );
                                    }
                                    AttrValue::Map(database_block)
                                })
                                .collect(),
                        ),
                    );
                    AttrValue::Map(block)
                })
                .collect(),
        )
    }
}

#[async_trait]
impl Resource for AclRoleResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_role"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let rules = Self::rules_from_attrs(data)?;
        let request = CreateAclRoleRequest {
            name: data
                .get_str("name")
                .ok_or_else(|| CoreError::validation("name is required"))?,
            redis_rules: rules.clone(),
        };

        let _guards = Self::lock_referenced_subscriptions(ctx, &rules).await;
        let task_id = ctx.client.acl().create_role(&request).await?;
        let role = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(role.to_string());
        tracing::info!("created ACL role {}", role);
        drop(_guards);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_scalar_id(data.id())?;
        let role = match ctx.client.acl().get_role(id).await {
            Ok(role) => role,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("name", AttrValue::str(role.name.unwrap_or_default()));
        data.set("rule", Self::rules_into_attr(&role.redis_rules));
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        let rules = Self::rules_from_attrs(data)?;
        let request = CreateAclRoleRequest {
            name: data
                .get_str("name")
                .ok_or_else(|| CoreError::validation("name is required"))?,
            redis_rules: rules.clone(),
        };

        let _guards = Self::lock_referenced_subscriptions(ctx, &rules).await;
        let task_id = ctx.client.acl().update_role(id, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        drop(_guards);

        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        match ctx.client.acl().delete_role(id).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {}
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Users

pub struct AclUserResource;

#[async_trait]
impl Resource for AclUserResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_user"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let request = CreateAclUserRequest {
            name: data
                .get_str("name")
                .ok_or_else(|| CoreError::validation("name is required"))?,
            role: data
                .get_str("role")
                .ok_or_else(|| CoreError::validation("role is required"))?,
            password: data
                .get_str("password")
                .ok_or_else(|| CoreError::validation("password is required"))?,
        };
        let task_id = ctx.client.acl().create_user(&request).await?;
        let user = wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        data.set_id(user.to_string());
        tracing::info!("created ACL user {}", user);
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let id = parse_scalar_id(data.id())?;
        let user = match ctx.client.acl().get_user(id).await {
            Ok(user) => user,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };
        data.set("name", AttrValue::str(user.name.unwrap_or_default()));
        data.set("role", AttrValue::str(user.role.unwrap_or_default()));
        // The password is write-only; the stored value stands.
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        let request = UpdateAclUserRequest {
            role: data.has_change("role").then(|| data.get_str("role")).flatten(),
            password: data
                .has_change("password")
                .then(|| data.get_str("password"))
                .flatten(),
        };
        let task_id = ctx.client.acl().update_user(id, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let id = parse_scalar_id(data.id())?;
        match ctx.client.acl().delete_user(id).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {}
            Err(error) => return Err(error.into()),
        }
        data.clear_id();
        Ok(())
    }
}
