//! Active-active database controller
//!
//! The update payload carries `global_*` defaults plus one override record
//! per region named in `override_region`. Regions in an override must belong
//! to the subscription; that is checked against stored state before any API
//! call goes out. On read, overrides are rebuilt only for regions that were
//! already in state so server-added regions do not surface as drift.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::translate;
use crate::waits;
use async_trait::async_trait;
use rediscloud_client::database::{
    ActiveActiveDatabase, CreateDatabaseRequest, LocalRegionProperties,
    UpdateActiveActiveDatabaseRequest,
};
use rediscloud_core::defaults;
use rediscloud_core::ids::{build_database_id, parse_database_id};
use rediscloud_core::schema::AttrMap;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

pub struct ActiveActiveDatabaseResource;

/// Regions named in overrides must be a subset of the subscription's region
/// set. Checked against stored state so an invalid plan never reaches the
/// API.
pub fn validate_override_regions(data: &ResourceData) -> Result<()> {
    let Some(known) = data
        .get_stored("regions")
        .and_then(AttrValue::as_str_items)
    else {
        return Ok(());
    };
    let known: BTreeSet<String> = known.into_iter().collect();

    for block in translate::blocks(data, "override_region") {
        if let Some(name) = translate::map_str(&block, "name")
            && !known.contains(&name)
        {
            return Err(CoreError::validation(format!(
                "override_region {name:?} is not a region of this subscription"
            )));
        }
    }
    Ok(())
}

impl ActiveActiveDatabaseResource {
    fn build_create_request(data: &ResourceData) -> CreateDatabaseRequest {
        CreateDatabaseRequest {
            name: data.get_str("name"),
            protocol: data.get_str("protocol"),
            port: data.get_i64("port"),
            memory_limit_in_gb: data.get_ok("memory_limit_in_gb").and_then(AttrValue::as_f64),
            dataset_size_in_gb: data.get_ok("dataset_size_in_gb").and_then(AttrValue::as_f64),
            support_oss_cluster_api: data.get_bool("support_oss_cluster_api"),
            use_external_endpoint_for_oss_cluster_api: data
                .get_bool("external_endpoint_for_oss_cluster_api"),
            password: data.get_str("global_password"),
            redis_version: data.get_str("redis_version"),
            quantity: None,
            ..Default::default()
        }
    }

    fn override_block_to_properties(
        block: &AttrMap,
        data: &ResourceData,
        public_endpoint_access: bool,
    ) -> LocalRegionProperties {
        // Each override field falls back to its global counterpart.
        let alerts = block
            .get("override_global_alert")
            .and_then(AttrValue::as_items)
            .map(|items| {
                translate::alerts_from_blocks(
                    &items
                        .iter()
                        .filter_map(|v| v.as_map().cloned())
                        .collect::<Vec<_>>(),
                )
            })
            .or_else(|| translate::alerts_from_attr(data, "global_alert"));

        let source_ips = translate::map_str_items(block, "override_global_source_ips")
            .filter(|ips| !ips.is_empty())
            .or_else(|| {
                data.get_ok("global_source_ips")
                    .and_then(AttrValue::as_str_items)
            })
            .unwrap_or_else(|| defaults::default_source_ips(public_endpoint_access));

        let remote_backup = block
            .get("remote_backup")
            .and_then(AttrValue::as_items)
            .and_then(|items| items.first().and_then(AttrValue::as_map).cloned())
            .map(|backup| rediscloud_client::database::RemoteBackup {
                active: Some(true),
                interval: translate::map_str(&backup, "interval"),
                time_utc: translate::map_str(&backup, "time_utc"),
                storage_type: translate::map_str(&backup, "storage_type"),
                storage_path: translate::map_str(&backup, "storage_path"),
            });

        LocalRegionProperties {
            region: translate::map_str(block, "name"),
            local_throughput_measurement: None,
            data_persistence: translate::map_str(block, "override_global_data_persistence")
                .or_else(|| data.get_str("global_data_persistence")),
            password: translate::map_str(block, "override_global_password")
                .or_else(|| data.get_str("global_password")),
            source_ip: Some(source_ips),
            enable_default_user: translate::map_bool(block, "enable_default_user")
                .or_else(|| data.get_bool("global_enable_default_user")),
            alerts,
            remote_backup,
        }
    }

    fn build_update_request(
        data: &ResourceData,
        public_endpoint_access: bool,
    ) -> UpdateActiveActiveDatabaseRequest {
        let global_source_ip = data
            .get_ok("global_source_ips")
            .and_then(AttrValue::as_str_items)
            .unwrap_or_else(|| defaults::default_source_ips(public_endpoint_access));

        let regions: Vec<LocalRegionProperties> = translate::blocks(data, "override_region")
            .iter()
            .map(|block| Self::override_block_to_properties(block, data, public_endpoint_access))
            .collect();

        UpdateActiveActiveDatabaseRequest {
            memory_limit_in_gb: data.get_ok("memory_limit_in_gb").and_then(AttrValue::as_f64),
            dataset_size_in_gb: data.get_ok("dataset_size_in_gb").and_then(AttrValue::as_f64),
            support_oss_cluster_api: data.get_bool("support_oss_cluster_api"),
            use_external_endpoint_for_oss_cluster_api: data
                .get_bool("external_endpoint_for_oss_cluster_api"),
            global_data_persistence: data.get_str("global_data_persistence"),
            global_password: data.get_str("global_password"),
            global_source_ip: Some(global_source_ip),
            global_alerts: translate::alerts_from_attr(data, "global_alert"),
            global_enable_default_user: data.get_bool("global_enable_default_user"),
            client_ssl_certificate: data.get_str("client_ssl_certificate"),
            client_tls_certificates: data
                .get_ok("client_tls_certificates")
                .and_then(AttrValue::as_str_items),
            enable_tls: data.get_bool("enable_tls"),
            regions: if regions.is_empty() {
                None
            } else {
                Some(regions)
            },
        }
    }

    async fn apply_update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        validate_override_regions(data)?;
        let (subscription, database) = parse_database_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        let parent = ctx.client.subscriptions().get(subscription).await?;
        let request =
            Self::build_update_request(data, parent.public_endpoint_access.unwrap_or(true));
        let task_id = ctx
            .client
            .databases()
            .update_active_active(subscription, database, &request)
            .await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        waits::database_active(ctx, subscription, database, timeouts.update).await?;
        waits::subscription_active(ctx, subscription, timeouts.update).await?;

        if data.has_change("tags") {
            ctx.client
                .tags()
                .put(subscription, database, translate::tags_from_attr(data))
                .await?;
        }
        Ok(())
    }

    fn read_into_attrs(database: &ActiveActiveDatabase, data: &mut ResourceData) {
        data.set(
            "name",
            AttrValue::str(database.name.clone().unwrap_or_default()),
        );
        if let Some(memory) = database.memory_limit_in_gb {
            data.set("memory_limit_in_gb", AttrValue::Float(memory));
            data.set_null("dataset_size_in_gb");
        } else if let Some(dataset) = database.dataset_size_in_gb {
            data.set("dataset_size_in_gb", AttrValue::Float(dataset));
            data.set_null("memory_limit_in_gb");
        }
        data.set(
            "support_oss_cluster_api",
            AttrValue::Bool(database.support_oss_cluster_api.unwrap_or_default()),
        );

        let region_names: Vec<String> = database
            .crdb_databases
            .iter()
            .filter_map(|local| local.region.clone())
            .collect();
        data.set("regions", AttrValue::str_set(region_names));

        // Overrides are rebuilt only for regions the user already tracked;
        // server-added regions stay invisible here.
        let stored_override_names: BTreeSet<String> = data
            .get_stored("override_region")
            .and_then(AttrValue::as_items)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        item.as_map()
                            .and_then(|block| translate::map_str(block, "name"))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let overrides: Vec<AttrValue> = database
            .crdb_databases
            .iter()
            .filter(|local| {
                local
                    .region
                    .as_ref()
                    .is_some_and(|region| stored_override_names.contains(region))
            })
            .map(|local| {
                let mut block = BTreeMap::new();
                block.insert(
                    "name".to_string(),
                    AttrValue::str(local.region.clone().unwrap_or_default()),
                );
                if let Some(persistence) = &local.data_persistence {
                    block.insert(
                        "override_global_data_persistence".to_string(),
                        AttrValue::str(persistence),
                    );
                }
                if let Some(security) = &local.security {
                    block.insert(
                        "override_global_source_ips".to_string(),
                        AttrValue::str_set(security.source_ips.clone()),
                    );
                    if let Some(enable_default_user) = security.enable_default_user {
                        block.insert(
                            "enable_default_user".to_string(),
                            AttrValue::Bool(enable_default_user),
                        );
                    }
                }
                if !local.alerts.is_empty() {
                    block.insert(
                        "override_global_alert".to_string(),
                        translate::alerts_into_attr(&local.alerts),
                    );
                }
                AttrValue::Map(block)
            })
            .collect();
        data.set("override_region", AttrValue::Set(overrides));

        let endpoints: Vec<AttrValue> = database
            .crdb_databases
            .iter()
            .map(|local| {
                let mut block = BTreeMap::new();
                block.insert(
                    "region".to_string(),
                    AttrValue::str(local.region.clone().unwrap_or_default()),
                );
                block.insert(
                    "public_endpoint".to_string(),
                    AttrValue::str(local.public_endpoint.clone().unwrap_or_default()),
                );
                block.insert(
                    "private_endpoint".to_string(),
                    AttrValue::str(local.private_endpoint.clone().unwrap_or_default()),
                );
                AttrValue::Map(block)
            })
            .collect();
        data.set("endpoints", AttrValue::List(endpoints));
    }
}

#[async_trait]
impl Resource for ActiveActiveDatabaseResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_active_active_database"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;

        {
            let _guard = ctx.lock_subscription(subscription).await;
            let request = Self::build_create_request(data);
            let task_id = ctx.client.databases().create(subscription, &request).await?;
            let database =
                wait_for_resource_id(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            data.set_id(build_database_id(subscription, database));
            tracing::info!(
                "created active-active database {}/{}",
                subscription,
                database
            );
            waits::database_active(ctx, subscription, database, timeouts.create).await?;
            waits::subscription_active(ctx, subscription, timeouts.create).await?;
        }

        // Global defaults and overrides only exist on the update endpoint.
        self.apply_update(ctx, data).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription_id, database_id) = parse_database_id(data.id())?;
        let database = match ctx
            .client
            .databases()
            .get_active_active(subscription_id, database_id)
            .await
        {
            Ok(database) => database,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };

        data.set("subscription_id", AttrValue::Int(subscription_id));
        Self::read_into_attrs(&database, data);

        let tags = ctx.client.tags().get(subscription_id, database_id).await?;
        data.set("tags", translate::tags_into_attr(&tags));
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        self.apply_update(ctx, data).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let (subscription, database) = parse_database_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        waits::database_active(ctx, subscription, database, timeouts.delete).await?;
        let task_id = ctx.client.databases().delete(subscription, database).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        waits::database_deleted(ctx, subscription, database, timeouts.delete).await?;
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let (subscription, _) = parse_database_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn override_block(name: &str) -> AttrValue {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), AttrValue::str(name));
        AttrValue::Map(map)
    }

    fn data_with_override(region: &str, known: &[&str]) -> ResourceData {
        let mut config = AttrMap::new();
        config.insert(
            "override_region".to_string(),
            AttrValue::Set(vec![override_block(region)]),
        );
        let mut state = AttrMap::new();
        state.insert(
            "regions".to_string(),
            AttrValue::str_set(known.iter().copied()),
        );
        ResourceData::with_state("1/2", config, state)
    }

    #[test]
    fn override_region_must_belong_to_subscription() {
        let ok = data_with_override("us-east-1", &["us-east-1", "us-east-2"]);
        assert!(validate_override_regions(&ok).is_ok());

        let bad = data_with_override("eu-west-2", &["us-east-1", "us-east-2"]);
        let err = validate_override_regions(&bad).unwrap_err();
        assert!(err.to_string().contains("eu-west-2"));
    }

    #[test]
    fn override_falls_back_to_global_values() {
        let mut config = AttrMap::new();
        config.insert(
            "global_data_persistence".to_string(),
            AttrValue::str("aof-every-1-second"),
        );
        config.insert("global_password".to_string(), AttrValue::str("global-pw"));
        let data = ResourceData::new(config);

        let mut block = AttrMap::new();
        block.insert("name".to_string(), AttrValue::str("us-east-1"));
        let properties =
            ActiveActiveDatabaseResource::override_block_to_properties(&block, &data, false);
        assert_eq!(
            properties.data_persistence.as_deref(),
            Some("aof-every-1-second")
        );
        assert_eq!(properties.password.as_deref(), Some("global-pw"));
        // No global source IPs configured: private default applies.
        assert_eq!(properties.source_ip.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn override_values_win_over_globals() {
        let mut config = AttrMap::new();
        config.insert(
            "global_data_persistence".to_string(),
            AttrValue::str("none"),
        );
        let data = ResourceData::new(config);

        let mut block = AttrMap::new();
        block.insert("name".to_string(), AttrValue::str("us-east-1"));
        block.insert(
            "override_global_data_persistence".to_string(),
            AttrValue::str("aof-every-write"),
        );
        let properties =
            ActiveActiveDatabaseResource::override_block_to_properties(&block, &data, true);
        assert_eq!(
            properties.data_persistence.as_deref(),
            Some("aof-every-write")
        );
    }
}
