//! Field translators between schema attributes and API structs
//!
//! Schema blocks arrive as lists/sets of maps; the API wants nested structs
//! with optional fields. Each block gets a from/into pair. Absent optional
//! API fields become the schema zero value on read so state stays total.

use rediscloud_client::database::{Alert, ModuleSpec, RemoteBackup};
use rediscloud_client::subscription::{
    CidrAllowlist, CloudDetail, CreateCloudProvider, CreateDatabaseSpec, CreateNetworking,
    CreateRegion, MaintenanceWindow, MaintenanceWindows, Subscription, Throughput,
};
use rediscloud_client::tags::Tag;
use rediscloud_core::schema::AttrMap;
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Map helpers

pub fn map_str(map: &AttrMap, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

pub fn map_i64(map: &AttrMap, key: &str) -> Option<i64> {
    map.get(key).and_then(AttrValue::as_i64)
}

pub fn map_f64(map: &AttrMap, key: &str) -> Option<f64> {
    map.get(key).and_then(AttrValue::as_f64)
}

pub fn map_bool(map: &AttrMap, key: &str) -> Option<bool> {
    map.get(key).and_then(AttrValue::as_bool)
}

pub fn map_str_items(map: &AttrMap, key: &str) -> Option<Vec<String>> {
    map.get(key).and_then(AttrValue::as_str_items)
}

/// First block of a single-element list attribute.
pub fn single_block(data: &ResourceData, key: &str) -> Option<AttrMap> {
    data.get_items(key)?
        .first()
        .and_then(AttrValue::as_map)
        .cloned()
}

/// Every block of a list/set attribute.
pub fn blocks(data: &ResourceData, key: &str) -> Vec<AttrMap> {
    data.get_items(key)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_map().cloned())
        .collect()
}

// ---------------------------------------------------------------------------
// Alerts

pub fn alerts_from_blocks(items: &[AttrMap]) -> Vec<Alert> {
    items
        .iter()
        .filter_map(|block| {
            Some(Alert {
                name: map_str(block, "name")?,
                value: map_i64(block, "value")?,
            })
        })
        .collect()
}

pub fn alerts_from_attr(data: &ResourceData, key: &str) -> Option<Vec<Alert>> {
    data.get(key)?;
    Some(alerts_from_blocks(&blocks(data, key)))
}

pub fn alerts_into_attr(alerts: &[Alert]) -> AttrValue {
    AttrValue::Set(
        alerts
            .iter()
            .map(|alert| {
                let mut map = BTreeMap::new();
                map.insert("name".to_string(), AttrValue::str(&alert.name));
                map.insert("value".to_string(), AttrValue::Int(alert.value));
                AttrValue::Map(map)
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Modules

pub fn modules_from_attr(data: &ResourceData, key: &str) -> Option<Vec<ModuleSpec>> {
    let names = data.get_str_items(key)?;
    Some(
        names
            .into_iter()
            .map(|name| ModuleSpec {
                name,
                parameters: None,
            })
            .collect(),
    )
}

pub fn modules_into_attr(modules: &[ModuleSpec]) -> AttrValue {
    AttrValue::str_list(modules.iter().map(|m| m.name.clone()))
}

// ---------------------------------------------------------------------------
// Throughput

pub fn throughput_from_attr(data: &ResourceData) -> Option<Throughput> {
    let by = data.get_str("throughput_measurement_by")?;
    let value = data.get_i64("throughput_measurement_value")?;
    Some(Throughput { by, value })
}

pub fn throughput_into_attrs(throughput: &Throughput, data: &mut ResourceData) {
    data.set("throughput_measurement_by", AttrValue::str(&throughput.by));
    data.set("throughput_measurement_value", AttrValue::Int(throughput.value));
}

// ---------------------------------------------------------------------------
// Remote backup

pub const BACKUP_INTERVAL_EVERY_12_HOURS: &str = "every-12-hours";
pub const BACKUP_INTERVAL_EVERY_24_HOURS: &str = "every-24-hours";

/// `time_utc` is only meaningful for the 12- and 24-hour intervals.
pub fn validate_remote_backup(block: &AttrMap) -> Result<()> {
    let time_utc = map_str(block, "time_utc");
    let interval = map_str(block, "interval").unwrap_or_default();
    if time_utc.is_some()
        && interval != BACKUP_INTERVAL_EVERY_12_HOURS
        && interval != BACKUP_INTERVAL_EVERY_24_HOURS
    {
        return Err(CoreError::validation(format!(
            "remote_backup time_utc cannot be set with interval {interval:?}"
        )));
    }
    Ok(())
}

pub fn remote_backup_from_attr(data: &ResourceData, key: &str) -> Result<Option<RemoteBackup>> {
    let Some(block) = single_block(data, key) else {
        return Ok(None);
    };
    validate_remote_backup(&block)?;
    let storage_type = map_str(&block, "storage_type").ok_or_else(|| {
        CoreError::validation("remote_backup requires storage_type on write")
    })?;
    Ok(Some(RemoteBackup {
        active: Some(true),
        interval: map_str(&block, "interval"),
        time_utc: map_str(&block, "time_utc"),
        storage_type: Some(storage_type),
        storage_path: map_str(&block, "storage_path"),
    }))
}

/// Rebuild the backup block from an API read. The API never echoes
/// `storage_type`; it is grafted back from stored state by the caller.
pub fn remote_backup_into_attr(backup: &RemoteBackup, stored_storage_type: Option<String>) -> AttrValue {
    let mut map = BTreeMap::new();
    if let Some(interval) = &backup.interval {
        map.insert("interval".to_string(), AttrValue::str(interval));
    }
    if let Some(time_utc) = &backup.time_utc {
        map.insert("time_utc".to_string(), AttrValue::str(time_utc));
    }
    if let Some(storage_path) = &backup.storage_path {
        map.insert("storage_path".to_string(), AttrValue::str(storage_path));
    }
    if let Some(storage_type) = stored_storage_type {
        map.insert("storage_type".to_string(), AttrValue::str(storage_type));
    }
    AttrValue::List(vec![AttrValue::Map(map)])
}

// ---------------------------------------------------------------------------
// Tags

pub fn tags_from_attr(data: &ResourceData) -> Vec<Tag> {
    data.get_str_map("tags")
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| Tag { key, value })
        .collect()
}

pub fn tags_into_attr(tags: &[Tag]) -> AttrValue {
    AttrValue::Map(
        tags.iter()
            .map(|tag| (tag.key.clone(), AttrValue::str(&tag.value)))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Subscription blocks

pub fn creation_plan_from_attr(data: &ResourceData) -> Result<CreateDatabaseSpec> {
    crate::subscription::validate_creation_plan(data)?;
    let block = single_block(data, "creation_plan")
        .ok_or_else(|| CoreError::validation("a creation_plan block is required"))?;

    let throughput = match (
        map_str(&block, "throughput_measurement_by"),
        map_i64(&block, "throughput_measurement_value"),
    ) {
        (Some(by), Some(value)) => Some(Throughput { by, value }),
        _ => None,
    };

    Ok(CreateDatabaseSpec {
        name: Some("creation-plan-db".to_string()),
        protocol: None,
        memory_limit_in_gb: map_f64(&block, "memory_limit_in_gb"),
        dataset_size_in_gb: map_f64(&block, "dataset_size_in_gb"),
        support_oss_cluster_api: map_bool(&block, "support_oss_cluster_api"),
        data_persistence: None,
        replication: map_bool(&block, "replication"),
        throughput_measurement: throughput,
        average_item_size_in_bytes: map_i64(&block, "average_item_size_in_bytes"),
        modules: map_str_items(&block, "modules").map(|names| {
            names
                .into_iter()
                .map(|name| rediscloud_client::subscription::DatabaseModuleSpec { name })
                .collect()
        }),
        quantity: map_i64(&block, "quantity"),
    })
}

pub fn cloud_providers_from_attr(data: &ResourceData) -> Result<Vec<CreateCloudProvider>> {
    let providers = blocks(data, "cloud_provider");
    if providers.is_empty() {
        return Err(CoreError::validation("a cloud_provider block is required"));
    }
    Ok(providers
        .iter()
        .map(|provider| CreateCloudProvider {
            provider: map_str(provider, "provider"),
            cloud_account_id: map_i64(provider, "cloud_account_id"),
            regions: provider
                .get("region")
                .and_then(AttrValue::as_items)
                .unwrap_or_default()
                .iter()
                .filter_map(AttrValue::as_map)
                .map(|region| CreateRegion {
                    region: map_str(region, "region"),
                    multiple_availability_zones: map_bool(region, "multiple_availability_zones"),
                    preferred_availability_zones: map_str_items(
                        region,
                        "preferred_availability_zones",
                    ),
                    networking: Some(CreateNetworking {
                        deployment_cidr: map_str(region, "networking_deployment_cidr"),
                        vpc_id: map_str(region, "networking_vpc_id"),
                    }),
                    write_operations_per_second: map_i64(region, "write_operations_per_second"),
                    read_operations_per_second: map_i64(region, "read_operations_per_second"),
                })
                .collect(),
        })
        .collect())
}

pub fn subscription_into_attrs(subscription: &Subscription, data: &mut ResourceData) {
    data.set(
        "name",
        AttrValue::str(subscription.name.clone().unwrap_or_default()),
    );
    data.set(
        "status",
        AttrValue::str(subscription.status.clone().unwrap_or_default()),
    );
    data.set(
        "memory_storage",
        AttrValue::str(subscription.memory_storage.clone().unwrap_or_default()),
    );
    data.set(
        "payment_method_id",
        AttrValue::Int(subscription.payment_method_id.unwrap_or_default()),
    );
    data.set(
        "number_of_databases",
        AttrValue::Int(subscription.number_of_databases.unwrap_or_default()),
    );
    data.set(
        "public_endpoint_access",
        AttrValue::Bool(subscription.public_endpoint_access.unwrap_or(true)),
    );
    data.set(
        "cloud_provider",
        cloud_details_into_attr(&subscription.cloud_details),
    );
}

fn cloud_details_into_attr(details: &[CloudDetail]) -> AttrValue {
    AttrValue::List(
        details
            .iter()
            .map(|detail| {
                let mut map = BTreeMap::new();
                map.insert(
                    "provider".to_string(),
                    AttrValue::str(detail.provider.clone().unwrap_or_default()),
                );
                map.insert(
                    "cloud_account_id".to_string(),
                    AttrValue::Int(detail.cloud_account_id.unwrap_or_default()),
                );
                map.insert(
                    "region".to_string(),
                    AttrValue::Set(
                        detail
                            .regions
                            .iter()
                            .map(|region| {
                                let mut region_map = BTreeMap::new();
                                region_map.insert(
                                    "region".to_string(),
                                    AttrValue::str(region.region.clone().unwrap_or_default()),
                                );
                                region_map.insert(
                                    "multiple_availability_zones".to_string(),
                                    AttrValue::Bool(
                                        region.multiple_availability_zones.unwrap_or_default(),
                                    ),
                                );
                                if let Some(zones) = &region.preferred_availability_zones {
                                    region_map.insert(
                                        "preferred_availability_zones".to_string(),
                                        AttrValue::str_list(zones.clone()),
                                    );
                                }
                                if let Some(networking) = region.networking.first() {
                                    region_map.insert(
                                        "networking_deployment_cidr".to_string(),
                                        AttrValue::str(
                                            networking.deployment_cidr.clone().unwrap_or_default(),
                                        ),
                                    );
                                    region_map.insert(
                                        "networking_vpc_id".to_string(),
                                        AttrValue::str(
                                            networking.vpc_id.clone().unwrap_or_default(),
                                        ),
                                    );
                                }
                                AttrValue::Map(region_map)
                            })
                            .collect(),
                    ),
                );
                AttrValue::Map(map)
            })
            .collect(),
    )
}

pub fn allowlist_into_attrs(allowlist: &CidrAllowlist, data: &mut ResourceData) {
    let mut map = BTreeMap::new();
    map.insert(
        "cidrs".to_string(),
        AttrValue::str_set(allowlist.cidr_ips.clone()),
    );
    map.insert(
        "security_group_ids".to_string(),
        AttrValue::str_set(allowlist.security_group_ids.clone()),
    );
    data.set("allowlist", AttrValue::List(vec![AttrValue::Map(map)]));
}

pub fn allowlist_cidrs_from_attr(data: &ResourceData) -> Option<Vec<String>> {
    single_block(data, "allowlist").and_then(|block| map_str_items(&block, "cidrs"))
}

pub fn allowlist_security_groups_from_attr(data: &ResourceData) -> Option<Vec<String>> {
    single_block(data, "allowlist").and_then(|block| map_str_items(&block, "security_group_ids"))
}

pub fn maintenance_windows_from_attr(data: &ResourceData) -> Option<MaintenanceWindows> {
    let block = single_block(data, "maintenance_windows")?;
    let windows = block
        .get("window")
        .and_then(AttrValue::as_items)
        .unwrap_or_default()
        .iter()
        .filter_map(AttrValue::as_map)
        .filter_map(|window| {
            Some(MaintenanceWindow {
                start_hour: map_i64(window, "start_hour")?,
                duration_in_hours: map_i64(window, "duration_in_hours")?,
                days: map_str_items(window, "days")?,
            })
        })
        .collect();
    Some(MaintenanceWindows {
        mode: map_str(&block, "mode")?,
        windows,
    })
}

pub fn maintenance_windows_into_attrs(windows: &MaintenanceWindows, data: &mut ResourceData) {
    let mut map = BTreeMap::new();
    map.insert("mode".to_string(), AttrValue::str(&windows.mode));
    map.insert(
        "window".to_string(),
        AttrValue::List(
            windows
                .windows
                .iter()
                .map(|window| {
                    let mut window_map = BTreeMap::new();
                    window_map.insert(
                        "start_hour".to_string(),
                        AttrValue::Int(window.start_hour),
                    );
                    window_map.insert(
                        "duration_in_hours".to_string(),
                        AttrValue::Int(window.duration_in_hours),
                    );
                    window_map.insert(
                        "days".to_string(),
                        AttrValue::str_list(window.days.clone()),
                    );
                    AttrValue::Map(window_map)
                })
                .collect(),
        ),
    );
    data.set(
        "maintenance_windows",
        AttrValue::List(vec![AttrValue::Map(map)]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rediscloud_core::AttrMap;

    fn alert_block(name: &str, value: i64) -> AttrValue {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), AttrValue::str(name));
        map.insert("value".to_string(), AttrValue::Int(value));
        AttrValue::Map(map)
    }

    #[test]
    fn alerts_round_trip_through_blocks() {
        let mut config = AttrMap::new();
        config.insert(
            "alert".to_string(),
            AttrValue::Set(vec![
                alert_block("dataset-size", 40),
                alert_block("throughput-higher-than", 1000),
            ]),
        );
        let data = ResourceData::new(config);
        let alerts = alerts_from_attr(&data, "alert").unwrap();
        assert_eq!(alerts.len(), 2);

        let back = alerts_into_attr(&alerts);
        let restored = back.as_items().unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(
            restored[0].as_map().unwrap()["name"],
            AttrValue::str("dataset-size")
        );
    }

    #[test]
    fn backup_time_utc_requires_matching_interval() {
        let mut block = AttrMap::new();
        block.insert("interval".to_string(), AttrValue::str("every-1-hour"));
        block.insert("time_utc".to_string(), AttrValue::str("16:00"));
        assert!(validate_remote_backup(&block).is_err());

        block.insert("interval".to_string(), AttrValue::str("every-12-hours"));
        assert!(validate_remote_backup(&block).is_ok());
    }

    #[test]
    fn backup_requires_storage_type_on_write() {
        let mut block = AttrMap::new();
        block.insert("interval".to_string(), AttrValue::str("every-24-hours"));
        block.insert("storage_path".to_string(), AttrValue::str("s3://bucket"));
        let mut config = AttrMap::new();
        config.insert(
            "remote_backup".to_string(),
            AttrValue::List(vec![AttrValue::Map(block)]),
        );
        let data = ResourceData::new(config);
        assert!(remote_backup_from_attr(&data, "remote_backup").is_err());
    }

    #[test]
    fn backup_read_grafts_stored_storage_type() {
        let backup = RemoteBackup {
            active: Some(true),
            interval: Some("every-24-hours".to_string()),
            time_utc: Some("16:00".to_string()),
            storage_type: None,
            storage_path: Some("s3://bucket".to_string()),
        };
        let attr = remote_backup_into_attr(&backup, Some("aws-s3".to_string()));
        let block = attr.as_items().unwrap()[0].as_map().unwrap().clone();
        assert_eq!(block["storage_type"], AttrValue::str("aws-s3"));
        assert_eq!(block["interval"], AttrValue::str("every-24-hours"));
    }

    #[test]
    fn cloud_provider_blocks_translate_to_request() {
        let mut region = AttrMap::new();
        region.insert("region".to_string(), AttrValue::str("eu-west-1"));
        region.insert(
            "networking_deployment_cidr".to_string(),
            AttrValue::str("10.0.0.0/24"),
        );
        let mut provider = AttrMap::new();
        provider.insert("provider".to_string(), AttrValue::str("AWS"));
        provider.insert(
            "region".to_string(),
            AttrValue::Set(vec![AttrValue::Map(region)]),
        );
        let mut config = AttrMap::new();
        config.insert(
            "cloud_provider".to_string(),
            AttrValue::List(vec![AttrValue::Map(provider)]),
        );

        let data = ResourceData::new(config);
        let providers = cloud_providers_from_attr(&data).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].provider.as_deref(), Some("AWS"));
        let networking = providers[0].regions[0].networking.as_ref().unwrap();
        assert_eq!(networking.deployment_cidr.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn missing_cloud_provider_is_rejected() {
        let data = ResourceData::new(AttrMap::new());
        assert!(cloud_providers_from_attr(&data).is_err());
    }

    #[test]
    fn tags_round_trip() {
        let mut tags_map = BTreeMap::new();
        tags_map.insert("env".to_string(), AttrValue::str("prod"));
        tags_map.insert("team".to_string(), AttrValue::str("data"));
        let mut config = AttrMap::new();
        config.insert("tags".to_string(), AttrValue::Map(tags_map));

        let data = ResourceData::new(config);
        let tags = tags_from_attr(&data);
        assert_eq!(tags.len(), 2);

        let back = tags_into_attr(&tags);
        assert_eq!(
            back.as_map().unwrap()["env"],
            AttrValue::str("prod")
        );
    }
}
