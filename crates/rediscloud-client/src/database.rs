//! Database endpoints
//!
//! Covers single-region databases, the active-active (CRDB) variant with
//! per-region properties, and the database import trigger.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use crate::subscription::Throughput;
use crate::task::TaskCreated;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DATABASE_STATUS_ACTIVE: &str = "active";
pub const DATABASE_STATUS_PENDING: &str = "pending";
pub const DATABASE_STATUS_DRAFT: &str = "draft";
pub const DATABASE_STATUS_ACTIVE_CHANGE_PENDING: &str = "active-change-pending";
pub const DATABASE_STATUS_ACTIVE_CHANGE_DRAFT: &str = "active-change-draft";
pub const DATABASE_STATUS_DYNAMIC_ENDPOINTS_CREATION_PENDING: &str =
    "dynamic-endpoints-creation-pending";
pub const DATABASE_STATUS_ERROR: &str = "error";

pub const PROTOCOL_REDIS: &str = "redis";
pub const PROTOCOL_MEMCACHED: &str = "memcached";

// ---------------------------------------------------------------------------
// Request types

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<Throughput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodic_backup_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<ModuleSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<Throughput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica_of: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodic_backup_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_backup: Option<RemoteBackup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_certificates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
}

/// Active-active update: global defaults plus per-region overrides.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActiveActiveDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_source_ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ssl_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_certificates: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<LocalRegionProperties>>,
}

/// Per-region properties of an active-active database
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRegionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_throughput_measurement: Option<LocalThroughput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_backup: Option<RemoteBackup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalThroughput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub write_operations_per_second: i64,
    pub read_operations_per_second: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBackup {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_utc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDatabaseRequest {
    pub source_type: String,
    pub import_from_uri: Vec<String>,
}

// ---------------------------------------------------------------------------
// Response types

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(rename = "databaseId")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(default)]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(default)]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(default)]
    pub resp_version: Option<String>,
    #[serde(default)]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(default)]
    pub data_persistence: Option<String>,
    #[serde(default)]
    pub data_eviction_policy: Option<String>,
    #[serde(default)]
    pub replication: Option<bool>,
    #[serde(default)]
    pub throughput_measurement: Option<Throughput>,
    #[serde(default)]
    pub replica_of: Option<Vec<String>>,
    #[serde(default)]
    pub periodic_backup_path: Option<String>,
    #[serde(default)]
    pub public_endpoint: Option<String>,
    #[serde(default)]
    pub private_endpoint: Option<String>,
    #[serde(default)]
    pub redis_version_compliance: Option<String>,
    #[serde(default)]
    pub clustering: Option<Clustering>,
    #[serde(default)]
    pub security: Option<Security>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub backup: Option<RemoteBackup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clustering {
    #[serde(default)]
    pub number_of_shards: Option<i64>,
    #[serde(default)]
    pub regex_rules: Vec<RegexRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexRule {
    #[serde(default)]
    pub ordinal: i64,
    pub pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    #[serde(default)]
    pub enable_default_user: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub source_ips: Vec<String>,
    #[serde(default)]
    pub enable_tls: Option<bool>,
    #[serde(default)]
    pub ssl_client_authentication: Option<bool>,
    #[serde(default)]
    pub tls_client_authentication: Option<bool>,
}

/// Active-active database view: shared attributes plus per-region instances.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveActiveDatabase {
    #[serde(rename = "databaseId")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(default)]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(default)]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(default)]
    pub use_external_endpoint_for_oss_cluster_api: Option<bool>,
    #[serde(default)]
    pub redis_version_compliance: Option<String>,
    #[serde(default)]
    pub crdb_databases: Vec<LocalDatabase>,
}

/// One region's instance of an active-active database
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDatabase {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub public_endpoint: Option<String>,
    #[serde(default)]
    pub private_endpoint: Option<String>,
    #[serde(default)]
    pub data_persistence: Option<String>,
    #[serde(default)]
    pub local_throughput_measurement: Option<LocalThroughput>,
    #[serde(default)]
    pub security: Option<Security>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub backup: Option<RemoteBackup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDatabasesPage {
    #[serde(default)]
    subscription: Vec<SubscriptionDatabases>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionDatabases {
    #[serde(default)]
    databases: Vec<Database>,
}

// ---------------------------------------------------------------------------
// Service

const LIST_PAGE_SIZE: i64 = 100;

/// Database endpoints
#[derive(Clone)]
pub struct Databases {
    http: Arc<HttpClient>,
}

impl Databases {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn create(&self, subscription: i64, request: &CreateDatabaseRequest) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(&format!("/subscriptions/{subscription}/databases"), request)
                .await,
            || ApiError::SubscriptionNotFound(subscription),
        )?;
        Ok(created.task_id)
    }

    pub async fn get(&self, subscription: i64, database: i64) -> Result<Database> {
        map_not_found(
            self.http
                .get(&format!("/subscriptions/{subscription}/databases/{database}"))
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )
    }

    pub async fn get_active_active(
        &self,
        subscription: i64,
        database: i64,
    ) -> Result<ActiveActiveDatabase> {
        map_not_found(
            self.http
                .get(&format!("/subscriptions/{subscription}/databases/{database}"))
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )
    }

    /// Walk every page of the database listing.
    pub async fn list(&self, subscription: i64) -> Result<Vec<Database>> {
        let mut databases = Vec::new();
        let mut offset = 0;
        loop {
            let page: ListDatabasesPage = map_not_found(
                self.http
                    .get_with_query(
                        &format!("/subscriptions/{subscription}/databases"),
                        &[
                            ("offset", offset.to_string()),
                            ("limit", LIST_PAGE_SIZE.to_string()),
                        ],
                    )
                    .await,
                || ApiError::SubscriptionNotFound(subscription),
            )?;
            let mut page_databases: Vec<Database> = page
                .subscription
                .into_iter()
                .flat_map(|s| s.databases)
                .collect();
            let count = page_databases.len() as i64;
            databases.append(&mut page_databases);
            if count < LIST_PAGE_SIZE {
                return Ok(databases);
            }
            offset += LIST_PAGE_SIZE;
        }
    }

    pub async fn update(
        &self,
        subscription: i64,
        database: i64,
        request: &UpdateDatabaseRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!("/subscriptions/{subscription}/databases/{database}"),
                    request,
                )
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )?;
        Ok(created.task_id)
    }

    pub async fn update_active_active(
        &self,
        subscription: i64,
        database: i64,
        request: &UpdateActiveActiveDatabaseRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .put(
                    &format!("/subscriptions/{subscription}/databases/{database}"),
                    request,
                )
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )?;
        Ok(created.task_id)
    }

    pub async fn delete(&self, subscription: i64, database: i64) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .delete(&format!("/subscriptions/{subscription}/databases/{database}"))
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )?;
        Ok(created.task_id)
    }

    /// Trigger an import from a remote source into an existing database.
    pub async fn import(
        &self,
        subscription: i64,
        database: i64,
        request: &ImportDatabaseRequest,
    ) -> Result<String> {
        let created: TaskCreated = map_not_found(
            self.http
                .post(
                    &format!("/subscriptions/{subscription}/databases/{database}/import"),
                    request,
                )
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )?;
        Ok(created.task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_deserializes_security_block() {
        let database: Database = serde_json::from_str(
            r#"{
                "databaseId": 51,
                "name": "db",
                "protocol": "redis",
                "status": "active",
                "memoryLimitInGb": 3.0,
                "security": {
                    "enableDefaultUser": true,
                    "password": "pw",
                    "sourceIps": ["0.0.0.0/0"],
                    "enableTls": false
                }
            }"#,
        )
        .unwrap();
        assert_eq!(database.id, 51);
        let security = database.security.unwrap();
        assert_eq!(security.source_ips, vec!["0.0.0.0/0"]);
        assert_eq!(security.password.as_deref(), Some("pw"));
    }

    #[test]
    fn update_request_serializes_only_set_groups() {
        let request = UpdateDatabaseRequest {
            memory_limit_in_gb: Some(1.0),
            data_persistence: Some("aof-every-write".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["memoryLimitInGb"], 1.0);
        assert_eq!(json["dataPersistence"], "aof-every-write");
        assert!(json.get("password").is_none());
        assert!(json.get("sourceIp").is_none());
    }

    #[test]
    fn local_region_properties_carry_throughput() {
        let properties = LocalRegionProperties {
            region: Some("us-east-1".to_string()),
            local_throughput_measurement: Some(LocalThroughput {
                region: Some("us-east-1".to_string()),
                write_operations_per_second: 1000,
                read_operations_per_second: 1000,
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&properties).unwrap();
        assert_eq!(
            json["localThroughputMeasurement"]["writeOperationsPerSecond"],
            1000
        );
    }
}
