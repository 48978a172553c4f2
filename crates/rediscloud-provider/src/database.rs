//! Database controller
//!
//! Create pushes what the create endpoint accepts, then runs a full Update
//! because several attributes (TLS material, regex rules, default-user
//! toggles, remote backup) can only be set through the update endpoint, then
//! Reads to pick up computed fields. Size fields are mutually exclusive and
//! only the configured one lands in state.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::translate;
use crate::waits;
use async_trait::async_trait;
use rediscloud_client::database::{
    CreateDatabaseRequest, Database, PROTOCOL_REDIS, UpdateDatabaseRequest,
};
use rediscloud_core::defaults::{self, ReadContext};
use rediscloud_core::ids::{build_database_id, parse_database_id};
use rediscloud_core::schema::AttrMap;
use rediscloud_core::task_waiter::{wait_for_resource_id, wait_for_task};
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};

pub const PORT_MIN: i64 = 10000;
pub const PORT_MAX: i64 = 19999;

pub struct DatabaseResource;

/// Reject schema-valid but semantically impossible configurations before any
/// API call.
pub fn validate_database(data: &ResourceData) -> Result<()> {
    let memory = data.get_ok("memory_limit_in_gb").is_some();
    let dataset = data.get_ok("dataset_size_in_gb").is_some();
    if memory && dataset {
        return Err(CoreError::validation(
            "memory_limit_in_gb and dataset_size_in_gb are mutually exclusive",
        ));
    }
    if !memory && !dataset {
        return Err(CoreError::validation(
            "one of memory_limit_in_gb or dataset_size_in_gb is required",
        ));
    }

    if let Some(port) = data.get_i64("port")
        && !(PORT_MIN..=PORT_MAX).contains(&port)
    {
        return Err(CoreError::validation(format!(
            "port {port} is outside the allowed range [{PORT_MIN}, {PORT_MAX}]"
        )));
    }

    let single_cert = data.get_ok("client_ssl_certificate").is_some();
    let cert_list = data.get_ok("client_tls_certificates").is_some();
    if single_cert && cert_list {
        return Err(CoreError::validation(
            "client_ssl_certificate and client_tls_certificates are mutually exclusive",
        ));
    }

    if let Some(block) = translate::single_block(data, "remote_backup") {
        translate::validate_remote_backup(&block)?;
    }

    Ok(())
}

impl DatabaseResource {
    fn build_create_request(data: &ResourceData) -> CreateDatabaseRequest {
        CreateDatabaseRequest {
            name: data.get_str("name"),
            protocol: data.get_str("protocol"),
            port: data.get_i64("port"),
            memory_limit_in_gb: data.get_ok("memory_limit_in_gb").and_then(AttrValue::as_f64),
            dataset_size_in_gb: data.get_ok("dataset_size_in_gb").and_then(AttrValue::as_f64),
            support_oss_cluster_api: data.get_bool("support_oss_cluster_api"),
            resp_version: data.get_str("resp_version"),
            use_external_endpoint_for_oss_cluster_api: data
                .get_bool("external_endpoint_for_oss_cluster_api"),
            data_persistence: data.get_str("data_persistence"),
            data_eviction_policy: data.get_str("data_eviction"),
            replication: data.get_bool("replication"),
            throughput_measurement: translate::throughput_from_attr(data),
            average_item_size_in_bytes: data.get_i64("average_item_size_in_bytes"),
            replica_of: data.get_str_items("replica_of"),
            periodic_backup_path: data.get_str("periodic_backup_path"),
            source_ip: data
                .get_ok("source_ips")
                .and_then(AttrValue::as_str_items),
            password: data.get_str("password"),
            alerts: translate::alerts_from_attr(data, "alert"),
            modules: translate::modules_from_attr(data, "modules"),
            redis_version: data.get_str("redis_version"),
            quantity: None,
        }
    }

    fn build_update_request(
        data: &ResourceData,
        public_endpoint_access: bool,
    ) -> Result<UpdateDatabaseRequest> {
        // An empty allow list means "use the subscription's default", chosen
        // by its endpoint exposure; sending nothing would leave a previously
        // configured list behind.
        let source_ip = match data.get_ok("source_ips").and_then(AttrValue::as_str_items) {
            Some(ips) => ips,
            None => defaults::default_source_ips(public_endpoint_access),
        };

        Ok(UpdateDatabaseRequest {
            name: data.get_str("name"),
            memory_limit_in_gb: data.get_ok("memory_limit_in_gb").and_then(AttrValue::as_f64),
            dataset_size_in_gb: data.get_ok("dataset_size_in_gb").and_then(AttrValue::as_f64),
            support_oss_cluster_api: data.get_bool("support_oss_cluster_api"),
            resp_version: data.get_str("resp_version"),
            use_external_endpoint_for_oss_cluster_api: data
                .get_bool("external_endpoint_for_oss_cluster_api"),
            data_persistence: data.get_str("data_persistence"),
            data_eviction_policy: data.get_str("data_eviction"),
            replication: data.get_bool("replication"),
            throughput_measurement: translate::throughput_from_attr(data),
            regex_rules: data.get_ok("hashing_policy").and_then(AttrValue::as_str_items),
            replica_of: Some(data.get_str_items("replica_of").unwrap_or_default()),
            periodic_backup_path: data.get_str("periodic_backup_path"),
            remote_backup: translate::remote_backup_from_attr(data, "remote_backup")?,
            source_ip: Some(source_ip),
            client_ssl_certificate: data.get_str("client_ssl_certificate"),
            client_tls_certificates: data
                .get_ok("client_tls_certificates")
                .and_then(AttrValue::as_str_items),
            enable_tls: data.get_bool("enable_tls"),
            password: data.get_str("password"),
            enable_default_user: data.get_bool("enable_default_user"),
            alerts: translate::alerts_from_attr(data, "alert"),
        })
    }

    /// The shared update path; Create runs it too, because part of the schema
    /// is only settable through the update endpoint.
    async fn apply_update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let (subscription, database) = parse_database_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        let parent = ctx.client.subscriptions().get(subscription).await?;
        let public_endpoint_access = parent.public_endpoint_access.unwrap_or(true);

        let request = Self::build_update_request(data, public_endpoint_access)?;
        let task_id = ctx
            .client
            .databases()
            .update(subscription, database, &request)
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

    fn read_into_attrs(
        database: &Database,
        data: &mut ResourceData,
        public_endpoint_access: bool,
    ) {
        data.set(
            "name",
            AttrValue::str(database.name.clone().unwrap_or_default()),
        );
        data.set(
            "protocol",
            AttrValue::str(database.protocol.clone().unwrap_or_default()),
        );

        // Exactly one size field lives in state, mirroring the configuration;
        // the other is explicitly nulled so it cannot read as drift.
        if data.get_ok("memory_limit_in_gb").is_some() {
            data.set(
                "memory_limit_in_gb",
                AttrValue::Float(database.memory_limit_in_gb.unwrap_or_default()),
            );
            data.set_null("dataset_size_in_gb");
        } else if data.get_ok("dataset_size_in_gb").is_some() {
            data.set(
                "dataset_size_in_gb",
                AttrValue::Float(database.dataset_size_in_gb.unwrap_or_default()),
            );
            data.set_null("memory_limit_in_gb");
        } else if let Some(memory) = database.memory_limit_in_gb {
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
        data.set(
            "data_persistence",
            AttrValue::str(database.data_persistence.clone().unwrap_or_default()),
        );
        data.set(
            "data_eviction",
            AttrValue::str(database.data_eviction_policy.clone().unwrap_or_default()),
        );
        data.set(
            "replication",
            AttrValue::Bool(database.replication.unwrap_or_default()),
        );
        if let Some(throughput) = &database.throughput_measurement {
            translate::throughput_into_attrs(throughput, data);
        }
        data.set(
            "replica_of",
            AttrValue::str_list(database.replica_of.clone().unwrap_or_default()),
        );
        data.set(
            "public_endpoint",
            AttrValue::str(database.public_endpoint.clone().unwrap_or_default()),
        );
        data.set(
            "private_endpoint",
            AttrValue::str(database.private_endpoint.clone().unwrap_or_default()),
        );
        if let Some(path) = &database.periodic_backup_path {
            data.set("periodic_backup_path", AttrValue::str(path));
        }
        data.set("alert", translate::alerts_into_attr(&database.alerts));
        data.set("modules", translate::modules_into_attr(&database.modules));

        // Server-default detection for allow list and hashing policy runs
        // through the back-substitution table.
        let mut observed = AttrMap::new();
        if let Some(security) = &database.security {
            observed.insert(
                "source_ips".to_string(),
                AttrValue::str_set(security.source_ips.clone()),
            );
        }
        if let Some(clustering) = &database.clustering {
            observed.insert(
                "hashing_policy".to_string(),
                AttrValue::str_list(
                    clustering
                        .regex_rules
                        .iter()
                        .map(|rule| rule.pattern.clone()),
                ),
            );
        }
        let read_ctx = ReadContext {
            public_endpoint_access,
        };
        defaults::apply_read_rules(data, &mut observed, &read_ctx);
        for (key, value) in observed {
            data.set(key, value);
        }

        if let Some(security) = &database.security {
            data.set(
                "enable_tls",
                AttrValue::Bool(security.enable_tls.unwrap_or_default()),
            );
            data.set(
                "enable_default_user",
                AttrValue::Bool(security.enable_default_user.unwrap_or(true)),
            );
            // Only the redis protocol echoes a password; for anything else
            // the stored value stands. Certificate text is never echoed.
            if database.protocol.as_deref() == Some(PROTOCOL_REDIS)
                && let Some(password) = &security.password
            {
                data.set("password", AttrValue::str(password));
            }
        }

        if let Some(backup) = &database.backup
            && backup.active.unwrap_or_default()
        {
            let stored_storage_type = data
                .get_stored("remote_backup")
                .and_then(AttrValue::as_items)
                .and_then(|items| items.first().and_then(AttrValue::as_map).cloned())
                .and_then(|block| translate::map_str(&block, "storage_type"));
            data.set(
                "remote_backup",
                translate::remote_backup_into_attr(backup, stored_storage_type),
            );
        } else {
            data.set("remote_backup", AttrValue::List(Vec::new()));
        }

        if let Some(redis_version) = &database.redis_version_compliance {
            data.set("redis_version_compliance", AttrValue::str(redis_version));
        }
    }
}

#[async_trait]
impl Resource for DatabaseResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_database"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        validate_database(data)?;
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
            tracing::info!("created database {}/{}", subscription, database);

            waits::database_active(ctx, subscription, database, timeouts.create).await?;
            waits::subscription_active(ctx, subscription, timeouts.create).await?;
        }

        // TLS material, regex rules, and the default-user toggle only exist
        // on the update endpoint.
        self.apply_update(ctx, data).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let (subscription_id, database_id) = parse_database_id(data.id())?;

        let database = match ctx.client.databases().get(subscription_id, database_id).await {
            Ok(database) => database,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };

        let parent = match ctx.client.subscriptions().get(subscription_id).await {
            Ok(parent) => parent,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };

        data.set("subscription_id", AttrValue::Int(subscription_id));
        Self::read_into_attrs(
            &database,
            data,
            parent.public_endpoint_access.unwrap_or(true),
        );

        let tags = ctx.client.tags().get(subscription_id, database_id).await?;
        data.set("tags", translate::tags_into_attr(&tags));

        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        validate_database(data)?;
        self.apply_update(ctx, data).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let (subscription, database) = parse_database_id(data.id())?;
        let _guard = ctx.lock_subscription(subscription).await;

        waits::database_active(ctx, subscription, database, timeouts.delete).await?;
        match ctx.client.databases().delete(subscription, database).await {
            Ok(task_id) => {
                wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            }
            Err(error) if error.is_not_found() => {
                tracing::debug!("database {}/{} already deleted", subscription, database);
                data.clear_id();
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        }
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
