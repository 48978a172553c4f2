//! Active-active region controller
//!
//! Reconciles the desired region set of an active-active subscription against
//! what the API reports: missing regions are created, extra regions are
//! deleted only when `delete_regions` is set, a CIDR change forces a
//! recreate gated on the region's `recreate_region` flag, and per-database
//! throughput differences are pushed in place.

use crate::resource::{Context, ReadOutcome, Resource};
use crate::translate;
use crate::waits;
use async_trait::async_trait;
use rediscloud_client::database::{
    LocalRegionProperties, LocalThroughput, UpdateActiveActiveDatabaseRequest,
};
use rediscloud_client::regions::{
    CreateRegionDatabase, CreateRegionRequest, DeleteRegionSpec, DeleteRegionsRequest, Region,
};
use rediscloud_core::ids::parse_scalar_id;
use rediscloud_core::task_waiter::wait_for_task;
use rediscloud_core::{AttrValue, CoreError, ResourceData, Result};
use std::collections::BTreeMap;

pub struct RegionsResource;

/// Desired shape of one region
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredRegion {
    pub name: String,
    pub cidr: String,
    pub recreate: bool,
    pub databases: Vec<DesiredThroughput>,
}

/// Desired local throughput of one database in one region
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredThroughput {
    pub database_id: Option<i64>,
    pub database_name: String,
    pub write_operations_per_second: i64,
    pub read_operations_per_second: i64,
}

/// Actions the reconciler decided on
#[derive(Debug, Default, PartialEq)]
pub struct RegionPlan {
    pub create: Vec<DesiredRegion>,
    pub delete: Vec<String>,
    pub recreate: Vec<DesiredRegion>,
    /// (region name, throughput records that differ from observed)
    pub update_throughput: Vec<(String, Vec<DesiredThroughput>)>,
}

impl RegionPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.delete.is_empty()
            && self.recreate.is_empty()
            && self.update_throughput.is_empty()
    }
}

/// Decide what to do for each region.
pub fn plan_regions(
    desired: &[DesiredRegion],
    observed: &[Region],
    delete_regions: bool,
) -> Result<RegionPlan> {
    let observed_by_name: BTreeMap<String, &Region> = observed
        .iter()
        .filter_map(|region| region.region.clone().map(|name| (name, region)))
        .collect();
    let mut plan = RegionPlan::default();

    for region in desired {
        match observed_by_name.get(&region.name) {
            None => plan.create.push(region.clone()),
            Some(existing) => {
                let existing_cidr = existing.deployment_cidr.clone().unwrap_or_default();
                if existing_cidr != region.cidr {
                    if !region.recreate {
                        return Err(CoreError::validation(format!(
                            "region {:?} changes its deployment CIDR from {existing_cidr:?} to {:?}; set recreate_region to allow recreating it",
                            region.name, region.cidr
                        )));
                    }
                    plan.recreate.push(region.clone());
                    continue;
                }

                // Same CIDR: push throughput for databases whose desired
                // numbers differ from what the region reports.
                let changed: Vec<DesiredThroughput> = region
                    .databases
                    .iter()
                    .filter(|throughput| {
                        !existing.databases.iter().any(|observed_db| {
                            observed_db.database_name.as_deref()
                                == Some(throughput.database_name.as_str())
                                && observed_db.write_operations_per_second
                                    == Some(throughput.write_operations_per_second)
                                && observed_db.read_operations_per_second
                                    == Some(throughput.read_operations_per_second)
                        })
                    })
                    .cloned()
                    .collect();
                if !changed.is_empty() {
                    plan.update_throughput.push((region.name.clone(), changed));
                }
            }
        }
    }

    let extra: Vec<String> = observed_by_name
        .keys()
        .filter(|name| !desired.iter().any(|region| &&region.name == name))
        .cloned()
        .collect();
    if !extra.is_empty() {
        if !delete_regions {
            return Err(CoreError::validation(format!(
                "regions {extra:?} exist but are not configured; set delete_regions to allow removing them"
            )));
        }
        plan.delete = extra;
    }

    Ok(plan)
}

impl RegionsResource {
    fn desired_from_attrs(data: &ResourceData) -> Vec<DesiredRegion> {
        translate::blocks(data, "region")
            .iter()
            .map(|block| DesiredRegion {
                name: translate::map_str(block, "region").unwrap_or_default(),
                cidr: translate::map_str(block, "networking_deployment_cidr").unwrap_or_default(),
                recreate: translate::map_bool(block, "recreate_region").unwrap_or_default(),
                databases: block
                    .get("database")
                    .and_then(AttrValue::as_items)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(AttrValue::as_map)
                    .map(|database| DesiredThroughput {
                        database_id: translate::map_i64(database, "database_id"),
                        database_name: translate::map_str(database, "database_name")
                            .unwrap_or_default(),
                        write_operations_per_second: translate::map_i64(
                            database,
                            "local_write_operations_per_second",
                        )
                        .unwrap_or(1000),
                        read_operations_per_second: translate::map_i64(
                            database,
                            "local_read_operations_per_second",
                        )
                        .unwrap_or(1000),
                    })
                    .collect(),
            })
            .collect()
    }

    async fn create_region(
        &self,
        ctx: &Context,
        subscription: i64,
        region: &DesiredRegion,
        timeout: std::time::Duration,
    ) -> Result<()> {
        tracing::info!("creating region {} in subscription {}", region.name, subscription);
        let request = CreateRegionRequest {
            region: Some(region.name.clone()),
            deployment_cidr: Some(region.cidr.clone()),
            resp_version: None,
            databases: Some(
                region
                    .databases
                    .iter()
                    .map(|database| CreateRegionDatabase {
                        name: database.database_name.clone(),
                        local_write_operations_per_second: Some(
                            database.write_operations_per_second,
                        ),
                        local_read_operations_per_second: Some(
                            database.read_operations_per_second,
                        ),
                    })
                    .collect(),
            ),
        };
        let task_id = ctx.client.regions().create(subscription, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        waits::subscription_active(ctx, subscription, timeout).await?;
        Ok(())
    }

    async fn delete_regions(
        &self,
        ctx: &Context,
        subscription: i64,
        names: &[String],
        timeout: std::time::Duration,
    ) -> Result<()> {
        tracing::info!("deleting regions {:?} from subscription {}", names, subscription);
        let request = DeleteRegionsRequest {
            regions: names
                .iter()
                .map(|name| DeleteRegionSpec {
                    region: name.clone(),
                })
                .collect(),
        };
        let task_id = ctx.client.regions().delete(subscription, &request).await?;
        wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
        waits::subscription_active(ctx, subscription, timeout).await?;
        Ok(())
    }

    async fn push_throughput(
        &self,
        ctx: &Context,
        subscription: i64,
        region: &str,
        changed: &[DesiredThroughput],
        timeout: std::time::Duration,
    ) -> Result<()> {
        for throughput in changed {
            let Some(database) = throughput.database_id else {
                return Err(CoreError::validation(format!(
                    "database {:?} in region {region:?} has no database_id; apply after the database exists",
                    throughput.database_name
                )));
            };
            tracing::info!(
                "updating throughput of database {} in region {}",
                database,
                region
            );
            let request = UpdateActiveActiveDatabaseRequest {
                regions: Some(vec![LocalRegionProperties {
                    region: Some(region.to_string()),
                    local_throughput_measurement: Some(LocalThroughput {
                        region: Some(region.to_string()),
                        write_operations_per_second: throughput.write_operations_per_second,
                        read_operations_per_second: throughput.read_operations_per_second,
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            };
            let task_id = ctx
                .client
                .databases()
                .update_active_active(subscription, database, &request)
                .await?;
            wait_for_task(&ctx.client.tasks(), &task_id, &ctx.backoff).await?;
            waits::subscription_active(ctx, subscription, timeout).await?;
        }
        Ok(())
    }

    async fn reconcile(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let timeouts = self.timeouts();
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        let desired = Self::desired_from_attrs(data);
        let delete_flag = data.get_bool("delete_regions").unwrap_or_default();

        let _guard = ctx.lock_subscription(subscription).await;
        let observed = ctx.client.regions().list(subscription).await?;
        let plan = plan_regions(&desired, &observed, delete_flag)?;
        if plan.is_empty() {
            tracing::debug!("regions of subscription {} already converged", subscription);
            return Ok(());
        }

        for region in &plan.recreate {
            self.delete_regions(ctx, subscription, &[region.name.clone()], timeouts.update)
                .await?;
            self.create_region(ctx, subscription, region, timeouts.update).await?;
        }
        for region in &plan.create {
            self.create_region(ctx, subscription, region, timeouts.update).await?;
        }
        if !plan.delete.is_empty() {
            self.delete_regions(ctx, subscription, &plan.delete, timeouts.update).await?;
        }
        for (region, changed) in &plan.update_throughput {
            self.push_throughput(ctx, subscription, region, changed, timeouts.update)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Resource for RegionsResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_active_active_regions"
    }

    async fn create(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        let subscription = data
            .get_i64("subscription_id")
            .ok_or_else(|| CoreError::validation("subscription_id is required"))?;
        self.reconcile(ctx, data).await?;
        data.set_id(subscription.to_string());
        self.read(ctx, data).await?;
        Ok(())
    }

    async fn read(&self, ctx: &Context, data: &mut ResourceData) -> Result<ReadOutcome> {
        let subscription = parse_scalar_id(data.id())?;
        let observed = match ctx.client.regions().list(subscription).await {
            Ok(observed) => observed,
            Err(error) if error.is_not_found() => {
                data.clear_id();
                return Ok(ReadOutcome::Removed);
            }
            Err(error) => return Err(error.into()),
        };

        data.set("subscription_id", AttrValue::Int(subscription));
        let regions: Vec<AttrValue> = observed
            .iter()
            .map(|region| {
                let mut block = BTreeMap::new();
                block.insert(
                    "region".to_string(),
                    AttrValue::str(region.region.clone().unwrap_or_default()),
                );
                block.insert(
                    "region_id".to_string(),
                    AttrValue::Int(region.region_id.unwrap_or_default()),
                );
                block.insert(
                    "networking_deployment_cidr".to_string(),
                    AttrValue::str(region.deployment_cidr.clone().unwrap_or_default()),
                );
                block.insert(
                    "vpc_id".to_string(),
                    AttrValue::str(region.vpc_id.clone().unwrap_or_default()),
                );
                block.insert(
                    "database".to_string(),
                    AttrValue::Set(
                        region
                            .databases
                            .iter()
                            .map(|database| {
                                let mut database_block = BTreeMap::new();
                                database_block.insert(
                                    "database_id".to_string(),
                                    AttrValue::Int(database.database_id.unwrap_or_default()),
                                );
                                database_block.insert(
                                    "database_name".to_string(),
                                    AttrValue::str(
                                        database.database_name.clone().unwrap_or_default(),
                                    ),
                                );
                                database_block.insert(
                                    "local_write_operations_per_second".to_string(),
                                    AttrValue::Int(
                                        database.write_operations_per_second.unwrap_or_default(),
                                    ),
                                );
                                database_block.insert(
                                    "local_read_operations_per_second".to_string(),
                                    AttrValue::Int(
                                        database.read_operations_per_second.unwrap_or_default(),
                                    ),
                                );
                                AttrValue::Map(database_block)
                            })
                            .collect(),
                    ),
                );
                AttrValue::Map(block)
            })
            .collect();
        data.set("region", AttrValue::Set(regions));
        Ok(ReadOutcome::InState)
    }

    async fn update(&self, ctx: &Context, data: &mut ResourceData) -> Result<()> {
        self.reconcile(ctx, data).await?;
        self.read(ctx, data).await?;
        Ok(())
    }

    /// The regions resource is a view over the subscription; deleting it
    /// forgets the resource without touching remote regions.
    async fn delete(&self, _ctx: &Context, data: &mut ResourceData) -> Result<()> {
        data.clear_id();
        Ok(())
    }

    fn import(&self, id: &str, data: &mut ResourceData) -> Result<()> {
        let subscription = parse_scalar_id(id)?;
        data.set_id(id);
        data.set("subscription_id", AttrValue::Int(subscription));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rediscloud_client::regions::RegionDatabase;

    fn desired(name: &str, cidr: &str, recreate: bool, throughput: &[(i64, &str, i64, i64)]) -> DesiredRegion {
        DesiredRegion {
            name: name.to_string(),
            cidr: cidr.to_string(),
            recreate,
            databases: throughput
                .iter()
                .map(|(id, db, write, read)| DesiredThroughput {
                    database_id: Some(*id),
                    database_name: db.to_string(),
                    write_operations_per_second: *write,
                    read_operations_per_second: *read,
                })
                .collect(),
        }
    }

    fn observed(name: &str, cidr: &str, throughput: &[(i64, &str, i64, i64)]) -> Region {
        Region {
            region_id: Some(1),
            region: Some(name.to_string()),
            deployment_cidr: Some(cidr.to_string()),
            vpc_id: None,
            databases: throughput
                .iter()
                .map(|(id, db, write, read)| RegionDatabase {
                    database_id: Some(*id),
                    database_name: Some(db.to_string()),
                    write_operations_per_second: Some(*write),
                    read_operations_per_second: Some(*read),
                })
                .collect(),
        }
    }

    #[test]
    fn missing_region_is_created() {
        let plan = plan_regions(
            &[desired("us-east-1", "10.0.0.0/24", false, &[])],
            &[],
            false,
        )
        .unwrap();
        assert_eq!(plan.create.len(), 1);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn extra_region_requires_delete_flag() {
        let observed = vec![observed("us-east-2", "10.0.1.0/24", &[])];
        let err = plan_regions(&[], &observed, false).unwrap_err();
        assert!(err.to_string().contains("delete_regions"));

        let plan = plan_regions(&[], &observed, true).unwrap();
        assert_eq!(plan.delete, vec!["us-east-2".to_string()]);
    }

    #[test]
    fn cidr_change_requires_recreate_flag() {
        let observed = vec![observed("us-east-1", "10.0.0.0/24", &[])];
        let changed = vec![desired("us-east-1", "10.9.0.0/24", false, &[])];
        assert!(plan_regions(&changed, &observed, false).is_err());

        let allowed = vec![desired("us-east-1", "10.9.0.0/24", true, &[])];
        let plan = plan_regions(&allowed, &observed, false).unwrap();
        assert_eq!(plan.recreate.len(), 1);
        assert!(plan.create.is_empty());
    }

    #[test]
    fn throughput_updates_only_when_numbers_differ() {
        let observed_regions = vec![observed(
            "us-east-1",
            "10.0.0.0/24",
            &[(51, "db-one", 1000, 1000), (52, "db-two", 2000, 2000)],
        )];

        // Matching numbers: converged, no update.
        let same = vec![desired(
            "us-east-1",
            "10.0.0.0/24",
            false,
            &[(51, "db-one", 1000, 1000), (52, "db-two", 2000, 2000)],
        )];
        let plan = plan_regions(&same, &observed_regions, false).unwrap();
        assert!(plan.is_empty());

        // One database differs: only that one is pushed.
        let differs = vec![desired(
            "us-east-1",
            "10.0.0.0/24",
            false,
            &[(51, "db-one", 1000, 1000), (52, "db-two", 5000, 2000)],
        )];
        let plan = plan_regions(&differs, &observed_regions, false).unwrap();
        assert_eq!(plan.update_throughput.len(), 1);
        let (region, changed) = &plan.update_throughput[0];
        assert_eq!(region, "us-east-1");
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].database_name, "db-two");
    }
}
