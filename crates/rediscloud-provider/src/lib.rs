//! Declarative resource controllers for Redis Cloud
//!
//! Each resource kind (subscription, database, networking attachments,
//! access control) implements a Create/Read/Update/Delete contract that
//! converges desired configuration with observed API state:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  host runtime                    │
//! │          (plan / apply / state storage)          │
//! └─────────────────────┬────────────────────────────┘
//!                       │ ResourceData
//! ┌─────────────────────▼────────────────────────────┐
//! │              rediscloud-provider                  │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │   controllers: subscription, database,     │  │
//! │  │   regions, peering, TGW, PrivateLink, PSC, │  │
//! │  │   ACL, cloud account + data sources        │  │
//! │  └────────────────────────────────────────────┘  │
//! └───────┬──────────────────────────┬───────────────┘
//!         │ waits, locks, ids        │ typed requests
//! ┌───────▼──────────┐      ┌────────▼───────────────┐
//! │ rediscloud-core  │      │   rediscloud-client    │
//! └──────────────────┘      └────────────────────────┘
//! ```
//!
//! Mutations hold the per-subscription lock for their full duration, task
//! waits included; reads and data sources run lock-free and tolerate
//! transient intermediate states.

pub mod acl;
pub mod active_active_database;
pub mod active_active_subscription;
pub mod cloud_account;
pub mod database;
pub mod datasources;
pub mod peering;
pub mod private_link;
pub mod provider;
pub mod psc;
pub mod regions;
pub mod resource;
pub mod subscription;
pub mod transit_gateway;
pub mod translate;
pub mod waits;

pub use provider::{Provider, ProviderConfig};
pub use resource::{Context, DataSource, Polling, ReadOutcome, Resource, Timeouts};
