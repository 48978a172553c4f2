//! Typed REST client for the Redis Cloud control-plane API
//!
//! Mutating endpoints are asynchronous on the server side: they answer with a
//! task id that callers poll through [`task::Tasks`] until the task settles.
//! Reads return typed structs; absences surface as per-entity variants of
//! [`ApiError`] so callers can distinguish "gone" from "broken".
//!
//! # Authentication
//!
//! Requests carry the `x-api-key` and `x-api-secret-key` headers. Unset
//! credentials fall back to the `REDISCLOUD_URL`, `REDISCLOUD_ACCESS_KEY`,
//! and `REDISCLOUD_SECRET_KEY` environment variables.
//!
//! # Example
//!
//! ```ignore
//! use rediscloud_client::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::default())?;
//! let subscription = client.subscriptions().get(1234).await?;
//! println!("{:?}", subscription.status);
//! ```

pub mod account;
pub mod acl;
pub mod database;
pub mod error;
pub mod http;
pub mod peering;
pub mod private_link;
pub mod psc;
pub mod regions;
pub mod subscription;
pub mod tags;
pub mod task;
pub mod transit_gateway;

pub use error::{ApiError, Result};
pub use http::{ClientConfig, DEFAULT_BASE_URL, HttpClient};
pub use task::{Task, TaskError, TaskResponse};

use std::sync::Arc;

/// Shared handle over every API service
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let resolved = config.resolve()?;
        Ok(Self {
            http: Arc::new(HttpClient::new(resolved)),
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    pub fn tasks(&self) -> task::Tasks {
        task::Tasks::new(Arc::clone(&self.http))
    }

    pub fn subscriptions(&self) -> subscription::Subscriptions {
        subscription::Subscriptions::new(Arc::clone(&self.http))
    }

    pub fn databases(&self) -> database::Databases {
        database::Databases::new(Arc::clone(&self.http))
    }

    pub fn regions(&self) -> regions::Regions {
        regions::Regions::new(Arc::clone(&self.http))
    }

    pub fn peerings(&self) -> peering::Peerings {
        peering::Peerings::new(Arc::clone(&self.http))
    }

    pub fn transit_gateways(&self) -> transit_gateway::TransitGateways {
        transit_gateway::TransitGateways::new(Arc::clone(&self.http))
    }

    pub fn private_links(&self) -> private_link::PrivateLinks {
        private_link::PrivateLinks::new(Arc::clone(&self.http))
    }

    pub fn psc(&self) -> psc::Psc {
        psc::Psc::new(Arc::clone(&self.http))
    }

    pub fn acl(&self) -> acl::Acl {
        acl::Acl::new(Arc::clone(&self.http))
    }

    pub fn accounts(&self) -> account::Accounts {
        account::Accounts::new(Arc::clone(&self.http))
    }

    pub fn tags(&self) -> tags::Tags {
        tags::Tags::new(Arc::clone(&self.http))
    }
}
