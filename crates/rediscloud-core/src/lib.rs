//! Reconciliation primitives for the Redis Cloud provider
//!
//! This crate sits between the REST client and the resource controllers:
//!
//! - [`task_waiter`]: polls task envelopes until a resource id or error falls
//!   out, with exponential back-off.
//! - [`state_waiter`]: generic pending→target status poller with delay,
//!   interval, and timeout.
//! - [`lock`]: the per-subscription mutation mutex registry.
//! - [`ids`]: composite id codecs (the external import contract).
//! - [`schema`]: tagged attribute values and the resource-data handle.
//! - [`defaults`]: server-default back-substitution so computed defaults do
//!   not read as drift.
//! - [`filters`]: predicate combinators for data-source reads.

pub mod defaults;
pub mod error;
pub mod filters;
pub mod ids;
pub mod lock;
pub mod schema;
pub mod state_waiter;
pub mod task_waiter;

pub use error::{CoreError, Result};
pub use lock::SubscriptionLocks;
pub use schema::{AttrMap, AttrValue, ResourceData};
pub use state_waiter::{Observed, WaitConfig, wait_for_state};
pub use task_waiter::{Backoff, wait_for_resource, wait_for_resource_id, wait_for_task};
