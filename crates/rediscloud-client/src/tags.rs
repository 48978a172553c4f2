//! Database tag endpoints
//!
//! Tags are replaced as a whole set; the PUT is synchronous.

use crate::error::{ApiError, Result};
use crate::http::{HttpClient, map_not_found};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSet {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Database tag endpoints
#[derive(Clone)]
pub struct Tags {
    http: Arc<HttpClient>,
}

impl Tags {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn get(&self, subscription: i64, database: i64) -> Result<Vec<Tag>> {
        let response: TagSet = map_not_found(
            self.http
                .get(&format!(
                    "/subscriptions/{subscription}/databases/{database}/tags"
                ))
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )?;
        Ok(response.tags)
    }

    /// Replace the full tag set.
    pub async fn put(&self, subscription: i64, database: i64, tags: Vec<Tag>) -> Result<()> {
        map_not_found(
            self.http
                .put_empty(
                    &format!("/subscriptions/{subscription}/databases/{database}/tags"),
                    &TagSet { tags },
                )
                .await,
            || ApiError::DatabaseNotFound {
                subscription,
                database,
            },
        )
    }
}
