//! HTTP transport for the Redis Cloud REST API
//!
//! Wraps `reqwest` with base-URL resolution and the two Redis Cloud auth
//! headers. Services layered on top map generic HTTP failures into typed
//! per-entity errors.

use crate::error::{ApiError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_BASE_URL: &str = "https://api.redislabs.com/v1";

const ENV_URL: &str = "REDISCLOUD_URL";
const ENV_ACCESS_KEY: &str = "REDISCLOUD_ACCESS_KEY";
const ENV_SECRET_KEY: &str = "REDISCLOUD_SECRET_KEY";

const HEADER_API_KEY: &str = "x-api-key";
const HEADER_SECRET_KEY: &str = "x-api-secret-key";

/// Connection settings for the API client
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

impl ClientConfig {
    /// Resolve unset fields from the environment.
    ///
    /// `REDISCLOUD_URL` is optional and falls back to the public API URL;
    /// the two key variables are required when not set explicitly.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(ENV_URL).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = match self.api_key {
            Some(key) => key,
            None => std::env::var(ENV_ACCESS_KEY)
                .map_err(|_| ApiError::MissingEnvVar(ENV_ACCESS_KEY.to_string()))?,
        };

        let secret_key = match self.secret_key {
            Some(key) => key,
            None => std::env::var(ENV_SECRET_KEY)
                .map_err(|_| ApiError::MissingEnvVar(ENV_SECRET_KEY.to_string()))?,
        };

        Ok(ResolvedConfig {
            base_url,
            api_key,
            secret_key,
        })
    }
}

/// Fully-resolved connection settings
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
}

/// Thin reqwest wrapper with auth headers and JSON helpers
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl HttpClient {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            secret_key: config.secret_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(HEADER_API_KEY, self.api_key.as_str())
            .header(HEADER_SECRET_KEY, self.secret_key.as_str())
    }

    async fn handle<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn handle_empty(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("GET {}", path);
        let response = self.apply_auth(self.client.get(self.url(path))).send().await?;
        self.handle(response).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        tracing::debug!("GET {} {:?}", path, query);
        let response = self
            .apply_auth(self.client.get(self.url(path)).query(query))
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        tracing::debug!("POST {}", path);
        let response = self
            .apply_auth(self.client.post(self.url(path)).json(body))
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        tracing::debug!("PUT {}", path);
        let response = self
            .apply_auth(self.client.put(self.url(path)).json(body))
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn put_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        tracing::debug!("PUT {}", path);
        let response = self
            .apply_auth(self.client.put(self.url(path)).json(body))
            .send()
            .await?;
        self.handle_empty(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        tracing::debug!("DELETE {}", path);
        let response = self
            .apply_auth(self.client.delete(self.url(path)))
            .send()
            .await?;
        self.handle(response).await
    }

    pub async fn delete_with_body<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        tracing::debug!("DELETE {}", path);
        let response = self
            .apply_auth(self.client.delete(self.url(path)).json(body))
            .send()
            .await?;
        self.handle(response).await
    }
}

/// Map a 404 into the typed absence produced by `not_found`.
pub(crate) fn map_not_found<T>(result: Result<T>, not_found: impl FnOnce() -> ApiError) -> Result<T> {
    match result {
        Err(ApiError::Api { status: 404, .. }) => Err(not_found()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn resolve_prefers_explicit_values() {
        let config = ClientConfig {
            base_url: Some("https://example.test/v1".to_string()),
            api_key: Some("key".to_string()),
            secret_key: Some("secret".to_string()),
        };
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.base_url, "https://example.test/v1");
        assert_eq!(resolved.api_key, "key");
        assert_eq!(resolved.secret_key, "secret");
    }

    #[test]
    #[serial]
    fn resolve_reads_environment() {
        unsafe {
            std::env::set_var("REDISCLOUD_URL", "https://env.test/v1");
            std::env::set_var("REDISCLOUD_ACCESS_KEY", "env-key");
            std::env::set_var("REDISCLOUD_SECRET_KEY", "env-secret");
        }

        let resolved = ClientConfig::default().resolve().unwrap();
        assert_eq!(resolved.base_url, "https://env.test/v1");
        assert_eq!(resolved.api_key, "env-key");
        assert_eq!(resolved.secret_key, "env-secret");

        unsafe {
            std::env::remove_var("REDISCLOUD_URL");
            std::env::remove_var("REDISCLOUD_ACCESS_KEY");
            std::env::remove_var("REDISCLOUD_SECRET_KEY");
        }
    }

    #[test]
    #[serial]
    fn resolve_requires_keys() {
        unsafe {
            std::env::remove_var("REDISCLOUD_ACCESS_KEY");
            std::env::remove_var("REDISCLOUD_SECRET_KEY");
        }
        let err = ClientConfig::default().resolve().unwrap_err();
        assert!(matches!(err, ApiError::MissingEnvVar(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpClient::new(ResolvedConfig {
            base_url: "https://example.test/v1/".to_string(),
            api_key: "k".to_string(),
            secret_key: "s".to_string(),
        });
        assert_eq!(client.base_url(), "https://example.test/v1");
    }
}
