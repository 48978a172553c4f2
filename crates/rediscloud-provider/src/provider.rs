//! Provider assembly
//!
//! Builds the shared API client from provider configuration (with env
//! fallbacks) and registers every resource kind and data source under its
//! external type name.

use crate::acl::{AclRoleResource, AclRuleResource, AclUserResource};
use crate::active_active_database::ActiveActiveDatabaseResource;
use crate::active_active_subscription::ActiveActiveSubscriptionResource;
use crate::cloud_account::CloudAccountResource;
use crate::database::DatabaseResource;
use crate::datasources::{
    CloudAccountDataSource, DatabaseDataSource, PaymentMethodDataSource, RegionsDataSource,
    SubscriptionDataSource, TgwInvitationsDataSource,
};
use crate::peering::PeeringResource;
use crate::private_link::PrivateLinkResource;
use crate::psc::{PscEndpointAccepterResource, PscEndpointResource, PscServiceResource};
use crate::regions::RegionsResource;
use crate::resource::{Context, DataSource, Resource};
use crate::subscription::SubscriptionResource;
use crate::transit_gateway::{TgwAttachmentResource, TgwInvitationAccepterResource};
use rediscloud_client::{Client, ClientConfig};
use rediscloud_core::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Provider-level configuration
///
/// Everything is optional: unset values fall back to the `REDISCLOUD_URL`,
/// `REDISCLOUD_ACCESS_KEY`, and `REDISCLOUD_SECRET_KEY` environment
/// variables inside the client.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

/// The assembled provider: shared client, lock registry, and the resource
/// and data-source registries keyed by external type name.
pub struct Provider {
    context: Arc<Context>,
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::new(ClientConfig {
            base_url: config.url,
            api_key: config.api_key,
            secret_key: config.secret_key,
        })?;
        Ok(Self::with_context(Context::new(client)))
    }

    pub fn with_context(context: Context) -> Self {
        let mut provider = Self {
            context: Arc::new(context),
            resources: HashMap::new(),
            data_sources: HashMap::new(),
        };

        provider.register(Arc::new(SubscriptionResource));
        provider.register(Arc::new(DatabaseResource));
        provider.register(Arc::new(ActiveActiveSubscriptionResource));
        provider.register(Arc::new(ActiveActiveDatabaseResource));
        provider.register(Arc::new(RegionsResource));
        provider.register(Arc::new(PeeringResource));
        provider.register(Arc::new(TgwAttachmentResource));
        provider.register(Arc::new(TgwInvitationAccepterResource));
        provider.register(Arc::new(PrivateLinkResource));
        provider.register(Arc::new(PscServiceResource));
        provider.register(Arc::new(PscEndpointResource));
        provider.register(Arc::new(PscEndpointAccepterResource));
        provider.register(Arc::new(AclRuleResource));
        provider.register(Arc::new(AclRoleResource));
        provider.register(Arc::new(AclUserResource));
        provider.register(Arc::new(CloudAccountResource));

        provider.register_data_source(Arc::new(SubscriptionDataSource));
        provider.register_data_source(Arc::new(DatabaseDataSource));
        provider.register_data_source(Arc::new(RegionsDataSource));
        provider.register_data_source(Arc::new(PaymentMethodDataSource));
        provider.register_data_source(Arc::new(CloudAccountDataSource));
        provider.register_data_source(Arc::new(TgwInvitationsDataSource));

        provider
    }

    fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_sources
            .insert(data_source.type_name(), data_source);
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn resource(&self, type_name: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(type_name).cloned()
    }

    pub fn data_source(&self, type_name: &str) -> Option<Arc<dyn DataSource>> {
        self.data_sources.get(type_name).cloned()
    }

    pub fn resource_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn data_source_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.data_sources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> Provider {
        let client = Client::new(ClientConfig {
            base_url: Some("https://example.test/v1".to_string()),
            api_key: Some("k".to_string()),
            secret_key: Some("s".to_string()),
        })
        .unwrap();
        Provider::with_context(Context::new(client))
    }

    #[test]
    fn every_resource_kind_is_registered() {
        let provider = provider();
        for name in [
            "rediscloud_subscription",
            "rediscloud_database",
            "rediscloud_active_active_subscription",
            "rediscloud_active_active_database",
            "rediscloud_active_active_regions",
            "rediscloud_subscription_peering",
            "rediscloud_transit_gateway_attachment",
            "rediscloud_transit_gateway_invitation_accepter",
            "rediscloud_private_link",
            "rediscloud_private_service_connect",
            "rediscloud_private_service_connect_endpoint",
            "rediscloud_private_service_connect_endpoint_accepter",
            "rediscloud_acl_rule",
            "rediscloud_acl_role",
            "rediscloud_acl_user",
            "rediscloud_cloud_account",
        ] {
            assert!(provider.resource(name).is_some(), "{name} missing");
        }
        assert_eq!(provider.resource_names().len(), 16);
    }

    #[test]
    fn every_data_source_is_registered() {
        let provider = provider();
        for name in [
            "rediscloud_subscription",
            "rediscloud_database",
            "rediscloud_regions",
            "rediscloud_payment_method",
            "rediscloud_cloud_account",
            "rediscloud_transit_gateway_invitations",
        ] {
            assert!(provider.data_source(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn unknown_type_name_is_none() {
        assert!(provider().resource("rediscloud_nonexistent").is_none());
    }
}
