//! Per-request client resolution.
//!
//! [`ClientResolver::resolve`] picks a store from the registry, derives the
//! signing region and addressing mode, and asks a [`ClientFactory`] for a
//! client. Resolution never touches the network, and clients are rebuilt on
//! every call.

use std::sync::Arc;

use bucketlens_model::StoreConfig;
use tracing::debug;

use crate::error::BrowserError;
use crate::registry::StoreRegistry;
use crate::store::{S3StoreClient, StoreClient};

/// Signing region used for custom endpoints without an explicit one.
pub const DEFAULT_SIGNING_REGION: &str = "us-east-1";

/// Signing region for a store.
///
/// An explicit signing region wins. Otherwise a custom endpoint signs as
/// [`DEFAULT_SIGNING_REGION`], and an AWS store signs with its own region.
///
/// ```
/// use bucketlens_core::resolver::signing_region_for;
/// use bucketlens_model::StoreConfig;
///
/// let minio = StoreConfig {
///     region: "local".to_owned(),
///     endpoint: Some("http://minio:9000".to_owned()),
///     ..Default::default()
/// };
/// assert_eq!(signing_region_for(&minio), "us-east-1");
/// ```
#[must_use]
pub fn signing_region_for(config: &StoreConfig) -> String {
    if let Some(explicit) = config.signing_region() {
        explicit.to_owned()
    } else if config.endpoint().is_some() {
        DEFAULT_SIGNING_REGION.to_owned()
    } else {
        config.region.clone()
    }
}

/// Everything needed to build a client for one store, minus the secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDescriptor {
    /// Resolved store name.
    pub store_name: String,
    /// Nominal region.
    pub region: String,
    /// Region used for request signing.
    pub signing_region: String,
    /// Custom endpoint, if any.
    pub endpoint: Option<String>,
    /// Bucket in the path rather than the host. Always set.
    pub force_path_style: bool,
}

impl ClientDescriptor {
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            store_name: config.name.clone(),
            region: config.region.clone(),
            signing_region: signing_region_for(config),
            endpoint: config.endpoint().map(str::to_owned),
            force_path_style: true,
        }
    }
}

/// Turns a descriptor into a usable store client.
pub trait ClientFactory: Send + Sync + std::fmt::Debug {
    /// Build a client; must not perform network calls.
    fn build(&self, descriptor: &ClientDescriptor, config: &StoreConfig) -> Arc<dyn StoreClient>;
}

/// Builds [`S3StoreClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3ClientFactory;

impl ClientFactory for S3ClientFactory {
    fn build(&self, descriptor: &ClientDescriptor, config: &StoreConfig) -> Arc<dyn StoreClient> {
        Arc::new(S3StoreClient::new(
            descriptor,
            &config.access_key,
            &config.secret_key,
        ))
    }
}

/// A client bound to one store, owned by the request that resolved it.
#[derive(Debug, Clone)]
pub struct ResolvedClient {
    /// How the client was configured.
    pub descriptor: ClientDescriptor,
    /// The client itself.
    pub client: Arc<dyn StoreClient>,
}

impl ResolvedClient {
    /// The canonical name of the resolved store.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.descriptor.store_name
    }
}

/// Resolves store names to clients.
#[derive(Debug, Clone)]
pub struct ClientResolver {
    registry: Arc<StoreRegistry>,
    factory: Arc<dyn ClientFactory>,
}

impl ClientResolver {
    #[must_use]
    pub fn new(registry: Arc<StoreRegistry>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { registry, factory }
    }

    /// Resolve `store_name` (empty for the default store) to a client.
    pub fn resolve(&self, store_name: &str) -> Result<(ResolvedClient, StoreConfig), BrowserError> {
        let config = self
            .registry
            .find(store_name)
            .ok_or_else(|| BrowserError::StoreNotFound {
                name: store_name.to_owned(),
            })?;
        let descriptor = ClientDescriptor::from_config(&config);
        debug!(
            requested = %store_name,
            store = %descriptor.store_name,
            signing_region = %descriptor.signing_region,
            "resolved store client"
        );
        let client = self.factory.build(&descriptor, &config);
        Ok((ResolvedClient { descriptor, client }, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryClientFactory;

    fn config(name: &str, region: &str, signing: Option<&str>, endpoint: Option<&str>) -> StoreConfig {
        StoreConfig {
            name: name.to_owned(),
            region: region.to_owned(),
            signing_region: signing.map(str::to_owned),
            access_key: "ak".to_owned(),
            secret_key: "sk".to_owned(),
            endpoint: endpoint.map(str::to_owned),
        }
    }

    #[test]
    fn test_should_choose_signing_region() {
        assert_eq!(
            signing_region_for(&config("a", "eu-west-1", None, None)),
            "eu-west-1"
        );
        assert_eq!(
            signing_region_for(&config("a", "local", None, Some("http://minio:9000"))),
            "us-east-1"
        );
        assert_eq!(
            signing_region_for(&config("a", "local", Some("ceph"), Some("http://ceph"))),
            "ceph"
        );
        assert_eq!(
            signing_region_for(&config("a", "eu-west-1", Some(""), Some(""))),
            "eu-west-1"
        );
    }

    #[test]
    fn test_should_always_use_path_style() {
        let descriptor = ClientDescriptor::from_config(&config("a", "eu-west-1", None, None));
        assert!(descriptor.force_path_style);
        assert_eq!(descriptor.endpoint, None);
    }

    #[test]
    fn test_should_resolve_default_and_named_stores() {
        let registry = Arc::new(StoreRegistry::in_memory(vec![
            config("first", "us-west-2", None, None),
            config("minio", "local", None, Some("http://localhost:9000")),
        ]));
        let resolver = ClientResolver::new(registry, Arc::new(MemoryClientFactory::new()));

        let (client, cfg) = resolver.resolve("").expect("default store");
        assert_eq!(client.store_name(), "first");
        assert_eq!(cfg.region, "us-west-2");

        let (client, _) = resolver.resolve("minio").expect("named store");
        assert_eq!(client.descriptor.signing_region, "us-east-1");
        assert_eq!(client.descriptor.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_should_fail_for_unknown_store() {
        let registry = Arc::new(StoreRegistry::in_memory(vec![config("a", "r", None, None)]));
        let resolver = ClientResolver::new(registry, Arc::new(MemoryClientFactory::new()));
        let err = resolver.resolve("nope").expect_err("unknown store");
        assert!(matches!(err, BrowserError::StoreNotFound { ref name } if name == "nope"));
    }

    #[tokio::test]
    async fn test_should_build_real_s3_client_offline() {
        let registry = Arc::new(StoreRegistry::in_memory(vec![config(
            "minio",
            "local",
            None,
            Some("http://127.0.0.1:1"),
        )]));
        let resolver = ClientResolver::new(registry, Arc::new(S3ClientFactory));
        assert!(resolver.resolve("minio").is_ok());
    }
}
