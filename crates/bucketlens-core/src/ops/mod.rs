//! Endpoint handlers.
//!
//! Each submodule adds `handle_*` methods to [`crate::provider::BucketLens`]
//! for one group of endpoints. The server binary bridges them to HTTP by
//! implementing `ApiHandler` from `bucketlens-http`.

pub mod archive;
pub mod list;
pub mod stats;
pub mod stores;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use bucketlens_model::StoreConfig;

    use crate::config::BrowserConfig;
    use crate::provider::BucketLens;
    use crate::registry::StoreRegistry;
    use crate::store::{MemoryClientFactory, MemoryStore};

    pub(crate) fn store_config(name: &str) -> StoreConfig {
        StoreConfig {
            name: name.to_owned(),
            region: "local".to_owned(),
            access_key: "ak".to_owned(),
            secret_key: "sk".to_owned(),
            endpoint: Some("http://localhost:9000".to_owned()),
            ..Default::default()
        }
    }

    /// A provider with stores `minio` (first, default) and `backup`, both
    /// backed by [`MemoryStore`]s from the returned factory.
    pub(crate) fn lens_with(
        config: BrowserConfig,
        minio: MemoryStore,
    ) -> (BucketLens, Arc<MemoryClientFactory>, Arc<MemoryStore>) {
        let factory = Arc::new(MemoryClientFactory::new());
        let store = factory.insert("minio", minio);
        factory.store("backup");
        let registry = Arc::new(StoreRegistry::in_memory(vec![
            store_config("minio"),
            store_config("backup"),
        ]));
        let lens = BucketLens::with_factory(config, registry, factory.clone());
        (lens, factory, store)
    }

    pub(crate) fn lens(minio: MemoryStore) -> (BucketLens, Arc<MemoryStore>) {
        let (lens, _, store) = lens_with(BrowserConfig::default(), minio);
        (lens, store)
    }
}
