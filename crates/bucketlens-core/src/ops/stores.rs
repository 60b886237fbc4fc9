//! Store management.

use tracing::info;

use bucketlens_model::{StoreConfig, StoreView};

use crate::error::BrowserError;
use crate::provider::BucketLens;

impl BucketLens {
    /// All configured stores, without secrets.
    #[must_use]
    pub fn handle_list_stores(&self) -> Vec<StoreView> {
        self.registry.list().iter().map(StoreView::from).collect()
    }

    /// Register and persist a new store.
    pub fn handle_create_store(&self, config: StoreConfig) -> Result<StoreView, BrowserError> {
        let view = StoreView::from(&config);
        self.registry.add(config)?;
        Ok(view)
    }

    /// Remove a store and drop every cached aggregate that belongs to it.
    pub fn handle_delete_store(&self, name: &str) -> Result<(), BrowserError> {
        self.registry.remove(name)?;
        let invalidated = self.stats.invalidate_store(name);
        info!(store = %name, invalidated, "store deleted");
        Ok(())
    }
}
