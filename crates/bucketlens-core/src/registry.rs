//! Region registry: the configured backing stores.
//!
//! Reads take a shared lock and clone what they need. Mutations are
//! serialized by a separate writer lock, write the candidate store list to
//! disk first, and only then swap it into memory, so a failed write leaves
//! both the file and the in-memory state as they were.
//!
//! Stores seeded from the environment are transient: they are visible to
//! lookups but never written to the registry file.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bucketlens_model::StoreConfig;

use crate::error::BrowserError;

/// Name of the store seeded from `AWS_*` environment variables.
pub const ENV_STORE_NAME: &str = "default";

/// On-disk registry document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    stores: Vec<StoreConfig>,
}

#[derive(Debug, Default)]
struct RegistryState {
    stores: Vec<StoreConfig>,
    transient: HashSet<String>,
}

/// The set of configured stores.
#[derive(Debug)]
pub struct StoreRegistry {
    state: RwLock<RegistryState>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl StoreRegistry {
    /// A registry that is never persisted.
    #[must_use]
    pub fn in_memory(stores: Vec<StoreConfig>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                stores,
                transient: HashSet::new(),
            }),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the registry persisted at `path`.
    ///
    /// A missing file yields an empty registry bound to `path`.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.into();
        let stores = match std::fs::read(&path) {
            Ok(raw) => {
                let file: RegistryFile = serde_json::from_slice(&raw)
                    .with_context(|| format!("invalid store registry {}", path.display()))?;
                file.stores
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no store registry file, starting empty");
                Vec::new()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read store registry {}", path.display()));
            }
        };
        info!(path = %path.display(), stores = stores.len(), "loaded store registry");

        Ok(Self {
            state: RwLock::new(RegistryState {
                stores,
                transient: HashSet::new(),
            }),
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// Add a store that lives only in memory, unless the name is taken.
    ///
    /// Returns whether the store was added.
    pub fn insert_transient(&self, config: StoreConfig) -> bool {
        let _writer = self.write_lock.lock();
        let mut state = self.state.write();
        if state.stores.iter().any(|s| s.name == config.name) {
            return false;
        }
        info!(store = %config.name, "registered transient store");
        state.transient.insert(config.name.clone());
        state.stores.push(config);
        true
    }

    /// Look up a store by exact name; an empty name selects the first store.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<StoreConfig> {
        let state = self.state.read();
        if name.is_empty() {
            return state.stores.first().cloned();
        }
        state.stores.iter().find(|s| s.name == name).cloned()
    }

    /// All stores, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<StoreConfig> {
        self.state.read().stores.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register a new store and persist the registry.
    pub fn add(&self, config: StoreConfig) -> Result<(), BrowserError> {
        if config.name.is_empty() || config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(BrowserError::invalid_argument(
                "name, access_key and secret_key are required",
            ));
        }

        let _writer = self.write_lock.lock();
        let (candidate, transient) = {
            let state = self.state.read();
            if state.stores.iter().any(|s| s.name == config.name) {
                return Err(BrowserError::StoreAlreadyExists { name: config.name });
            }
            let mut candidate = state.stores.clone();
            candidate.push(config.clone());
            (candidate, state.transient.clone())
        };

        self.persist(&candidate, &transient)?;
        self.state.write().stores = candidate;
        info!(store = %config.name, region = %config.region, "store added");
        Ok(())
    }

    /// Remove a store by name and persist the registry.
    pub fn remove(&self, name: &str) -> Result<StoreConfig, BrowserError> {
        let _writer = self.write_lock.lock();
        let (candidate, removed, transient) = {
            let state = self.state.read();
            let Some(index) = state.stores.iter().position(|s| s.name == name) else {
                return Err(BrowserError::NoSuchStore {
                    name: name.to_owned(),
                });
            };
            let mut candidate = state.stores.clone();
            let removed = candidate.remove(index);
            let mut transient = state.transient.clone();
            transient.remove(name);
            (candidate, removed, transient)
        };

        self.persist(&candidate, &transient)?;
        let mut state = self.state.write();
        state.stores = candidate;
        state.transient = transient;
        drop(state);
        info!(store = %name, "store removed");
        Ok(removed)
    }

    fn persist(&self, stores: &[StoreConfig], transient: &HashSet<String>) -> Result<(), BrowserError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let document = RegistryFile {
            stores: stores
                .iter()
                .filter(|s| !transient.contains(&s.name))
                .cloned()
                .collect(),
        };
        write_atomically(path, &document).map_err(|source| BrowserError::Persistence {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), stores = document.stores.len(), "persisted store registry");
        Ok(())
    }
}

fn write_atomically(path: &Path, document: &RegistryFile) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(document).map_err(std::io::Error::other)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(&json)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Build the environment-seeded store from `AWS_*` variables.
///
/// Returns `None` unless both the access key and secret key are set.
pub fn store_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<StoreConfig> {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let access_key = non_empty("AWS_ACCESS_KEY_ID")?;
    let secret_key = non_empty("AWS_SECRET_ACCESS_KEY")?;
    Some(StoreConfig {
        name: ENV_STORE_NAME.to_owned(),
        region: non_empty("AWS_REGION").unwrap_or_else(|| "us-east-1".to_owned()),
        signing_region: non_empty("AWS_SIGNING_REGION"),
        access_key,
        secret_key,
        endpoint: non_empty("AWS_ENDPOINT"),
    })
}
