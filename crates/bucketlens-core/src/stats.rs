//! Prefix statistics cache.
//!
//! Aggregates (total size, latest modification time) for a
//! `(store, bucket, prefix)` key are computed by walking the full listing
//! under the prefix in a detached task. The cache records one of three
//! states per key:
//!
//! - **pending**: a computation is in flight. The pending entry is the
//!   de-duplication guard; a second schedule for the key is a no-op.
//! - **ready**: totals are available.
//! - **failed**: the last computation failed; the message is kept and the
//!   key is not retried until it is invalidated.
//!
//! Each computation carries a generation number. Completion is applied only
//! to the pending entry of the same generation, so a cancelled or
//! superseded task can never overwrite a newer entry and a ready entry
//! never goes back to not-ready except through [`PrefixStatsCache::invalidate`].
//!
//! Running computations are bounded by a semaphore, and every pending entry
//! holds the [`AbortHandle`] of its task so invalidation can cancel it.
//! Map guards are never held across an `.await`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

use bucketlens_model::PrefixStatsView;

use crate::error::StoreError;
use crate::store::{ListObjectsRequest, StoreClient, for_each_page};

/// Cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixKey {
    /// Canonical (resolved) store name.
    pub store: String,
    pub bucket: String,
    /// Normalized prefix, with trailing `/` when non-empty.
    pub prefix: String,
}

impl PrefixKey {
    #[must_use]
    pub fn new(store: impl Into<String>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

/// Aggregates over every object under a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixTotals {
    /// Sum of the sizes the store reported. Objects without a size are not
    /// counted, so this is a lower bound when `objects_without_size > 0`.
    pub total_size: i64,
    /// Latest modification time; `None` for an empty prefix.
    pub last_modified: Option<DateTime<Utc>>,
    /// Number of objects enumerated.
    pub object_count: u64,
    /// Objects listed without a size.
    pub objects_without_size: u64,
}

/// State of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixStatsState {
    Pending,
    Ready(PrefixTotals),
    Failed(String),
}

/// One cache entry as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixStatsEntry {
    pub state: PrefixStatsState,
    /// When the entry last changed state.
    pub updated_at: DateTime<Utc>,
}

impl PrefixStatsEntry {
    /// Totals, if the entry is ready.
    #[must_use]
    pub fn totals(&self) -> Option<&PrefixTotals> {
        match &self.state {
            PrefixStatsState::Ready(totals) => Some(totals),
            _ => None,
        }
    }

    /// Wire view for the poll endpoint.
    ///
    /// A scheduled entry always carries `size`, which stays `0` until the
    /// totals are ready.
    #[must_use]
    pub fn to_view(&self) -> PrefixStatsView {
        let mut view = PrefixStatsView {
            size: Some(0),
            updated_at: Some(self.updated_at),
            ..PrefixStatsView::default()
        };
        match &self.state {
            PrefixStatsState::Pending => {}
            PrefixStatsState::Ready(totals) => {
                view.ready = true;
                view.size = Some(totals.total_size);
                view.last_modified = totals.last_modified;
                view.objects_without_size =
                    (totals.objects_without_size > 0).then_some(totals.objects_without_size);
            }
            PrefixStatsState::Failed(message) => view.error = Some(message.clone()),
        }
        view
    }
}

/// Why a background computation produced no totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputationError {
    /// The walk failed; the message is kept on the entry.
    Failed(String),
    /// The store was removed while the computation was queued or running.
    /// The entry is dropped instead of recording a failure.
    StoreRemoved,
}

impl From<StoreError> for ComputationError {
    fn from(err: StoreError) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Proof that the holder started the computation for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationTicket {
    key: PrefixKey,
    generation: u64,
}

impl ComputationTicket {
    #[must_use]
    pub fn key(&self) -> &PrefixKey {
        &self.key
    }
}

#[derive(Debug)]
struct Slot {
    entry: PrefixStatsEntry,
    generation: u64,
    task: Option<AbortHandle>,
}

impl Slot {
    fn is_pending(&self) -> bool {
        matches!(self.entry.state, PrefixStatsState::Pending)
    }
}

/// Concurrent cache of prefix aggregates with a bounded background worker.
#[derive(Debug)]
pub struct PrefixStatsCache {
    slots: DashMap<PrefixKey, Slot>,
    next_generation: AtomicU64,
    permits: Arc<Semaphore>,
}

impl PrefixStatsCache {
    /// Create a cache running at most `max_concurrency` computations at once.
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            slots: DashMap::new(),
            next_generation: AtomicU64::new(1),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Current entry for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &PrefixKey) -> Option<PrefixStatsEntry> {
        self.slots.get(key).map(|slot| slot.entry.clone())
    }

    /// Atomically insert a pending entry if `key` is absent.
    ///
    /// Returns a ticket only to the caller that inserted it.
    pub fn try_begin_computation(&self, key: PrefixKey) -> Option<ComputationTicket> {
        match self.slots.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let ticket = ComputationTicket {
                    key: vacant.key().clone(),
                    generation,
                };
                vacant.insert(Slot {
                    entry: PrefixStatsEntry {
                        state: PrefixStatsState::Pending,
                        updated_at: Utc::now(),
                    },
                    generation,
                    task: None,
                });
                Some(ticket)
            }
        }
    }

    /// Record the task working on `ticket` so it can be cancelled.
    ///
    /// The handle is aborted instead when the entry is gone, was replaced,
    /// or has already completed.
    pub fn attach_task(&self, ticket: &ComputationTicket, handle: AbortHandle) {
        if let Some(mut slot) = self.slots.get_mut(&ticket.key) {
            if slot.generation == ticket.generation && slot.is_pending() {
                slot.task = Some(handle);
                return;
            }
        }
        handle.abort();
    }

    /// Finish the computation started by `ticket`.
    ///
    /// Returns `false` when the result was discarded because the entry is
    /// no longer the pending entry this ticket created.
    pub fn complete(&self, ticket: &ComputationTicket, result: Result<PrefixTotals, String>) -> bool {
        let Some(mut slot) = self.slots.get_mut(&ticket.key) else {
            return false;
        };
        if slot.generation != ticket.generation || !slot.is_pending() {
            return false;
        }
        slot.entry = PrefixStatsEntry {
            state: match result {
                Ok(totals) => PrefixStatsState::Ready(totals),
                Err(message) => PrefixStatsState::Failed(message),
            },
            updated_at: Utc::now(),
        };
        slot.task = None;
        true
    }

    /// Drop the pending entry created by `ticket`, leaving the key absent.
    ///
    /// Entries of another generation are left alone.
    pub fn discard(&self, ticket: &ComputationTicket) -> bool {
        self.slots
            .remove_if(&ticket.key, |_, slot| {
                slot.generation == ticket.generation && slot.is_pending()
            })
            .is_some()
    }

    /// Schedule `compute` for `key` unless an entry already exists.
    ///
    /// The computation runs detached once a worker permit is available.
    /// Returns whether a new computation was scheduled.
    pub fn ensure_scheduled<F, Fut>(self: &Arc<Self>, key: PrefixKey, compute: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<PrefixTotals, ComputationError>> + Send + 'static,
    {
        let Some(ticket) = self.try_begin_computation(key) else {
            return false;
        };

        let cache = Arc::clone(self);
        let permits = Arc::clone(&self.permits);
        let task_ticket = ticket.clone();
        let handle = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let key = task_ticket.key();
            debug!(
                store = %key.store,
                bucket = %key.bucket,
                prefix = %key.prefix,
                "computing prefix stats"
            );
            let result = match compute().await {
                Ok(totals) => {
                    debug!(
                        store = %key.store,
                        bucket = %key.bucket,
                        prefix = %key.prefix,
                        size = totals.total_size,
                        objects = totals.object_count,
                        "prefix stats ready"
                    );
                    Ok(totals)
                }
                Err(ComputationError::Failed(message)) => {
                    warn!(
                        store = %key.store,
                        bucket = %key.bucket,
                        prefix = %key.prefix,
                        error = %message,
                        "prefix stats computation failed"
                    );
                    Err(message)
                }
                Err(ComputationError::StoreRemoved) => {
                    let dropped = cache.discard(&task_ticket);
                    debug!(
                        store = %key.store,
                        bucket = %key.bucket,
                        prefix = %key.prefix,
                        dropped,
                        "store removed, dropping prefix stats"
                    );
                    return;
                }
            };
            if !cache.complete(&task_ticket, result) {
                trace!(prefix = %task_ticket.key().prefix, "discarded stale prefix stats");
            }
        });
        self.attach_task(&ticket, handle.abort_handle());
        true
    }

    /// Remove the entry for `key`, cancelling its computation.
    pub fn invalidate(&self, key: &PrefixKey) -> bool {
        match self.slots.remove(key) {
            Some((_, slot)) => {
                if let Some(task) = slot.task {
                    task.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Remove every entry of `store`, cancelling their computations.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_store(&self, store: &str) -> usize {
        let mut removed = 0;
        self.slots.retain(|key, slot| {
            if key.store != store {
                return true;
            }
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            removed += 1;
            false
        });
        if removed > 0 {
            debug!(store, removed, "invalidated prefix stats");
        }
        removed
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_pending()).count()
    }
}

/// Walk every page under `prefix` and aggregate sizes and modification times.
///
/// ```
/// use bucketlens_core::stats::compute_prefix_totals;
/// use bucketlens_core::store::MemoryStore;
///
/// let store = MemoryStore::new().with_page_size(1);
/// store.insert_object("b", "logs/a.log", vec![0u8; 3]);
/// store.insert_object("b", "logs/b.log", vec![0u8; 4]);
///
/// let totals = tokio_test::block_on(compute_prefix_totals(&store, "b", "logs/")).unwrap();
/// assert_eq!(totals.total_size, 7);
/// assert_eq!(totals.object_count, 2);
/// ```
pub async fn compute_prefix_totals(
    client: &dyn StoreClient,
    bucket: &str,
    prefix: &str,
) -> Result<PrefixTotals, StoreError> {
    let mut totals = PrefixTotals::default();
    let pages = for_each_page(client, ListObjectsRequest::recursive(bucket, prefix), |page| {
        for object in page.objects {
            totals.object_count += 1;
            match object.size {
                Some(size) => totals.total_size += size,
                None => totals.objects_without_size += 1,
            }
            if let Some(ts) = object.last_modified {
                totals.last_modified = Some(totals.last_modified.map_or(ts, |cur| cur.max(ts)));
            }
        }
    })
    .await?;

    if totals.objects_without_size > 0 {
        debug!(
            bucket,
            prefix,
            skipped = totals.objects_without_size,
            "objects without size excluded from prefix total"
        );
    }
    trace!(bucket, prefix, pages, "prefix walk finished");
    Ok(totals)
}
