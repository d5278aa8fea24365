//! The persistence controller: debounce, immediate flush, and the
//! backup loop, all operating on a single dirty flag.
//!
//! Marking dirty cancels any pending debounce task and arms a new one;
//! if the timer runs out uninterrupted and the flag is still set, the
//! non-sensitive store state is serialized and the flag cleared. Rapid
//! repeated mutations thus collapse to one write after the caller goes
//! quiet. Events too important to risk losing on a crash (creation,
//! death, revival, release) go through [`PersistenceController::flush`]
//! instead. The backup loop ignores the flag entirely and rewrites the
//! snapshot on a fixed interval whenever a live pet exists.
//!
//! Write failures are contained here: they are logged and the state
//! simply remains unpersisted until the next debounce, flush, or backup
//! trigger fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use menagerie_db::SnapshotStore;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::EntityStore;

/// Decides when the store's non-sensitive state reaches durable
/// storage.
pub struct PersistenceController {
    store: Arc<RwLock<EntityStore>>,
    snapshots: SnapshotStore,
    debounce: Duration,
    dirty: AtomicBool,
    /// The outstanding debounce task, if any. Cancel-and-replace on
    /// every new dirty mark; a plain mutex is enough because the guard
    /// is never held across an await.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceController {
    /// Create a controller over the given store and snapshot file.
    pub fn new(
        store: Arc<RwLock<EntityStore>>,
        snapshots: SnapshotStore,
        debounce: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            snapshots,
            debounce,
            dirty: AtomicBool::new(false),
            pending: Mutex::new(None),
        })
    }

    /// Mark the store state dirty without arming the debounce timer.
    ///
    /// Used immediately before [`flush`](Self::flush) by mutations whose
    /// changes must not wait out a quiet period.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Whether unpersisted changes are pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Mark dirty and (re)arm the debounce timer.
    ///
    /// Any outstanding debounce task is cancelled first, so a burst of
    /// calls produces exactly one write once the burst ends.
    pub fn schedule_save(self: &Arc<Self>) {
        self.mark_dirty();

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(controller.debounce).await;
            controller.write_if_dirty().await;
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(old) = pending.replace(handle) {
                old.abort();
            }
        }
    }

    /// Cancel any pending debounce and serialize now if dirty.
    pub async fn flush(&self) {
        self.cancel_pending();
        self.write_if_dirty().await;
    }

    /// One pass of the backup policy: rewrite the snapshot
    /// unconditionally whenever at least one live pet exists,
    /// regardless of the dirty flag. Returns whether a write happened.
    pub async fn backup_pass(&self) -> bool {
        let document = self.store.read().await.snapshot();
        if !document.has_live_pets() {
            return false;
        }
        match self.snapshots.write(&document).await {
            Ok(()) => {
                debug!("Backup snapshot written");
                true
            }
            Err(err) => {
                warn!(error = %err, "Backup snapshot write failed");
                false
            }
        }
    }

    fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }

    /// Serialize the store if the dirty flag is set, clearing it.
    ///
    /// A failed write is not retried here; the flag stays cleared and
    /// the next debounce, flush, or backup trigger picks the state up
    /// again.
    async fn write_if_dirty(&self) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        let document = self.store.read().await.snapshot();
        if let Err(err) = self.snapshots.write(&document).await {
            warn!(error = %err, "Snapshot write failed");
        }
    }
}

impl core::fmt::Debug for PersistenceController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistenceController")
            .field("snapshot_path", &self.snapshots.path())
            .field("debounce", &self.debounce)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

/// Run the unconditional backup loop forever.
///
/// Fires every `period` and rewrites the snapshot whenever at least one
/// live pet exists — a resilience net against a stuck or cancelled
/// debounce.
pub async fn run_backup_loop(controller: Arc<PersistenceController>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick completes immediately; skip it so the
    // first backup lands one full period after startup.
    interval.tick().await;
    loop {
        interval.tick().await;
        let _ = controller.backup_pass().await;
    }
}
