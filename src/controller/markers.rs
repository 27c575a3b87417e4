//! Short-lived "Copied!" / "Added!" markers on table rows.
//!
//! Each record id holds at most one marker. Attaching a marker to an id
//! aborts the pending expiry of whatever marker it replaces, and every
//! expiry task checks a generation number before clearing, so a stale
//! timer can never remove a newer marker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default lifetime of a marker.
pub const DEFAULT_MARKER_TTL: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Copied,
    Added,
}

impl MarkerKind {
    /// Text shown in place of the row actions.
    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::Copied => "Copied!",
            MarkerKind::Added => "Added!",
        }
    }
}

#[derive(Debug)]
struct Slot {
    kind: MarkerKind,
    generation: u64,
    expiry: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    next_generation: AtomicU64,
    ttl: Duration,
    revision: Arc<watch::Sender<u64>>,
}

impl Inner {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    fn expire(&self, id: &str, generation: u64) {
        let removed = {
            let mut slots = self.slots();
            match slots.get(id) {
                Some(slot) if slot.generation == generation => slots.remove(id).is_some(),
                _ => false,
            }
        };
        if removed {
            tracing::trace!(id, "marker expired");
            self.bump();
        }
    }
}

/// Per-record transient markers with cancellable expiry.
#[derive(Debug, Clone)]
pub struct TransientMarkers {
    inner: Arc<Inner>,
}

impl TransientMarkers {
    /// `revision` is bumped whenever a marker appears or disappears.
    pub fn new(ttl: Duration, revision: Arc<watch::Sender<u64>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                ttl,
                revision,
            }),
        }
    }

    /// Attach `kind` to `id`, replacing any marker already there.
    ///
    /// Expiry is scheduled on the current Tokio runtime; without one the
    /// marker stays until replaced or cleared.
    pub fn attach(&self, id: &str, kind: MarkerKind) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = {
            let mut slots = self.inner.slots();
            // Spawned under the lock so the expiry cannot run before the slot exists.
            let expiry = match Handle::try_current() {
                Ok(handle) => {
                    let inner = Arc::clone(&self.inner);
                    let key = id.to_string();
                    let ttl = self.inner.ttl;
                    Some(handle.spawn(async move {
                        tokio::time::sleep(ttl).await;
                        inner.expire(&key, generation);
                    }))
                }
                Err(_) => {
                    tracing::warn!(id, "no runtime available, marker will not expire");
                    None
                }
            };
            slots.insert(
                id.to_string(),
                Slot {
                    kind,
                    generation,
                    expiry,
                },
            )
        };

        if let Some(expiry) = previous.and_then(|slot| slot.expiry) {
            expiry.abort();
        }
        self.inner.bump();
    }

    /// The live marker on `id`, if any.
    pub fn get(&self, id: &str) -> Option<MarkerKind> {
        self.inner.slots().get(id).map(|slot| slot.kind)
    }

    /// Every live marker.
    pub fn snapshot(&self) -> HashMap<String, MarkerKind> {
        self.inner
            .slots()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.kind))
            .collect()
    }

    /// Drop every marker and cancel their timers.
    pub fn clear(&self) {
        let drained: Vec<Slot> = self.inner.slots().drain().map(|(_, slot)| slot).collect();
        if drained.is_empty() {
            return;
        }
        for expiry in drained.into_iter().filter_map(|slot| slot.expiry) {
            expiry.abort();
        }
        self.inner.bump();
    }
}
