// ── Snapshot store ──
//
// Holds the latest Snapshot behind an `ArcSwapOption` for wait-free
// reads, plus `watch` channels that push snapshots and availability
// changes to subscribers. Replacing the snapshot and notifying
// subscribers are separate steps so the coordinator can reconcile
// pending commands in between.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;

use crate::model::Snapshot;
use crate::stream::SnapshotStream;

/// Whether polled data can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Availability {
    /// No poll has completed yet.
    Unknown,
    Available,
    /// Too many consecutive polls failed; the last snapshot is stale.
    Degraded,
}

pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    published: watch::Sender<Option<Arc<Snapshot>>>,
    availability: watch::Sender<Availability>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (published, _) = watch::channel(None);
        let (availability, _) = watch::channel(Availability::Unknown);
        Self {
            current: ArcSwapOption::empty(),
            published,
            availability,
        }
    }

    /// The latest snapshot, if any poll has succeeded.
    pub fn load(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn availability(&self) -> Availability {
        *self.availability.borrow()
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.published.subscribe())
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    // ── Writer side (coordinator only) ───────────────────────────────

    /// Replace the current snapshot without notifying subscribers.
    pub(crate) fn swap(&self, snapshot: Arc<Snapshot>) {
        self.current.store(Some(snapshot));
    }

    /// Push `snapshot` to subscribers.
    pub(crate) fn publish(&self, snapshot: &Arc<Snapshot>) {
        // `send_replace` updates even with zero receivers.
        self.published.send_replace(Some(Arc::clone(snapshot)));
    }

    /// Returns `true` if the value changed.
    pub(crate) fn set_availability(&self, availability: Availability) -> bool {
        self.availability.send_if_modified(|current| {
            if *current == availability {
                false
            } else {
                *current = availability;
                true
            }
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::new(Utc::now(), [], [], []))
    }

    #[test]
    fn swap_does_not_notify_until_publish() {
        let store = SnapshotStore::new();
        let stream = store.subscribe();

        let snap = empty_snapshot();
        store.swap(Arc::clone(&snap));
        assert!(store.load().is_some());
        assert!(stream.latest().is_none());

        store.publish(&snap);
        assert!(Arc::ptr_eq(&stream.latest().unwrap(), &snap));
    }

    #[test]
    fn availability_changes_only_once() {
        let store = SnapshotStore::new();
        assert_eq!(store.availability(), Availability::Unknown);
        assert!(store.set_availability(Availability::Degraded));
        assert!(!store.set_availability(Availability::Degraded));
        assert!(store.set_availability(Availability::Available));
    }
}
