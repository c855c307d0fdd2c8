//! CRM store: last-fetched snapshot per collection, swapped wholesale on each load.

#![forbid(unsafe_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use crm_core::{Collection, Snapshot};
use tracing::debug;

/// Holds the current snapshot of one collection.
///
/// Readers get an `Arc` to an immutable snapshot; a replacement never touches a
/// snapshot a reader already holds. There is no merge: each successful fetch
/// replaces everything, and the last replacement applied wins. Replacing takes
/// `&mut self`, so epochs are assigned in the order replacements are applied.
pub struct CollectionStore<T> {
    collection: Collection,
    snap: ArcSwap<Snapshot<T>>,
}

impl<T> CollectionStore<T> {
    pub fn new(collection: Collection) -> Self {
        Self { collection, snap: ArcSwap::from_pointee(Snapshot::default()) }
    }

    pub fn collection(&self) -> Collection { self.collection }

    pub fn current(&self) -> Arc<Snapshot<T>> { self.snap.load_full() }

    pub fn epoch(&self) -> u64 { self.snap.load().epoch }

    /// Replace the snapshot with freshly fetched items and return the new epoch.
    pub fn replace(&mut self, items: Vec<T>) -> u64 {
        let epoch = self.epoch().saturating_add(1);
        let len = items.len();
        self.snap.store(Arc::new(Snapshot { epoch, items }));
        metrics::gauge!("crm_snapshot_items", len as f64, "collection" => self.collection.as_str());
        debug!(collection = %self.collection, epoch, items = len, "snapshot replaced");
        epoch
    }
}
