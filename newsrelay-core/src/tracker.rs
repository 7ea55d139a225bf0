//! Seen-set bookkeeping.
//!
//! [`SeenTracker`] is the single mutable handle and is owned by the poll loop.
//! [`SeenView`] shares the same set read-only, so the on-demand path can ask
//! "what would be new" without consuming anything.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::{Item, ItemId};

/// Owner of the set of already announced item identifiers.
#[derive(Debug, Default)]
pub struct SeenTracker {
    seen: Arc<RwLock<HashSet<ItemId>>>,
}

/// Read-only handle on a [`SeenTracker`]'s set.
#[derive(Debug, Clone)]
pub struct SeenView {
    seen: Arc<RwLock<HashSet<ItemId>>>,
}

impl SeenTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view sharing this tracker's set.
    #[must_use]
    pub fn view(&self) -> SeenView {
        SeenView {
            seen: Arc::clone(&self.seen),
        }
    }

    /// Return the items whose identifier has not been seen, in input order,
    /// and record each returned identifier.
    ///
    /// Only the first occurrence of an identifier within `items` can be new.
    pub async fn filter_new(&mut self, items: Vec<Item>) -> Vec<Item> {
        if items.is_empty() {
            return items;
        }

        let mut seen = self.seen.write().await;
        items
            .into_iter()
            .filter(|item| seen.insert(item.id.clone()))
            .collect()
    }

    /// Number of identifiers recorded so far.
    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    /// Whether nothing has been recorded yet.
    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }
}

impl SeenView {
    /// Classify `items` like [`SeenTracker::filter_new`] without recording anything.
    pub async fn unseen(&self, items: Vec<Item>) -> Vec<Item> {
        let seen = self.seen.read().await;
        let mut batch = HashSet::new();
        items
            .into_iter()
            .filter(|item| !seen.contains(&item.id) && batch.insert(item.id.clone()))
            .collect()
    }

    /// Whether `id` has already been announced.
    pub async fn contains(&self, id: &ItemId) -> bool {
        self.seen.read().await.contains(id)
    }

    /// Sorted copy of the recorded identifiers.
    pub async fn snapshot(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.seen.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }
}
