//! Registry mapping each tenant to the destination its news goes to.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use crate::model::{DestinationId, TenantId};

/// Concurrent tenant to destination map with last-write-wins semantics.
///
/// Writers replace whole entries under the write lock, so readers always see
/// either the previous or the new destination for a tenant.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    entries: RwLock<HashMap<TenantId, DestinationId>>,
}

impl DestinationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with `entries`, later duplicates winning.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TenantId, DestinationId)>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Point `tenant` at `destination`, returning the destination it replaced.
    pub async fn register(
        &self,
        tenant: TenantId,
        destination: DestinationId,
    ) -> Option<DestinationId> {
        self.entries.write().await.insert(tenant, destination)
    }

    /// Snapshot of every distinct registered destination, sorted.
    pub async fn destinations(&self) -> Vec<DestinationId> {
        let entries = self.entries.read().await;
        entries
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Snapshot of all tenant to destination pairs, sorted by tenant.
    pub async fn entries(&self) -> Vec<(TenantId, DestinationId)> {
        let mut pairs: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(tenant, destination)| (tenant.clone(), destination.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Destination currently registered for `tenant`.
    pub async fn destination_for(&self, tenant: &TenantId) -> Option<DestinationId> {
        self.entries.read().await.get(tenant).cloned()
    }

    /// Number of registered tenants.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no tenant has registered yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
