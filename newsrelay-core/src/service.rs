//! Command-facing facade over the registry, the source, and the seen set.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::commands::{Command, CommandReply};
use crate::model::{DestinationId, Item, TenantId};
use crate::ports::{PortError, SourcePort};
use crate::registry::DestinationRegistry;
use crate::store::DestinationStore;
use crate::tracker::SeenView;

/// Public entry point for registration and on-demand fetches.
///
/// The service only ever reads the seen set: an on-demand fetch reports what
/// the next scheduled cycle would announce, and leaves that cycle to do the
/// actual fan-out.
pub struct RelayService {
    source: Arc<dyn SourcePort>,
    registry: Arc<DestinationRegistry>,
    seen: SeenView,
    store: Option<Arc<dyn DestinationStore>>,
    save_lock: Mutex<()>,
}

impl RelayService {
    /// Create a service without persistence.
    #[must_use]
    pub fn new(
        source: Arc<dyn SourcePort>,
        registry: Arc<DestinationRegistry>,
        seen: SeenView,
    ) -> Self {
        Self {
            source,
            registry,
            seen,
            store: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Persist every registration to `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn DestinationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Point `tenant`'s news at `destination`, returning the replaced destination.
    ///
    /// Registration itself cannot fail. When a store is configured the new
    /// mapping is saved; a failed save is logged and otherwise ignored.
    pub async fn register_destination(
        &self,
        tenant: TenantId,
        destination: DestinationId,
    ) -> Option<DestinationId> {
        let Some(store) = &self.store else {
            return self.record(tenant, destination).await;
        };

        // Serialise register+snapshot+save so an older snapshot never overwrites a newer one.
        let _guard = self.save_lock.lock().await;
        let replaced = self.record(tenant, destination).await;
        let entries = self.registry.entries().await;
        if let Err(err) = store.save(&entries).await {
            warn!(error = %err, "could not persist news channels");
        }
        replaced
    }

    /// Items the next scheduled cycle would treat as new, without marking them seen.
    ///
    /// # Errors
    ///
    /// Returns the source's [`PortError`] when the fetch fails.
    pub async fn fetch_now(&self) -> Result<Vec<Item>, PortError> {
        let items = self.source.fetch().await?;
        let fetched = items.len();
        let unseen = self.seen.unseen(items).await;
        info!(fetched, new = unseen.len(), "on-demand news check");
        Ok(unseen)
    }

    /// Snapshot of every registered tenant and its destination.
    pub async fn destinations(&self) -> Vec<(TenantId, DestinationId)> {
        self.registry.entries().await
    }

    /// Note that the bot became a member of `tenant`. Logging only.
    pub fn tenant_joined(&self, tenant: &TenantId, name: &str) {
        info!(tenant = %tenant, name, "bot has been added to a server");
    }

    /// Execute a parsed command and build the reply for its invoker.
    pub async fn execute(&self, command: Command) -> CommandReply {
        match command {
            Command::RegisterDestination {
                tenant,
                destination,
            } => {
                let replaced = self
                    .register_destination(tenant.clone(), destination.clone())
                    .await;
                CommandReply::Registered {
                    tenant,
                    destination,
                    replaced,
                }
            }
            Command::FetchNow => match self.fetch_now().await {
                Ok(items) if items.is_empty() => CommandReply::NoNewArticles,
                Ok(items) => CommandReply::Articles(items),
                Err(err) => {
                    warn!(error = %err, "on-demand news check failed");
                    CommandReply::SourceUnavailable(err.to_string())
                }
            },
        }
    }

    async fn record(&self, tenant: TenantId, destination: DestinationId) -> Option<DestinationId> {
        info!(tenant = %tenant, destination = %destination, "news channel set");
        self.registry.register(tenant, destination).await
    }
}
