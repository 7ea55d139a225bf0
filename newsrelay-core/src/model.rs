//! Domain data structures for news items, tenants, and destinations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Stable identifier of a news item. Adapters use the canonical article link.
pub struct ItemId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of a tenant (a chat server or guild).
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of a delivery target (a channel).
pub struct DestinationId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        ItemId(raw.to_owned())
    }
}

impl From<&str> for TenantId {
    fn from(raw: &str) -> Self {
        TenantId(raw.to_owned())
    }
}

impl From<&str> for DestinationId {
    fn from(raw: &str) -> Self {
        DestinationId(raw.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single news entry observed at the source.
pub struct Item {
    /// Identity of the item, the canonical link.
    pub id: ItemId,
    /// Headline shown in notifications.
    pub title: String,
    /// Publication timestamp when the source provides one.
    pub published: Option<DateTime<Utc>>,
}

impl Item {
    /// Construct an undated item.
    #[must_use]
    pub fn new<I: Into<String>, T: Into<String>>(id: I, title: T) -> Self {
        Self {
            id: ItemId(id.into()),
            title: title.into(),
            published: None,
        }
    }

    /// Attach a publication timestamp.
    #[must_use]
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Link to the full article.
    #[must_use]
    pub fn link(&self) -> &str {
        &self.id.0
    }

    /// Notification text sent to every destination.
    #[must_use]
    pub fn announcement(&self) -> String {
        format!("New article posted: **{}** - {}", self.title, self.link())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Phases of the poll/dispatch loop.
pub enum LoopState {
    /// Waiting for the next tick or for shutdown.
    Idle,
    /// Fetching from the source and filtering.
    Polling,
    /// Fanning new items out to destinations.
    Dispatching,
    /// Shut down; no further cycles run.
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoopState::Idle => "idle",
            LoopState::Polling => "polling",
            LoopState::Dispatching => "dispatching",
            LoopState::Stopped => "stopped",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// How a single cycle ended.
pub enum CycleOutcome {
    /// The source could not be fetched; nothing was marked seen.
    FetchFailed(String),
    /// The fetch succeeded but every item had been seen before.
    NothingNew,
    /// New items were fanned out to the destination snapshot.
    Dispatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Summary of one fetch, filter, and fan-out cycle.
pub struct CycleReport {
    /// Number of items the source returned.
    pub fetched: usize,
    /// Items classified as new, in source order.
    pub new_items: Vec<Item>,
    /// Size of the destination snapshot used for fan-out.
    pub destinations: usize,
    /// Successful notifier calls.
    pub delivered: usize,
    /// Failed notifier calls.
    pub failed: usize,
    /// Terminal outcome of the cycle.
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub(crate) fn fetch_failed(reason: String) -> Self {
        Self {
            fetched: 0,
            new_items: Vec::new(),
            destinations: 0,
            delivered: 0,
            failed: 0,
            outcome: CycleOutcome::FetchFailed(reason),
        }
    }

    pub(crate) fn nothing_new(fetched: usize) -> Self {
        Self {
            fetched,
            new_items: Vec::new(),
            destinations: 0,
            delivered: 0,
            failed: 0,
            outcome: CycleOutcome::NothingNew,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_contains_title_and_link() {
        let item = Item::new("https://example.com/news/patch-1", "Patch 1");
        assert_eq!(
            item.announcement(),
            "New article posted: **Patch 1** - https://example.com/news/patch-1"
        );
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let tenant = TenantId::from("42");
        let json = serde_json::to_string(&tenant).expect("serialize tenant");
        assert_eq!(json, "\"42\"");
    }
}
