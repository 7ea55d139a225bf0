//! Source adapter for RSS 2.0 feeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use newsrelay_core::{
    model::Item,
    ports::{PortError, SourcePort},
};

const UNTITLED: &str = "(untitled)";

/// An RSS feed polled over HTTP.
pub struct RssSource {
    client: Client,
    url: String,
    label: String,
}

impl RssSource {
    /// Create a new RSS source.
    ///
    /// * `url` — full URL of the feed.
    /// * `label` — short name used in logs.
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            label: label.into(),
        }
    }

    /// Convert an already-fetched channel into items, oldest first.
    ///
    /// The link is the item's identity, falling back to the guid. Entries with
    /// neither cannot be tracked and are skipped.
    #[must_use]
    pub fn parse_channel(channel: &rss::Channel) -> Vec<Item> {
        let mut items: Vec<Item> = channel
            .items()
            .iter()
            .filter_map(|entry| {
                let id = entry
                    .link()
                    .or_else(|| entry.guid().map(rss::Guid::value))
                    .map(str::trim)
                    .filter(|id| !id.is_empty())?;

                let title = entry
                    .title()
                    .map(str::trim)
                    .filter(|title| !title.is_empty())
                    .unwrap_or(UNTITLED);

                let published = entry
                    .pub_date()
                    .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
                    .map(|stamp| stamp.with_timezone(&Utc));

                Some(Item {
                    id: id.into(),
                    title: title.to_owned(),
                    published,
                })
            })
            .collect();

        // Feeds list newest first.
        items.reverse();
        items
    }
}

#[async_trait]
impl SourcePort for RssSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<Item>, PortError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let channel = rss::Channel::read_from(body.as_ref())
            .map_err(|err| PortError::Parse(err.to_string()))?;
        debug!(feed = %self.label, entries = channel.items().len(), "feed parsed");
        Ok(Self::parse_channel(&channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(xml: &str) -> rss::Channel {
        rss::Channel::read_from(xml.as_bytes()).expect("fixture parses")
    }

    #[test]
    fn emits_oldest_first_with_link_identity() {
        let feed = channel(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>News</title>
    <item>
      <title>Second Post</title>
      <link>https://example.com/2</link>
      <guid>guid-2</guid>
      <pubDate>Tue, 02 Jan 2024 12:00:00 +0000</pubDate>
    </item>
    <item>
      <title>First Post</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#,
        );

        let items = RssSource::parse_channel(&feed);
        let links: Vec<&str> = items.iter().map(Item::link).collect();
        assert_eq!(links, vec!["https://example.com/1", "https://example.com/2"]);
        assert!(items.iter().all(|item| item.published.is_some()));
    }

    #[test]
    fn falls_back_to_guid_and_skips_anonymous_entries() {
        let feed = channel(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>News</title>
    <item><title>Only guid</title><guid>tag:example.com,2024:7</guid></item>
    <item><title>Nothing to track</title></item>
  </channel>
</rss>"#,
        );

        let items = RssSource::parse_channel(&feed);
        assert_eq!(items, vec![Item::new("tag:example.com,2024:7", "Only guid")]);
    }

    #[test]
    fn missing_title_and_bad_date_degrade_gracefully() {
        let feed = channel(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>News</title>
    <item><link>https://example.com/x</link><pubDate>not-a-date</pubDate></item>
  </channel>
</rss>"#,
        );

        let items = RssSource::parse_channel(&feed);
        assert_eq!(items, vec![Item::new("https://example.com/x", "(untitled)")]);
    }

    #[test]
    fn name_returns_label() {
        let source = RssSource::new(Client::new(), "https://example.com/feed", "Example");
        assert_eq!(source.name(), "Example");
    }
}
