//! Source adapter for a news site published through the Storyblok CDN API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use newsrelay_core::{
    model::Item,
    ports::{PortError, SourcePort},
};

/// Public stories endpoint of the Storyblok CDN.
pub const DEFAULT_API_URL: &str = "https://api.storyblok.com/v2/cdn/stories";

const UNTITLED: &str = "No Title";

/// Response from /v2/cdn/stories
#[derive(Debug, Deserialize)]
struct StoriesResponse {
    stories: Vec<Story>,
}

/// Single story; many other fields exist, we ignore them
#[derive(Debug, Deserialize)]
struct Story {
    #[serde(default)]
    name: Option<String>,
    full_slug: String,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Clone)]
/// Where and how to query the stories endpoint.
pub struct StoryblokConfig {
    /// Stories endpoint, normally [`DEFAULT_API_URL`].
    pub api_url: String,
    /// Public (preview or published) access token.
    pub token: String,
    /// Public site the slugs are relative to, e.g. `https://example.com`.
    pub site_url: String,
    /// Optional slug prefix such as `news/`.
    pub starts_with: Option<String>,
    /// Page size requested from the API.
    pub per_page: u32,
}

impl StoryblokConfig {
    /// Config for the default endpoint.
    #[must_use]
    pub fn new<T: Into<String>, S: Into<String>>(token: T, site_url: S) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token: token.into(),
            site_url: site_url.into(),
            starts_with: None,
            per_page: 25,
        }
    }
}

/// Lists the published stories of a Storyblok space as news items.
pub struct StoryblokSource {
    client: Client,
    config: StoryblokConfig,
    label: String,
}

impl StoryblokSource {
    /// Create a source bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, config: StoryblokConfig) -> Self {
        let label = format!("storyblok:{}", config.site_url);
        Self {
            client,
            config,
            label,
        }
    }

    fn request(&self) -> RequestBuilder {
        let per_page = self.config.per_page.to_string();
        let mut req = self.client.get(&self.config.api_url).query(&[
            ("token", self.config.token.as_str()),
            ("version", "published"),
            // Newest first, so a fresh story is always on the one page we read.
            ("sort_by", "first_published_at:desc"),
            ("per_page", per_page.as_str()),
        ]);

        if let Some(prefix) = &self.config.starts_with {
            req = req.query(&[("starts_with", prefix.as_str())]);
        }

        req
    }
}

#[async_trait]
impl SourcePort for StoryblokSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<Item>, PortError> {
        let body = fetch_text(self.request()).await?;
        let items = parse_stories(&body, &self.config.site_url)?;
        debug!(stories = items.len(), "storyblok stories received");
        Ok(items)
    }
}

/// Parse a raw stories document into items, oldest first.
///
/// # Errors
///
/// Returns [`PortError::Parse`] when the body is not a stories document.
pub fn parse_stories(body: &str, site_url: &str) -> Result<Vec<Item>, PortError> {
    let response: StoriesResponse =
        serde_json::from_str(body).map_err(|err| PortError::Parse(err.to_string()))?;
    Ok(stories_to_items(response.stories, site_url))
}

fn stories_to_items(stories: Vec<Story>, site_url: &str) -> Vec<Item> {
    let base = site_url.trim_end_matches('/');

    let mut items: Vec<Item> = stories
        .into_iter()
        .map(|story| {
            let title = story
                .name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNTITLED.to_owned());

            let published = story
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|stamp| stamp.with_timezone(&Utc));

            let link = format!("{base}/{}", story.full_slug.trim_start_matches('/'));
            Item {
                id: link.as_str().into(),
                title,
                published,
            }
        })
        .collect();

    // Announce in publication order; undated stories keep their place at the end.
    items.sort_by_key(|item| (item.published.is_none(), item.published));
    items
}

// Body decoding is left to `parse_stories` so bad documents are parse errors.
async fn fetch_text(req: RequestBuilder) -> Result<String, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .text()
        .await
        .map_err(PortError::from)
}
