//! TOML configuration for the relay process.
//!
//! ```toml
//! [source]
//! kind = "storyblok"
//! token = "public-token"
//! site_url = "https://playspectre.com"
//! starts_with = "news/"
//!
//! [poll]
//! interval_secs = 300
//!
//! [store]
//! channels_path = "channels.json"
//!
//! [interactions]
//! bind = "0.0.0.0:8080"
//! public_key = "hex public key from the developer portal"
//!
//! [log]
//! level = "info"
//! file = "newsrelay.log"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use newsrelay_core::DEFAULT_POLL_INTERVAL;
use newsrelay_notifier_discord::DEFAULT_API_BASE;
use newsrelay_source_storyblok::DEFAULT_API_URL;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub poll: PollSection,
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub log: LogSection,
    /// Slash command endpoint; commands are console-only when unset.
    #[serde(default)]
    pub interactions: Option<InteractionsSection>,
}

/// Which adapter produces the news items.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum SourceConfig {
    Storyblok {
        token: String,
        site_url: String,
        #[serde(default = "default_storyblok_api")]
        api_url: String,
        #[serde(default)]
        starts_with: Option<String>,
        #[serde(default = "default_per_page")]
        per_page: u32,
    },
    Rss {
        url: String,
        #[serde(default = "default_rss_label")]
        label: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct PollSection {
    pub interval_secs: u64,
    /// Upper bound for every source and Discord request.
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct DiscordSection {
    /// Environment variable holding the bot token.
    pub token_env: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StoreSection {
    /// Where registered channels are kept; in-memory only when unset.
    pub channels_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InteractionsSection {
    pub bind: SocketAddr,
    /// Application public key, hex encoded.
    pub public_key: String,
    #[serde(default = "default_register_commands")]
    pub register_commands: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LogSection {
    pub level: LogLevel,
    /// Log file; the console defaults to `newsrelay.log`, headless to stderr.
    pub file: Option<PathBuf>,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            http_timeout_secs: 20,
        }
    }
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token_env: "DISCORD_TOKEN".to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }
}

impl PollSection {
    pub(crate) fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub(crate) fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Read the bot token from the configured environment variable.
    pub(crate) fn discord_token(&self) -> Result<String> {
        let token = std::env::var(&self.discord.token_env)
            .with_context(|| format!("environment variable {} is not set", self.discord.token_env))?;
        if token.trim().is_empty() {
            bail!("environment variable {} is empty", self.discord.token_env);
        }
        Ok(token.trim().to_owned())
    }

    fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 {
            bail!("poll.interval_secs must be greater than zero");
        }
        if self.poll.http_timeout_secs == 0 {
            bail!("poll.http_timeout_secs must be greater than zero");
        }
        match &self.source {
            SourceConfig::Storyblok {
                token, site_url, ..
            } => {
                if token.trim().is_empty() {
                    bail!("source.token must not be empty");
                }
                if site_url.trim().is_empty() {
                    bail!("source.site_url must not be empty");
                }
            }
            SourceConfig::Rss { url, .. } => {
                if url.trim().is_empty() {
                    bail!("source.url must not be empty");
                }
            }
        }
        if let Some(interactions) = &self.interactions
            && interactions.public_key.trim().is_empty()
        {
            bail!("interactions.public_key must not be empty");
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }
}

fn default_storyblok_api() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_per_page() -> u32 {
    25
}

fn default_rss_label() -> String {
    "rss".to_owned()
}

fn default_register_commands() -> bool {
    true
}
