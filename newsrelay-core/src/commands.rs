//! User-facing commands and the replies rendered for them.

use std::fmt;
use std::str::FromStr;

use crate::model::{DestinationId, Item, TenantId};

/// Name of the command that registers a tenant's news channel.
pub const REGISTER_COMMAND: &str = "setnewschannel";
/// Name of the command that reports new articles on demand.
pub const FETCH_COMMAND: &str = "fetchnews";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed user command.
pub enum Command {
    /// Route news for `tenant` to `destination`.
    RegisterDestination {
        /// Tenant issuing the registration.
        tenant: TenantId,
        /// Channel that should receive news.
        destination: DestinationId,
    },
    /// Report what is new right now, without broadcasting.
    FetchNow,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Reasons a command line could not be parsed.
pub enum CommandError {
    /// Nothing was typed.
    #[error("Empty command")]
    Empty,
    /// The command name is not known.
    #[error("Unknown command: /{0}")]
    Unknown(String),
    /// A required argument is missing.
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    /// More arguments than the command accepts.
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
    /// The channel is neither a plain id nor a `<#id>` mention.
    #[error("Please select a valid text channel (got {0:?})")]
    InvalidChannel(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(CommandError::Empty)?;
        let name = name.strip_prefix('/').unwrap_or(name);

        let command = match name {
            REGISTER_COMMAND => {
                let tenant = words.next().ok_or(CommandError::MissingArgument("tenant"))?;
                let channel = words.next().ok_or(CommandError::MissingArgument("channel"))?;
                Command::RegisterDestination {
                    tenant: TenantId::from(tenant),
                    destination: parse_channel(channel)?,
                }
            }
            FETCH_COMMAND => Command::FetchNow,
            other => return Err(CommandError::Unknown(other.to_owned())),
        };

        match words.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_owned())),
            None => Ok(command),
        }
    }
}

/// Accept `123` or `<#123>`.
fn parse_channel(raw: &str) -> Result<DestinationId, CommandError> {
    let id = raw
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(raw);

    if id.is_empty() || id.contains(['<', '>', '#']) {
        return Err(CommandError::InvalidChannel(raw.to_owned()));
    }
    Ok(DestinationId::from(id))
}

/// Render `destination` as a channel mention.
#[must_use]
pub fn channel_mention(destination: &DestinationId) -> String {
    format!("<#{destination}>")
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of a command, shown to the invoking user.
pub enum CommandReply {
    /// The tenant's destination was stored.
    Registered {
        /// Tenant that registered.
        tenant: TenantId,
        /// Destination now in effect.
        destination: DestinationId,
        /// Destination that was replaced, if any.
        replaced: Option<DestinationId>,
    },
    /// Articles not yet announced, in source order.
    Articles(Vec<Item>),
    /// The source was reachable and nothing is new.
    NoNewArticles,
    /// The source could not be fetched.
    SourceUnavailable(String),
}

impl fmt::Display for CommandReply {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandReply::Registered { destination, .. } => write!(
                formatter,
                "News updates will be posted in {}!",
                channel_mention(destination)
            ),
            CommandReply::Articles(items) => {
                write!(formatter, "Latest news articles:")?;
                for item in items {
                    write!(formatter, "\n{}: {}", item.title, item.link())?;
                }
                Ok(())
            }
            CommandReply::NoNewArticles => write!(formatter, "No new articles found."),
            CommandReply::SourceUnavailable(reason) => {
                write!(formatter, "Could not reach the news source: {reason}")
            }
        }
    }
}
