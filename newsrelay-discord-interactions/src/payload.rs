//! Wire types for interactions and webhook events, and their mapping to commands.

use std::collections::HashMap;

use newsrelay_core::{Command, DestinationId, FETCH_COMMAND, REGISTER_COMMAND, TenantId};
use newsrelay_notifier_discord::{CHANNEL_OPTION, GUILD_TEXT_CHANNEL, clamp_content};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

const PONG: u8 = 1;
const CHANNEL_MESSAGE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE: u8 = 5;

const WEBHOOK_EVENT: u8 = 1;
const APPLICATION_AUTHORIZED: &str = "APPLICATION_AUTHORIZED";
const GUILD_INSTALL: u8 = 0;

/// Reply when a command needs a server but came from a DM.
pub const GUILD_ONLY_REPLY: &str = "This command can only be used in a server.";
/// Reply when the channel option is missing or not a text channel.
pub const INVALID_CHANNEL_REPLY: &str = "Please select a valid text channel.";

/// Incoming interaction, reduced to what the two commands read.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    /// Token for follow-up edits, valid for 15 minutes.
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

/// Slash command name with its options.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub resolved: Resolved,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(missing_docs)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Entities referenced by options, keyed by snowflake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub channels: HashMap<String, ResolvedChannel>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(missing_docs)]
pub struct ResolvedChannel {
    #[serde(rename = "type")]
    pub kind: u8,
}

/// What to do with an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Endpoint verification ping.
    Pong,
    /// A command to run through the relay service.
    Run(Command),
    /// Answer directly without touching the service.
    Reply(&'static str),
}

impl Interaction {
    /// Map the interaction to a relay command, using the invoking guild as tenant.
    #[must_use]
    pub fn interpret(&self) -> Interpretation {
        match self.kind {
            PING => Interpretation::Pong,
            APPLICATION_COMMAND => match &self.data {
                Some(data) if data.name == REGISTER_COMMAND => self.register(data),
                Some(data) if data.name == FETCH_COMMAND => Interpretation::Run(Command::FetchNow),
                _ => Interpretation::Reply("Unknown command."),
            },
            _ => Interpretation::Reply("Unsupported interaction."),
        }
    }

    fn register(&self, data: &CommandData) -> Interpretation {
        let Some(guild) = &self.guild_id else {
            return Interpretation::Reply(GUILD_ONLY_REPLY);
        };
        let channel = data
            .options
            .iter()
            .find(|option| option.name == CHANNEL_OPTION)
            .and_then(|option| option.value.as_ref())
            .and_then(Value::as_str);
        let Some(channel) = channel else {
            return Interpretation::Reply(INVALID_CHANNEL_REPLY);
        };
        if let Some(resolved) = data.resolved.channels.get(channel)
            && resolved.kind != GUILD_TEXT_CHANNEL
        {
            return Interpretation::Reply(INVALID_CHANNEL_REPLY);
        }

        Interpretation::Run(Command::RegisterDestination {
            tenant: TenantId::from(guild.as_str()),
            destination: DestinationId::from(channel),
        })
    }
}

/// Body answered to an interaction.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<MessageData>,
}

#[derive(Debug, Clone, Serialize)]
struct MessageData {
    content: String,
}

impl InteractionResponse {
    #[must_use]
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// Visible message in the invoking channel.
    #[must_use]
    pub fn message(text: &str) -> Self {
        Self {
            kind: CHANNEL_MESSAGE,
            data: Some(MessageData {
                content: clamp_content(text).to_owned(),
            }),
        }
    }

    /// "Thinking..." placeholder, edited once the answer is ready.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            kind: DEFERRED_CHANNEL_MESSAGE,
            data: None,
        }
    }
}

/// Webhook event envelope; `event` is absent on the verification ping.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub event: Option<EventBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(missing_docs)]
pub struct EventBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct Authorization {
    #[serde(default)]
    integration_type: Option<u8>,
    #[serde(default)]
    guild: Option<JoinedGuild>,
}

/// Guild the application was just installed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinedGuild {
    pub id: String,
    pub name: String,
}

impl WebhookEvent {
    /// The guild of a server install, if this is one.
    #[must_use]
    pub fn joined_guild(&self) -> Option<JoinedGuild> {
        if self.kind != WEBHOOK_EVENT {
            return None;
        }
        let event = self.event.as_ref()?;
        if event.kind != APPLICATION_AUTHORIZED {
            return None;
        }
        let authorization: Authorization =
            serde_json::from_value(event.data.clone()?).ok()?;
        match authorization.integration_type {
            Some(GUILD_INSTALL) | None => authorization.guild,
            Some(_) => None,
        }
    }
}

impl JoinedGuild {
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        TenantId::from(self.id.as_str())
    }
}
