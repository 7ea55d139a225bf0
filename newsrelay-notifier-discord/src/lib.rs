//! Notifier implementation for Discord using the bot REST API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use newsrelay_core::{
    FETCH_COMMAND, REGISTER_COMMAND,
    model::{DestinationId, TenantId},
    ports::{NotifierPort, PortError},
};

/// Versioned REST base of the Discord API.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

/// Name of the channel option of the register command.
pub const CHANNEL_OPTION: &str = "channel";

/// Channel type of a plain guild text channel.
pub const GUILD_TEXT_CHANNEL: u8 = 0;

const CHAT_INPUT_COMMAND: u8 = 1;
const CHANNEL_OPTION_TYPE: u8 = 7;

/// Body of POST /channels/{id}/messages and PATCH .../messages/@original
#[derive(Debug, Serialize)]
struct MessageContent<'a> {
    content: &'a str,
}

/// One global application command, as sent to PUT /applications/{id}/commands
#[derive(Debug, Clone, Serialize)]
pub struct CommandDefinition {
    name: &'static str,
    #[serde(rename = "type")]
    kind: u8,
    description: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<OptionDefinition>,
}

#[derive(Debug, Clone, Serialize)]
struct OptionDefinition {
    #[serde(rename = "type")]
    kind: u8,
    name: &'static str,
    description: &'static str,
    required: bool,
    channel_types: Vec<u8>,
}

/// The application the bot token belongs to, from GET /applications/@me
#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    /// Snowflake id used in command and interaction routes.
    pub id: String,
    /// Application name.
    pub name: String,
}

/// The bot account, from GET /users/@me
#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    /// Snowflake id of the bot user.
    pub id: String,
    /// Account name.
    pub username: String,
}

/// Partial guild, from GET /users/@me/guilds
#[derive(Debug, Clone, Deserialize)]
pub struct GuildSummary {
    /// Snowflake id of the guild.
    pub id: String,
    /// Guild display name.
    pub name: String,
}

impl GuildSummary {
    /// The guild as a tenant identifier.
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        TenantId(self.id.clone())
    }
}

/// Sends messages to Discord channels as a bot.
pub struct DiscordNotifier {
    client: Client,
    token: String,
    api_base: String,
}

impl DiscordNotifier {
    /// Create a notifier for the default API base.
    #[must_use]
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self::with_api_base(client, token, DEFAULT_API_BASE)
    }

    /// Create a notifier talking to a custom API base.
    #[must_use]
    pub fn with_api_base(
        client: Client,
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_owned(),
        }
    }

    /// The account the token belongs to. Confirms the session before polling starts.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the token is rejected or Discord is unreachable.
    pub async fn current_user(&self) -> Result<BotUser, PortError> {
        fetch_json(self.authorized(self.client.get(self.url("/users/@me")))).await
    }

    /// Guilds the bot is currently a member of.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    pub async fn guilds(&self) -> Result<Vec<GuildSummary>, PortError> {
        fetch_json(self.authorized(self.client.get(self.url("/users/@me/guilds")))).await
    }

    /// The application owning the bot, needed for command routes.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails.
    pub async fn application(&self) -> Result<Application, PortError> {
        fetch_json(self.authorized(self.client.get(self.url("/applications/@me")))).await
    }

    /// Overwrite the global slash commands with [`command_definitions`].
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when Discord rejects the definitions.
    pub async fn register_commands(&self, application_id: &str) -> Result<(), PortError> {
        let response = self.commands_request(application_id).send().await?;
        check_status(response).await?;
        debug!(application = application_id, "slash commands registered");
        Ok(())
    }

    /// Replace the placeholder of a deferred interaction response.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the interaction token expired or the edit is rejected.
    pub async fn edit_original_response(
        &self,
        application_id: &str,
        interaction_token: &str,
        text: &str,
    ) -> Result<(), PortError> {
        let response = self
            .edit_original_request(application_id, interaction_token, text)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn commands_request(&self, application_id: &str) -> RequestBuilder {
        self.authorized(
            self.client
                .put(self.url(&format!("/applications/{application_id}/commands"))),
        )
        .json(&command_definitions())
    }

    // Webhook routes are authorised by the interaction token in the path.
    fn edit_original_request(
        &self,
        application_id: &str,
        interaction_token: &str,
        text: &str,
    ) -> RequestBuilder {
        self.client
            .patch(self.url(&format!(
                "/webhooks/{application_id}/{interaction_token}/messages/@original"
            )))
            .json(&MessageContent {
                content: clamp_content(text),
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Bot {}", self.token))
    }

    fn message_request(&self, destination: &DestinationId, text: &str) -> RequestBuilder {
        self.authorized(
            self.client
                .post(self.url(&format!("/channels/{destination}/messages"))),
        )
        .json(&MessageContent {
            content: clamp_content(text),
        })
    }
}

#[async_trait]
impl NotifierPort for DiscordNotifier {
    async fn send(&self, destination: &DestinationId, text: &str) -> Result<(), PortError> {
        let response = self.message_request(destination, text).send().await?;
        check_status(response).await?;
        debug!(destination = %destination, "message posted");
        Ok(())
    }
}

/// The two global commands: register a news channel, and check for news now.
#[must_use]
pub fn command_definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition {
            name: REGISTER_COMMAND,
            kind: CHAT_INPUT_COMMAND,
            description: "Set the channel where news will be posted.",
            options: vec![OptionDefinition {
                kind: CHANNEL_OPTION_TYPE,
                name: CHANNEL_OPTION,
                description: "Select a text channel",
                required: true,
                channel_types: vec![GUILD_TEXT_CHANNEL],
            }],
        },
        CommandDefinition {
            name: FETCH_COMMAND,
            kind: CHAT_INPUT_COMMAND,
            description: "Fetch the latest news articles.",
            options: Vec::new(),
        },
    ]
}

/// Cut `text` to the longest content Discord accepts in one message.
#[must_use]
pub fn clamp_content(text: &str) -> &str {
    truncate(text, MAX_CONTENT_CHARS)
}

/// Cut `text` to at most `limit` characters on a char boundary.
fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text.get(..end).unwrap_or(text),
        None => text,
    }
}

async fn check_status(response: Response) -> Result<Response, PortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .ok()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
    Err(PortError::Rejected {
        status: status.as_u16(),
        message,
    })
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let response = req.send().await.map_err(PortError::from)?;
    check_status(response)
        .await?
        .json()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> DiscordNotifier {
        DiscordNotifier::with_api_base(Client::new(), "token-123", "https://discord.test/api/")
    }

    #[test]
    fn message_request_targets_channel_with_bot_auth() {
        let request = notifier()
            .message_request(&DestinationId::from("42"), "hello")
            .build()
            .expect("request builds");

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://discord.test/api/channels/42/messages"
        );
        assert_eq!(
            request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok()),
            Some("Bot token-123")
        );

        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("json body");
        let json: serde_json::Value = serde_json::from_slice(body).expect("valid json");
        assert_eq!(json, serde_json::json!({ "content": "hello" }));
    }

    #[test]
    fn commands_request_overwrites_both_global_commands() {
        let request = notifier()
            .commands_request("app-1")
            .build()
            .expect("request builds");

        assert_eq!(request.method(), reqwest::Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://discord.test/api/applications/app-1/commands"
        );

        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("json body");
        let json: serde_json::Value = serde_json::from_slice(body).expect("valid json");
        assert_eq!(json[0]["name"], "setnewschannel");
        assert_eq!(json[0]["options"][0]["name"], "channel");
        assert_eq!(json[0]["options"][0]["type"], 7);
        assert_eq!(json[0]["options"][0]["channel_types"], serde_json::json!([0]));
        assert_eq!(json[1]["name"], "fetchnews");
        assert!(json[1].get("options").is_none());
    }

    #[test]
    fn edit_original_uses_interaction_token_without_bot_auth() {
        let long = "x".repeat(2500);
        let request = notifier()
            .edit_original_request("app-1", "tok", &long)
            .build()
            .expect("request builds");

        assert_eq!(request.method(), reqwest::Method::PATCH);
        assert_eq!(
            request.url().as_str(),
            "https://discord.test/api/webhooks/app-1/tok/messages/@original"
        );
        assert!(request.headers().get(AUTHORIZATION).is_none());

        let body = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .expect("json body");
        let json: serde_json::Value = serde_json::from_slice(body).expect("valid json");
        assert_eq!(json["content"].as_str().map(str::len), Some(2000));
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 2000), "short");
    }

    #[test]
    fn guild_maps_to_tenant() {
        let guild: GuildSummary =
            serde_json::from_str(r#"{"id": "81384788765712384", "name": "Spectre", "icon": null}"#)
                .expect("valid guild");
        assert_eq!(guild.tenant(), TenantId::from("81384788765712384"));
    }
}
