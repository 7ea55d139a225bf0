//! Delivery of answers to deferred interactions.

use std::sync::Arc;

use async_trait::async_trait;
use newsrelay_core::PortError;
use newsrelay_notifier_discord::DiscordNotifier;

/// Edits the placeholder left by a deferred interaction response.
#[async_trait]
pub trait FollowupPort: Send + Sync {
    /// Replace the original response of the interaction identified by `token`.
    async fn edit_original(&self, token: &str, text: &str) -> Result<(), PortError>;
}

/// [`FollowupPort`] over the Discord webhook routes.
pub struct DiscordFollowup {
    notifier: Arc<DiscordNotifier>,
    application_id: String,
}

impl DiscordFollowup {
    #[must_use]
    pub fn new(notifier: Arc<DiscordNotifier>, application_id: impl Into<String>) -> Self {
        Self {
            notifier,
            application_id: application_id.into(),
        }
    }
}

#[async_trait]
impl FollowupPort for DiscordFollowup {
    async fn edit_original(&self, token: &str, text: &str) -> Result<(), PortError> {
        self.notifier
            .edit_original_response(&self.application_id, token, text)
            .await
    }
}
