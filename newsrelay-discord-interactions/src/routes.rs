//! Interaction and webhook event routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use newsrelay_core::{Command, RelayService};
use tracing::{debug, info, warn};

use crate::error::InteractionError;
use crate::followup::FollowupPort;
use crate::payload::{Interaction, InteractionResponse, Interpretation, WebhookEvent};
use crate::signature::SignatureVerifier;

/// Shared state of the interaction routes.
#[derive(Clone)]
pub struct InteractionState {
    service: Arc<RelayService>,
    verifier: Arc<SignatureVerifier>,
    followup: Arc<dyn FollowupPort>,
}

impl InteractionState {
    /// Bundle the service, the signature check and the follow-up channel.
    #[must_use]
    pub fn new(
        service: Arc<RelayService>,
        verifier: SignatureVerifier,
        followup: Arc<dyn FollowupPort>,
    ) -> Self {
        Self {
            service,
            verifier: Arc::new(verifier),
            followup,
        }
    }
}

/// Build the router: `POST /interactions` and `POST /events`.
pub fn build_router(state: InteractionState) -> Router {
    Router::new()
        .route("/interactions", post(interactions))
        .route("/events", post(events))
        .with_state(state)
}

async fn interactions(
    State(state): State<InteractionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, InteractionError> {
    state.verifier.verify(&headers, &body)?;
    let interaction: Interaction = serde_json::from_slice(&body)?;

    let response = match interaction.interpret() {
        Interpretation::Pong => {
            debug!("interaction endpoint ping");
            InteractionResponse::pong()
        }
        Interpretation::Reply(text) => InteractionResponse::message(text),
        Interpretation::Run(command @ Command::RegisterDestination { .. }) => {
            let reply = state.service.execute(command).await;
            InteractionResponse::message(&reply.to_string())
        }
        // The source may be slower than Discord's three second answer window.
        Interpretation::Run(command) => {
            tokio::spawn(answer_later(state, interaction.token, command));
            InteractionResponse::deferred()
        }
    };
    Ok(Json(response))
}

async fn answer_later(state: InteractionState, token: String, command: Command) {
    let reply = state.service.execute(command).await;
    if let Err(err) = state.followup.edit_original(&token, &reply.to_string()).await {
        warn!(error = %err, "could not deliver command reply");
    }
}

async fn events(
    State(state): State<InteractionState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, InteractionError> {
    state.verifier.verify(&headers, &body)?;
    let event: WebhookEvent = serde_json::from_slice(&body)?;

    match event.joined_guild() {
        Some(guild) => state.service.tenant_joined(&guild.tenant(), &guild.name),
        None => info!(kind = event.kind, "webhook event ignored"),
    }
    Ok(StatusCode::NO_CONTENT)
}
