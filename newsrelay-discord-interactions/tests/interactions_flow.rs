//! Integration tests for the interaction routes
//!
//! Signed requests go through the full router into a real `RelayService`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use newsrelay_core::{
    DestinationId, DestinationRegistry, Item, PortError, RelayService, SeenTracker, SourcePort,
    TenantId,
};
use newsrelay_discord_interactions::{
    FollowupPort, InteractionState, SignatureVerifier, build_router,
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

struct FixedSource {
    result: Result<Vec<&'static str>, &'static str>,
}

#[async_trait]
impl SourcePort for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch(&self) -> Result<Vec<Item>, PortError> {
        match &self.result {
            Ok(links) => Ok(links
                .iter()
                .map(|link| Item::new(*link, format!("Title {link}")))
                .collect()),
            Err(reason) => Err(PortError::Internal((*reason).to_owned())),
        }
    }
}

/// Forwards every deferred answer to the test.
struct ChannelFollowup {
    tx: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl FollowupPort for ChannelFollowup {
    async fn edit_original(&self, token: &str, text: &str) -> Result<(), PortError> {
        self.tx
            .send((token.to_owned(), text.to_owned()))
            .map_err(|err| PortError::Internal(err.to_string()))
    }
}

struct TestApp {
    router: Router,
    registry: Arc<DestinationRegistry>,
    key: SigningKey,
    followups: mpsc::UnboundedReceiver<(String, String)>,
}

fn test_app(result: Result<Vec<&'static str>, &'static str>) -> TestApp {
    let key = SigningKey::from_bytes(&[42; 32]);
    let registry = Arc::new(DestinationRegistry::new());
    let service = Arc::new(RelayService::new(
        Arc::new(FixedSource { result }),
        Arc::clone(&registry),
        SeenTracker::new().view(),
    ));
    let (tx, followups) = mpsc::unbounded_channel();
    let state = InteractionState::new(
        service,
        SignatureVerifier::new(key.verifying_key()),
        Arc::new(ChannelFollowup { tx }),
    );

    TestApp {
        router: build_router(state),
        registry,
        key,
        followups,
    }
}

fn signed_request(key: &SigningKey, uri: &str, body: &Value) -> Request<Body> {
    let body = body.to_string();
    let timestamp = "1700000000";
    let signature = key.sign(format!("{timestamp}{body}").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, hex::encode(signature.to_bytes()))
        .header(TIMESTAMP_HEADER, timestamp)
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn register_interaction(guild: &str, channel: &str) -> Value {
    json!({
        "type": 2,
        "token": "register-token",
        "guild_id": guild,
        "data": {
            "name": "setnewschannel",
            "options": [{ "name": "channel", "type": 7, "value": channel }],
            "resolved": { "channels": { channel: { "id": channel, "type": 0 } } }
        }
    })
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let app = test_app(Ok(vec![]));
    let request = signed_request(&app.key, "/interactions", &json!({ "type": 1, "token": "t" }));

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "type": 1 }));
}

#[tokio::test]
async fn unsigned_request_is_unauthorized() {
    let app = test_app(Ok(vec![]));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/interactions")
        .body(Body::from(json!({ "type": 1, "token": "t" }).to_string()))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_signed_by_another_key_is_unauthorized() {
    let app = test_app(Ok(vec![]));
    let stranger = SigningKey::from_bytes(&[1; 32]);
    let request = signed_request(&stranger, "/interactions", &json!({ "type": 1, "token": "t" }));

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_routes_invoking_guild_to_channel() {
    let app = test_app(Ok(vec![]));
    let request = signed_request(
        &app.key,
        "/interactions",
        &register_interaction("111", "222"),
    );

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({ "type": 4, "data": { "content": "News updates will be posted in <#222>!" } })
    );
    assert_eq!(
        app.registry.destination_for(&TenantId::from("111")).await,
        Some(DestinationId::from("222"))
    );
}

#[tokio::test]
async fn register_in_direct_message_is_refused() {
    let app = test_app(Ok(vec![]));
    let mut interaction = register_interaction("111", "222");
    interaction["guild_id"] = Value::Null;
    let request = signed_request(&app.key, "/interactions", &interaction);

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(
        response_json(response).await,
        json!({ "type": 4, "data": { "content": "This command can only be used in a server." } })
    );
    assert!(app.registry.is_empty().await);
}

#[tokio::test]
async fn fetch_is_deferred_then_answered() {
    let mut app = test_app(Ok(vec!["https://news.test/a"]));
    let request = signed_request(
        &app.key,
        "/interactions",
        &json!({ "type": 2, "token": "fetch-token", "data": { "name": "fetchnews" } }),
    );

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response_json(response).await, json!({ "type": 5 }));

    let (token, text) = app.followups.recv().await.unwrap();
    assert_eq!(token, "fetch-token");
    assert_eq!(
        text,
        "Latest news articles:\nTitle https://news.test/a: https://news.test/a"
    );
}

#[tokio::test]
async fn fetch_failure_is_answered_distinctly() {
    let mut app = test_app(Err("timed out"));
    let request = signed_request(
        &app.key,
        "/interactions",
        &json!({ "type": 2, "token": "fetch-token", "data": { "name": "fetchnews" } }),
    );

    app.router.oneshot(request).await.unwrap();

    let (_, text) = app.followups.recv().await.unwrap();
    assert!(text.starts_with("Could not reach the news source:"));
    assert!(text.contains("timed out"));
}

#[tokio::test]
async fn guild_install_event_is_acknowledged() {
    let app = test_app(Ok(vec![]));
    let event = json!({
        "version": 1,
        "application_id": "1",
        "type": 1,
        "event": {
            "type": "APPLICATION_AUTHORIZED",
            "data": { "integration_type": 0, "guild": { "id": "111", "name": "Spectre" } }
        }
    });

    let response = app
        .router
        .clone()
        .oneshot(signed_request(&app.key, "/events", &event))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let ping = signed_request(&app.key, "/events", &json!({ "version": 1, "type": 0 }));
    let response = app.router.oneshot(ping).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
