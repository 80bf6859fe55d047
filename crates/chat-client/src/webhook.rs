//! Interaction webhook server
//!
//! Optional HTTP listener for interactions delivered as signed webhooks
//! instead of gateway dispatches. Every request is verified against the
//! application's Ed25519 public key over `timestamp || body`; PINGs are
//! answered synchronously, everything else flows through the event pipeline
//! and blocks on a per-request responder until the handler replies or the
//! platform's 3 second deadline passes.

use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use ed25519_dalek::{Signature, VerifyingKey};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult, WebhookConfig};
use chat_core::{Interaction, InteractionType};

use crate::client::Client;
use crate::events::{Event, GatewayEvent, InteractionResponder};

/// Signature headers required on every delivery
const HEADER_SIGNATURE: &str = "X-Signature-Ed25519";
const HEADER_TIMESTAMP: &str = "X-Signature-Timestamp";

/// Handlers must respond within this deadline (platform requirement)
const RESPONSE_DEADLINE: Duration = Duration::from_secs(3);

/// Shared state of the webhook router
#[derive(Clone)]
pub(crate) struct WebhookState {
    public_key: VerifyingKey,
    /// Non-owning: the facade owns the server, never the reverse
    client: Weak<Client>,
}

/// Parse the hex public key from the configuration
pub(crate) fn parse_public_key(hex_key: &str) -> ClientResult<VerifyingKey> {
    let bytes = hex::decode(hex_key)
        .map_err(|_| ClientError::config("webhook public key is not valid hex"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| ClientError::config("webhook public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| ClientError::config("webhook public key is not a valid Ed25519 key"))
}

/// Start the webhook listener; resolves once the socket is bound
pub(crate) async fn start(
    client: Weak<Client>,
    config: &WebhookConfig,
    shutdown: CancellationToken,
) -> ClientResult<tokio::task::JoinHandle<()>> {
    let state = WebhookState {
        public_key: parse_public_key(&config.public_key)?,
        client,
    };

    let app = Router::new()
        .route(&config.path, post(handle_interaction))
        .with_state(state);

    let listener = TcpListener::bind(&config.address)
        .await
        .map_err(|e| ClientError::config(format!("webhook bind failed: {e}")))?;

    tracing::info!(
        address = %config.address,
        path = %config.path,
        "Interaction webhook listening"
    );

    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned());
        if let Err(err) = serve.await {
            tracing::error!(error = %err, "Webhook server error");
        }
    });

    Ok(handle)
}

/// POST handler for interaction deliveries
async fn handle_interaction(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !verify_signature(&state.public_key, &headers, &body) {
        tracing::debug!("Rejected interaction with bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(err) => {
            tracing::debug!(error = %err, "Undecodable interaction body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    // Liveness check: answered synchronously, never dispatched.
    if interaction.kind == InteractionType::Ping {
        return Json(serde_json::json!({ "type": 1 })).into_response();
    }

    let Some(client) = state.client.upgrade() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let (tx, rx) = oneshot::channel();
    let responder = Arc::new(InteractionResponder::new(tx));
    client.event_manager().dispatch(
        &client,
        GatewayEvent {
            shard_id: None,
            sequence: None,
            event: Event::InteractionCreate {
                interaction,
                responder: Some(responder),
            },
        },
    );

    match tokio::time::timeout(RESPONSE_DEADLINE, rx).await {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Err(_) => {
            tracing::warn!("Interaction handler missed the response deadline");
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

/// Check the Ed25519 signature over `timestamp || body`
fn verify_signature(key: &VerifyingKey, headers: &HeaderMap, body: &[u8]) -> bool {
    let Some(signature) = headers
        .get(HEADER_SIGNATURE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| hex::decode(value).ok())
    else {
        return false;
    };
    let Ok(signature) = <[u8; 64]>::try_from(signature.as_slice()).map(|bytes| Signature::from_bytes(&bytes))
    else {
        return false;
    };
    let Some(timestamp) = headers
        .get(HEADER_TIMESTAMP)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify_strict(&message, &signature).is_ok()
}
