//! # WebSocket Gateway
//!
//! Bridges raw WebSocket traffic to the room actor. The gateway owns
//! nothing but plumbing: each socket gets a connection id and an outbox
//! channel, frames are parsed into [`ClientMessage`]s and forwarded,
//! replies come back on the outbox and are serialized out. All decisions
//! live in the actor.
//!
//! ## Endpoints
//!
//! | Method | Path       | Description                         |
//! |--------|------------|-------------------------------------|
//! | GET    | `/health`  | Liveness probe                      |
//! | GET    | `/ws`      | WebSocket upgrade for room sessions |
//! | GET    | `/metrics` | Prometheus text exposition          |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use tavern_protocol::session::{ClientMessage, ErrorKind, ServerMessage, SessionHandle};

use crate::metrics::{self, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for all request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Handle into the room actor.
    pub room: SessionHandle,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(Arc::clone(&state.metrics));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .merge(metrics_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// The liveness probe for orchestrators. It intentionally does not check
/// the room or the database.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `GET /ws` — WebSocket upgrade into a room session.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drives a single WebSocket connection: joins the room, pumps frames in
/// and replies out, and leaves on any exit path.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = Uuid::new_v4();
    let (outbox, mut replies) = mpsc::unbounded_channel();
    if !state.room.join(connection, outbox) {
        tracing::warn!(%connection, "room actor is gone, dropping socket");
        return;
    }
    state.metrics.connections_total.inc();
    state.metrics.connections_open.inc();
    tracing::debug!(%connection, "websocket connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            reply = replies.recv() => {
                match reply {
                    Some(message) => {
                        observe_reply(&state.metrics, &message);
                        let payload = match serde_json::to_string(&message) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::warn!(%connection, "failed to serialize reply: {}", e);
                                continue;
                            }
                        };
                        if sink.send(Message::Text(payload)).await.is_err() {
                            // Client disconnected.
                            break;
                        }
                    }
                    // The actor shut down.
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        state.metrics.messages_total.inc();
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => {
                                if !state.room.message(connection, message) {
                                    break;
                                }
                            }
                            Err(e) => {
                                // Unknown frames are dropped, not fatal; the
                                // client may be newer than the server.
                                tracing::debug!(%connection, error = %e, "unparseable frame dropped");
                            }
                        }
                    }
                    // Ping/pong are answered by axum; binary is not part
                    // of the contract.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                }
            }
        }
    }

    state.room.leave(connection);
    state.metrics.connections_open.dec();
    tracing::debug!(%connection, "websocket disconnected");
}

/// Count login outcomes as they pass through on their way out.
fn observe_reply(metrics: &SharedMetrics, message: &ServerMessage) {
    match message {
        ServerMessage::LoginOk { .. } => metrics.auth_success_total.inc(),
        ServerMessage::Error {
            kind: ErrorKind::AuthFailed,
            ..
        } => metrics.auth_failure_total.inc(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use tavern_protocol::auth::{ChallengeAuthenticator, CredentialIssuer};
    use tavern_protocol::config::EconomyLimits;
    use tavern_protocol::crypto::{Ed25519Recovery, TavernKeypair};
    use tavern_protocol::economy::EconomyEngine;
    use tavern_protocol::session::SessionActor;
    use tavern_protocol::storage::TavernDb;

    use crate::metrics::GatewayMetrics;

    fn test_state() -> AppState {
        let engine = EconomyEngine::new(
            TavernDb::open_temporary().unwrap(),
            EconomyLimits::default(),
        );
        let authenticator = ChallengeAuthenticator::new(Arc::new(Ed25519Recovery));
        let issuer = CredentialIssuer::new(TavernKeypair::generate());
        AppState {
            version: "test".into(),
            room: SessionActor::spawn(engine, authenticator, issuer),
            metrics: Arc::new(GatewayMetrics::new()),
        }
    }

    #[tokio::test]
    async fn health_endpoint_answers_ok() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_the_exposition_format() {
        let state = test_state();
        state.metrics.connections_total.inc();
        let router = create_router(state);
        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("tavern_connections_total 1"));
    }
}
