//! WebSocket Connection Handler
//!
//! Drives a single gateway connection through its lifecycle: credential
//! extraction (cookie first, auth frame fallback), registration, the
//! inbound event loop, and teardown. Outbound traffic flows through the
//! connection's channel, drained by a dedicated writer task.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use super::events::{ChatEvent, ClientEvent};
use super::gateway::RoomKey;
use crate::domain::{UserRepository, VideoRepository};
use crate::infrastructure::repositories::{PgUserRepository, PgVideoRepository};
use crate::presentation::middleware::auth::{authenticate_token, ACCESS_TOKEN_COOKIE};
use crate::startup::AppState;

/// Maximum number of title suggestions returned per search frame.
const SUGGESTION_LIMIT: i64 = 5;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Response {
    let cookie_token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let max_message_size = state.settings.websocket.max_message_size;

    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, cookie_token))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, cookie_token: Option<String>) {
    let connection_id = Uuid::new_v4();
    tracing::debug!(connection_id = %connection_id, "New WebSocket connection");

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Outbound channel; the gateway and this handler both push into it
    let (tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();

    // Writer task draining the channel into JSON text frames
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Credential: accessToken cookie on the upgrade request first, then
    // an auth frame within the configured window
    let auth_timeout = Duration::from_secs(state.settings.websocket.auth_timeout_secs);
    let token = match cookie_token {
        Some(token) => Some(token),
        None => wait_for_auth_frame(&mut receiver, auth_timeout).await,
    };

    let Some(token) = token else {
        tracing::debug!(connection_id = %connection_id, "No credential before timeout");
        refuse(&tx, "Authentication required").await;
        sender_task.abort();
        return;
    };

    let user_id = match authenticate_token(&token, &state.settings.jwt.secret) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Rejected credential");
            refuse(&tx, "Invalid token").await;
            sender_task.abort();
            return;
        }
    };

    // The token may outlive the account it was issued for
    let user_repo = PgUserRepository::new(state.db.clone());
    match user_repo.find_by_id(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::debug!(connection_id = %connection_id, user_id = user_id, "Unknown user");
            refuse(&tx, "User not found").await;
            sender_task.abort();
            return;
        }
        Err(e) => {
            tracing::error!(connection_id = %connection_id, error = %e, "User lookup failed");
            refuse(&tx, "Internal error").await;
            sender_task.abort();
            return;
        }
    }

    // Registration joins the personal room; the ack confirms the
    // connection is live
    state.gateway.register(connection_id, user_id, tx.clone());
    let _ = tx.send(ChatEvent::Connected);

    tracing::info!(
        user_id = user_id,
        connection_id = %connection_id,
        "Connection authenticated"
    );

    // Inbound loop; all outbound traffic goes through the writer task
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_event(&text, connection_id, &state).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection_id, "Connection closed");
                break;
            }
            Ok(Message::Ping(_)) => {
                // Pong is handled automatically by axum
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Cleanup
    state.gateway.unregister(connection_id);
    sender_task.abort();

    tracing::info!(
        user_id = user_id,
        connection_id = %connection_id,
        "User disconnected"
    );
}

/// Wait for an `auth` frame, ignoring everything else.
///
/// Returns `None` on timeout or if the client goes away first.
async fn wait_for_auth_frame(
    receiver: &mut SplitStream<WebSocket>,
    auth_timeout: Duration,
) -> Option<String> {
    timeout(auth_timeout, async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Auth { token }) => return Some(token),
                    Ok(_) => {
                        tracing::debug!("Frame before authentication ignored");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Malformed frame before authentication");
                    }
                },
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => continue,
            }
        }
        None
    })
    .await
    .unwrap_or(None)
}

/// Send a refusal, giving the writer a moment to flush before teardown.
async fn refuse(tx: &mpsc::UnboundedSender<ChatEvent>, reason: &str) {
    let _ = tx.send(ChatEvent::SocketError(reason.to_string()));
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Handle one inbound frame from an authenticated connection.
///
/// Malformed frames and unknown events are logged and skipped; they
/// never tear down the connection.
async fn handle_client_event(text: &str, connection_id: Uuid, state: &AppState) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::JoinChat(chat_id)) => {
            state.gateway.join(connection_id, RoomKey::Chat(chat_id));
        }
        Ok(ClientEvent::Typing(chat_id)) => {
            state.gateway.emit_to_room_except(
                &RoomKey::Chat(chat_id),
                connection_id,
                &ChatEvent::Typing(chat_id),
            );
        }
        Ok(ClientEvent::StopTyping(chat_id)) => {
            state.gateway.emit_to_room_except(
                &RoomKey::Chat(chat_id),
                connection_id,
                &ChatEvent::StopTyping(chat_id),
            );
        }
        Ok(ClientEvent::SearchAutoSuggest(query)) => {
            let videos = PgVideoRepository::new(state.db.clone());
            match videos.search_by_title(&query, SUGGESTION_LIMIT).await {
                Ok(suggestions) => {
                    state
                        .gateway
                        .send_to_connection(connection_id, ChatEvent::ReceiveSuggestion(suggestions));
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "Title search failed");
                }
            }
        }
        Ok(ClientEvent::Auth { .. }) => {
            tracing::debug!(connection_id = %connection_id, "Duplicate auth frame ignored");
        }
        Err(e) => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Malformed frame skipped");
        }
    }
}
