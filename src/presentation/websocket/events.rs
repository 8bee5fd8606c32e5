//! WebSocket Events
//!
//! Wire frames for the realtime gateway. Every frame is JSON of the
//! form `{"event": <name>, "data": <payload>}`; unit events omit the
//! data member.

use serde::{Deserialize, Serialize};

use crate::application::dto::{ChatResponse, MessageResponse};
use crate::domain::VideoSuggestion;

/// Client-to-server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Handshake fallback for clients that cannot send the auth cookie.
    Auth { token: String },
    /// Join the room of a chat to receive its typing traffic.
    JoinChat(i64),
    /// Notify other members of a chat room that the user is typing.
    Typing(i64),
    /// Notify other members that the user stopped typing.
    StopTyping(i64),
    /// Live video title search; the suggestion list comes back
    /// point-to-point on `receive-suggestion`.
    SearchAutoSuggest(String),
}

/// Server-to-client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// Handshake acknowledgment after successful authentication.
    Connected,
    /// Handshake or protocol failure; the connection closes after this.
    SocketError(String),
    Typing(i64),
    StopTyping(i64),
    /// A chat the recipient participates in was created, or the
    /// recipient was added to one.
    NewChat(ChatResponse),
    /// A group chat the recipient participates in was renamed.
    GroupRenamed(ChatResponse),
    /// The recipient was removed from a chat, or the chat was deleted.
    LeftChat(ChatResponse),
    /// A new message arrived in one of the recipient's chats.
    MessageReceived(MessageResponse),
    /// Video title suggestions for a `search-auto-suggest` request.
    ReceiveSuggestion(Vec<VideoSuggestion>),
}

impl ChatEvent {
    /// Get the event name for dispatch
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::Connected => "connected",
            ChatEvent::SocketError(_) => "socket-error",
            ChatEvent::Typing(_) => "typing",
            ChatEvent::StopTyping(_) => "stop-typing",
            ChatEvent::NewChat(_) => "new-chat",
            ChatEvent::GroupRenamed(_) => "group-renamed",
            ChatEvent::LeftChat(_) => "left-chat",
            ChatEvent::MessageReceived(_) => "message-received",
            ChatEvent::ReceiveSuggestion(_) => "receive-suggestion",
        }
    }
}
