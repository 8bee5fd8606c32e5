//! Response DTOs
//!
//! Typed response models shared by the REST handlers and the gateway
//! events. Each shape is defined once here; services hydrate into these
//! instead of projecting ad hoc.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Attachment, Chat, Message, User};

/// Public profile projection of a user. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

/// Attachment as exposed to clients. The local path stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub url: String,
}

impl From<&Attachment> for AttachmentResponse {
    fn from(attachment: &Attachment) -> Self {
        Self {
            url: attachment.url.clone(),
        }
    }
}

/// A message with its sender expanded to a profile.
///
/// `sender` is `None` when the sending account has since been removed,
/// matching join semantics rather than failing the whole response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserProfile>,
    pub content: String,
    pub attachments: Vec<AttachmentResponse>,
    pub created_at: DateTime<Utc>,
}

impl MessageResponse {
    pub fn from_message(message: Message, sender: Option<UserProfile>) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender,
            content: message.content,
            attachments: message.attachments.iter().map(AttachmentResponse::from).collect(),
            created_at: message.created_at,
        }
    }
}

/// A chat with participants and last message expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: i64,
    pub name: String,
    pub is_group_chat: bool,
    pub participants: Vec<UserProfile>,
    pub admin_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatResponse {
    pub fn from_parts(
        chat: Chat,
        participants: Vec<UserProfile>,
        last_message: Option<MessageResponse>,
    ) -> Self {
        Self {
            id: chat.id,
            name: chat.name,
            is_group_chat: chat.is_group_chat,
            participants,
            admin_id: chat.admin_id,
            last_message,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}
