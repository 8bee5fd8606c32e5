//! Message entity, attachment value type, and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// File attachment belonging to a message.
///
/// A pure value type with no identity of its own: attachments live and die
/// with their message, stored inline in the `attachments` JSONB column.
/// `url` is the statically served public location, `local_path` the on-disk
/// path used when the cascade delete removes the backing file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Public URL clients download from
    pub url: String,

    /// Path on local disk, used for deletion
    pub local_path: String,
}

/// Represents a single chat entry.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - chat_id: BIGINT NOT NULL
/// - sender_id: BIGINT NOT NULL
/// - content: TEXT NOT NULL DEFAULT ''
/// - attachments: JSONB NOT NULL DEFAULT '[]'
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Messages are never updated after creation; they are removed only by the
/// cascade that runs when their chat is deleted. A message must carry
/// non-empty content or at least one attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owning chat ID
    pub chat_id: i64,

    /// Sending user ID
    pub sender_id: i64,

    /// Text content (may be empty when attachments are present)
    pub content: String,

    /// Embedded attachment list
    pub attachments: Vec<Attachment>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether the message satisfies the content-or-attachments invariant.
    pub fn has_body(&self) -> bool {
        !self.content.trim().is_empty() || !self.attachments.is_empty()
    }

    /// Local paths of every attachment, for cascade file removal.
    pub fn attachment_paths(&self) -> impl Iterator<Item = &str> {
        self.attachments.iter().map(|a| a.local_path.as_str())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: 0,
            chat_id: 0,
            sender_id: 0,
            content: String::new(),
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for Message data access operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Create a new message.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Fetch messages by ID (used when hydrating last-message pointers).
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Message>, AppError>;

    /// All messages of a chat, newest first.
    async fn find_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, AppError>;

    /// Delete every message of a chat. Returns the number of rows removed.
    async fn delete_by_chat(&self, chat_id: i64) -> Result<u64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_body_with_content() {
        let message = Message {
            content: "hello".to_string(),
            ..Default::default()
        };
        assert!(message.has_body());
    }

    #[test]
    fn test_has_body_with_attachment_only() {
        let message = Message {
            attachments: vec![Attachment {
                url: "http://localhost:8080/static/1/pic.png".to_string(),
                local_path: "public/attachments/1/pic.png".to_string(),
            }],
            ..Default::default()
        };
        assert!(message.has_body());
    }

    #[test]
    fn test_has_body_rejects_whitespace_only() {
        let message = Message {
            content: "   ".to_string(),
            ..Default::default()
        };
        assert!(!message.has_body());
    }

    #[test]
    fn test_attachment_paths() {
        let message = Message {
            attachments: vec![
                Attachment {
                    url: "u1".to_string(),
                    local_path: "p1".to_string(),
                },
                Attachment {
                    url: "u2".to_string(),
                    local_path: "p2".to_string(),
                },
            ],
            ..Default::default()
        };
        let paths: Vec<&str> = message.attachment_paths().collect();
        assert_eq!(paths, vec!["p1", "p2"]);
    }

    #[test]
    fn test_attachment_serde_roundtrip() {
        let attachment = Attachment {
            url: "http://localhost:8080/static/42/clip.mp4".to_string(),
            local_path: "public/attachments/42/clip.mp4".to_string(),
        };
        let json = serde_json::to_string(&attachment).unwrap();
        let back: Attachment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attachment);
    }
}
