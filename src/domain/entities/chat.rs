//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Default display name for direct chats, mirroring what clients show
/// before they substitute the peer's profile.
pub const DIRECT_CHAT_NAME: &str = "One on one chat";

/// Minimum total member count for a group chat (creator + two others).
pub const MIN_GROUP_MEMBERS: usize = 3;

/// Represents a direct or group conversation.
///
/// Maps to the `chats` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - is_group_chat: BOOLEAN NOT NULL DEFAULT FALSE
/// - participant_ids: BIGINT[] NOT NULL
/// - admin_id: BIGINT NOT NULL
/// - last_message_id: BIGINT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Invariants maintained by the chat service:
/// - direct chats hold exactly two participants and `is_group_chat = false`
/// - group chats hold at least three participants and `is_group_chat = true`
/// - `admin_id` is always one of `participant_ids`
/// - at most one direct chat exists per unordered participant pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Display name ("One on one chat" for direct chats)
    pub name: String,

    /// Whether this is a group conversation
    pub is_group_chat: bool,

    /// Participant user IDs
    pub participant_ids: Vec<i64>,

    /// Owning admin user ID (the creator for direct chats)
    pub admin_id: i64,

    /// Pointer to the most recent message, if any
    pub last_message_id: Option<i64>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (bumped on every mutation)
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Check whether a user belongs to this chat.
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// Check whether a user is this chat's admin.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == user_id
    }

    /// The other member of a direct chat.
    pub fn direct_peer_of(&self, user_id: i64) -> Option<i64> {
        if self.is_group_chat {
            return None;
        }
        self.participant_ids
            .iter()
            .copied()
            .find(|&id| id != user_id)
    }

    /// Participants except the given user, preserving stored order.
    pub fn participants_except(&self, user_id: i64) -> Vec<i64> {
        self.participant_ids
            .iter()
            .copied()
            .filter(|&id| id != user_id)
            .collect()
    }
}

impl Default for Chat {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            is_group_chat: false,
            participant_ids: Vec::new(),
            admin_id: 0,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for Chat data access operations.
///
/// Participant mutations are guarded single-statement set updates: the
/// statement re-checks membership, so concurrent add/remove on the same
/// chat cannot lose updates. A `None` return from a guarded update means
/// the guard did not match (chat gone, or membership already in the
/// requested state).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Create a new chat.
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError>;

    /// Find a chat by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError>;

    /// Find the direct chat whose participant set is exactly the given pair.
    async fn find_direct_between(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> Result<Option<Chat>, AppError>;

    /// All chats containing the user, most recently updated first.
    async fn find_by_participant(&self, user_id: i64) -> Result<Vec<Chat>, AppError>;

    /// Rename a chat. Returns the updated row, or `None` if absent.
    async fn update_name(&self, id: i64, name: &str) -> Result<Option<Chat>, AppError>;

    /// Atomically append a participant if not already present.
    async fn add_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError>;

    /// Atomically remove a participant if currently present.
    async fn remove_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError>;

    /// Point the chat at its most recent message.
    async fn set_last_message(&self, id: i64, message_id: i64) -> Result<(), AppError>;

    /// Delete a chat row. Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}
