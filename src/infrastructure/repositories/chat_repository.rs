//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Participant
//! mutations are guarded single-statement array updates: the WHERE clause
//! re-checks membership, so concurrent changes to one chat never lose
//! members and never insert duplicates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Chat, ChatRepository};
use crate::shared::error::AppError;

/// Database row matching the chats table schema.
#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: i64,
    name: String,
    is_group_chat: bool,
    participant_ids: Vec<i64>,
    admin_id: i64,
    last_message_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    /// Convert database row to domain Chat entity.
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            is_group_chat: self.is_group_chat,
            participant_ids: self.participant_ids,
            admin_id: self.admin_id,
            last_message_id: self.last_message_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL chat repository implementation.
///
/// Participants are stored as a BIGINT[] column rather than a join table;
/// all membership queries go through array operators backed by a GIN index.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    /// Create a new PgChatRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    /// Create a new chat.
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chats (id, name, is_group_chat, participant_ids, admin_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, is_group_chat, participant_ids, admin_id,
                      last_message_id, created_at, updated_at
            "#,
        )
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.is_group_chat)
        .bind(&chat.participant_ids)
        .bind(chat.admin_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_chat())
    }

    /// Find a chat by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, name, is_group_chat, participant_ids, admin_id,
                   last_message_id, created_at, updated_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// Find the direct chat whose participant set is exactly the given pair.
    async fn find_direct_between(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, name, is_group_chat, participant_ids, admin_id,
                   last_message_id, created_at, updated_at
            FROM chats
            WHERE NOT is_group_chat
              AND participant_ids @> ARRAY[$1, $2]::BIGINT[]
              AND cardinality(participant_ids) = 2
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// All chats containing the user, most recently updated first.
    async fn find_by_participant(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, name, is_group_chat, participant_ids, admin_id,
                   last_message_id, created_at, updated_at
            FROM chats
            WHERE participant_ids @> ARRAY[$1]::BIGINT[]
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_chat()).collect())
    }

    /// Rename a chat. Returns the updated row, or `None` if absent.
    async fn update_name(&self, id: i64, name: &str) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            UPDATE chats
            SET name = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, is_group_chat, participant_ids, admin_id,
                      last_message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// Atomically append a participant if not already present.
    async fn add_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            UPDATE chats
            SET participant_ids = array_append(participant_ids, $2),
                updated_at = NOW()
            WHERE id = $1
              AND NOT participant_ids @> ARRAY[$2]::BIGINT[]
            RETURNING id, name, is_group_chat, participant_ids, admin_id,
                      last_message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// Atomically remove a participant if currently present.
    async fn remove_participant(&self, id: i64, user_id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            UPDATE chats
            SET participant_ids = array_remove(participant_ids, $2),
                updated_at = NOW()
            WHERE id = $1
              AND participant_ids @> ARRAY[$2]::BIGINT[]
            RETURNING id, name, is_group_chat, participant_ids, admin_id,
                      last_message_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// Point the chat at its most recent message.
    async fn set_last_message(&self, id: i64, message_id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET last_message_id = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Chat with id {} not found", id)));
        }

        Ok(())
    }

    /// Delete a chat row. Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
