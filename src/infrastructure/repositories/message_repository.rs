//! Message Repository Implementation
//!
//! PostgreSQL implementation of the MessageRepository trait. Attachments
//! are embedded in the message row as a JSONB column; they have no
//! identity outside their message.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{Attachment, Message, MessageRepository};
use crate::shared::error::AppError;

/// Database row matching the messages table schema.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    sender_id: i64,
    content: String,
    attachments: Json<Vec<Attachment>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Convert database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            content: self.content,
            attachments: self.attachments.0,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    /// Create a new message.
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, attachments)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, chat_id, sender_id, content, attachments, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(Json(&message.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_message())
    }

    /// Fetch messages by ID in one round trip.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, content, attachments, created_at
            FROM messages
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }

    /// All messages of a chat, newest first.
    async fn find_by_chat(&self, chat_id: i64) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, content, attachments, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_message()).collect())
    }

    /// Delete every message of a chat. Returns the number of rows removed.
    async fn delete_by_chat(&self, chat_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
