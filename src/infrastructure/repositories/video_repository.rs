//! Video Repository Implementation
//!
//! Read-only title search against the platform's videos table, serving
//! the gateway's live search-auto-suggest events.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{VideoRepository, VideoSuggestion};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: i64,
    title: String,
}

/// PostgreSQL video repository implementation.
#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    /// Create a new PgVideoRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    /// Case-insensitive substring match on titles, newest first.
    async fn search_by_title(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<VideoSuggestion>, AppError> {
        let rows = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT id, title
            FROM videos
            WHERE title ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VideoSuggestion {
                id: r.id,
                title: r.title,
            })
            .collect())
    }
}
