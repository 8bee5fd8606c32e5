//! Video title suggestions for live search.
//!
//! The `videos` table belongs to the platform's video service; the chat
//! gateway only runs fuzzy title lookups against it to answer
//! search-auto-suggest events.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A single title suggestion returned to the requesting connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSuggestion {
    /// Video ID
    pub id: i64,

    /// Video title
    pub title: String,
}

/// Read-only search over the platform's video index.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Case-insensitive substring match on titles, newest first.
    async fn search_by_title(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<VideoSuggestion>, AppError>;
}
