//! User entity and repository trait.
//!
//! The `users` table is owned by the platform identity service; the chat
//! subsystem only reads the public columns mapped here. Credential columns
//! (password hash, refresh token) exist on the table but are never selected,
//! so they cannot leak into a response.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Public projection of a platform user.
///
/// Mapped columns of the `users` table:
/// - id: BIGINT PRIMARY KEY
/// - username: VARCHAR(50) NOT NULL UNIQUE
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - avatar_url: TEXT NULL
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Platform user ID
    pub id: i64,

    /// Username (unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// URL to the user's avatar image
    pub avatar_url: Option<String>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            email: String::new(),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Read-only repository trait over the platform's users table.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their platform ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Fetch users by ID in one round trip (hydration).
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    /// All users except the given one, for the start-a-chat picker.
    async fn find_all_except(&self, user_id: i64) -> Result<Vec<User>, AppError>;
}
