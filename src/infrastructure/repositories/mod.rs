//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **ChatRepository** - Chat rows with guarded participant-array updates
//! - **MessageRepository** - Message rows with embedded JSONB attachments
//! - **UserRepository** - Read-only access to the platform users table
//! - **VideoRepository** - Read-only title search over the videos table

pub mod chat_repository;
pub mod message_repository;
pub mod user_repository;
pub mod video_repository;

// Re-export repository structs for convenience
pub use chat_repository::PgChatRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
pub use video_repository::PgVideoRepository;
