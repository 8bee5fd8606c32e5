//! # Domain Entities
//!
//! Core domain entities of the chat subsystem. All entities map directly to
//! their corresponding database tables.
//!
//! ## Owned Entities
//!
//! - **Chat**: A direct (two-party) or group conversation
//! - **Message**: A chat entry with optional embedded attachments
//!
//! ## External Entities (read-only)
//!
//! - **User**: Platform account, owned by the identity service
//! - **VideoSuggestion**: Title search results from the video index
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations. These traits are implemented in the infrastructure layer,
//! following the dependency inversion principle.

mod chat;
mod message;
mod user;
mod video;

// Re-export Chat entity and related types
pub use chat::{Chat, ChatRepository, DIRECT_CHAT_NAME, MIN_GROUP_MEMBERS};

// Re-export Message entity and related types
pub use message::{Attachment, Message, MessageRepository};

// Re-export User entity and related types
pub use user::{User, UserRepository};

// Re-export video search types
pub use video::{VideoRepository, VideoSuggestion};

// Generated mocks for service-level tests
#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;
#[cfg(test)]
pub use video::MockVideoRepository;
