//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **ChatService**: Chat lifecycle and group membership
//! - **MessageService**: Message sending and history

pub mod chat_service;
pub mod message_service;

// Re-export chat service types
pub use chat_service::{ChatError, ChatService, ChatServiceImpl, DirectChatOutcome};

// Re-export message service types
pub use message_service::{
    MessageError, MessageService, MessageServiceImpl, UploadedFile,
};
