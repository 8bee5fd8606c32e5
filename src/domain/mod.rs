//! # Domain Layer
//!
//! The domain layer contains the core business logic of the chat subsystem.
//! It is independent of any external frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (Chat, Message, User, ...)
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Pure business rules and invariants
//! - Repository traits define data access contracts

pub mod entities;

// Re-export commonly used types
pub use entities::*;
