//! Request DTOs
//!
//! Data structures for API request bodies.

use serde::Deserialize;
use validator::Validate;

/// Create group chat request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupChatRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be 3-100 characters"))]
    pub name: String,

    /// Other members to invite; the requester is added implicitly
    #[validate(length(min = 2, max = 100, message = "Participants must be 2-100 members"))]
    pub participants: Vec<i64>,
}

/// Rename group chat request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameGroupChatRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be 3-100 characters"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_request_rejects_short_participant_list() {
        let request = CreateGroupChatRequest {
            name: "Weekend Trip".to_string(),
            participants: vec![2],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_group_request_accepts_two_participants() {
        let request = CreateGroupChatRequest {
            name: "Weekend Trip".to_string(),
            participants: vec![2, 3],
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_rename_rejects_short_name() {
        let request = RenameGroupChatRequest { name: "ab".into() };
        assert!(request.validate().is_err());
    }
}
