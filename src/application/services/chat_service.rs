//! Chat Service
//!
//! Chat lifecycle and group membership. Every mutation returns the
//! hydrated chat and pushes the matching gateway event into the
//! personal rooms of the affected participants.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::application::dto::{ChatResponse, UserProfile};
use crate::application::hydration;
use crate::domain::{
    Chat, ChatRepository, MessageRepository, UserRepository, DIRECT_CHAT_NAME, MIN_GROUP_MEMBERS,
};
use crate::infrastructure::storage::AttachmentStore;
use crate::presentation::websocket::{ChatEvent, ChatGateway, RoomKey};
use crate::shared::snowflake::SnowflakeGenerator;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Find or lazily create the direct chat between requester and peer
    async fn create_or_get_direct_chat(
        &self,
        requester_id: i64,
        peer_id: i64,
    ) -> Result<DirectChatOutcome, ChatError>;

    /// Create a group chat with the requester as admin
    async fn create_group_chat(
        &self,
        requester_id: i64,
        name: &str,
        participant_ids: &[i64],
    ) -> Result<ChatResponse, ChatError>;

    /// Get group chat details
    async fn get_group_chat(&self, chat_id: i64) -> Result<ChatResponse, ChatError>;

    /// Rename a group chat (admin only)
    async fn rename_group_chat(
        &self,
        requester_id: i64,
        chat_id: i64,
        name: &str,
    ) -> Result<ChatResponse, ChatError>;

    /// Add a member to a group chat (admin only)
    async fn add_participant(
        &self,
        requester_id: i64,
        chat_id: i64,
        participant_id: i64,
    ) -> Result<ChatResponse, ChatError>;

    /// Remove a member from a group chat (admin only)
    async fn remove_participant(
        &self,
        requester_id: i64,
        chat_id: i64,
        participant_id: i64,
    ) -> Result<ChatResponse, ChatError>;

    /// Leave a group chat
    async fn leave_group_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError>;

    /// Delete a group chat with its messages and attachments (admin only)
    async fn delete_group_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError>;

    /// Delete a direct chat with its messages and attachments
    async fn delete_direct_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError>;

    /// List the requester's chats, most recently updated first
    async fn list_chats(&self, user_id: i64) -> Result<Vec<ChatResponse>, ChatError>;

    /// List every other user, for starting a new chat
    async fn list_available_users(&self, requester_id: i64) -> Result<Vec<UserProfile>, ChatError>;
}

/// Result of a direct-chat request; `created` drives the response status.
#[derive(Debug, Clone)]
pub struct DirectChatOutcome {
    pub chat: ChatResponse,
    pub created: bool,
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// ChatService implementation
pub struct ChatServiceImpl<C, M, U>
where
    C: ChatRepository,
    M: MessageRepository,
    U: UserRepository,
{
    chat_repo: Arc<C>,
    message_repo: Arc<M>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
    gateway: Arc<ChatGateway>,
    storage: Arc<AttachmentStore>,
}

impl<C, M, U> ChatServiceImpl<C, M, U>
where
    C: ChatRepository,
    M: MessageRepository,
    U: UserRepository,
{
    pub fn new(
        chat_repo: Arc<C>,
        message_repo: Arc<M>,
        user_repo: Arc<U>,
        id_generator: Arc<SnowflakeGenerator>,
        gateway: Arc<ChatGateway>,
        storage: Arc<AttachmentStore>,
    ) -> Self {
        Self {
            chat_repo,
            message_repo,
            user_repo,
            id_generator,
            gateway,
            storage,
        }
    }

    async fn load_group_chat(&self, chat_id: i64) -> Result<Chat, ChatError> {
        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::NotFound)?;

        if !chat.is_group_chat {
            return Err(ChatError::NotFound);
        }

        Ok(chat)
    }

    async fn hydrate(&self, chat: Chat) -> Result<ChatResponse, ChatError> {
        hydration::chat_response(&*self.user_repo, &*self.message_repo, chat)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))
    }

    fn notify_users(&self, user_ids: &[i64], event: &ChatEvent) {
        for user_id in user_ids {
            self.gateway.emit_to_room(&RoomKey::User(*user_id), event);
        }
    }

    /// Delete a chat's messages and their attachment files. File removal
    /// is best-effort; every failure is logged and skipped.
    async fn cascade_delete_messages(&self, chat_id: i64) -> Result<(), ChatError> {
        let messages = self
            .message_repo
            .find_by_chat(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        for message in &messages {
            for path in message.attachment_paths() {
                if let Err(e) = self.storage.remove(path).await {
                    warn!(
                        chat_id = chat_id,
                        message_id = message.id,
                        path = path,
                        error = %e,
                        "Failed to delete attachment file"
                    );
                }
            }
        }

        self.message_repo
            .delete_by_chat(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl<C, M, U> ChatService for ChatServiceImpl<C, M, U>
where
    C: ChatRepository + 'static,
    M: MessageRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create_or_get_direct_chat(
        &self,
        requester_id: i64,
        peer_id: i64,
    ) -> Result<DirectChatOutcome, ChatError> {
        if peer_id == requester_id {
            return Err(ChatError::InvalidArgument(
                "Cannot open a direct chat with yourself".to_string(),
            ));
        }

        self.user_repo
            .find_by_id(peer_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::UserNotFound)?;

        // At most one direct chat exists per pair; reuse it when present
        if let Some(existing) = self
            .chat_repo
            .find_direct_between(requester_id, peer_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
        {
            let chat = self.hydrate(existing).await?;
            return Ok(DirectChatOutcome {
                chat,
                created: false,
            });
        }

        let now = Utc::now();
        let chat = Chat {
            id: self.id_generator.generate(),
            name: DIRECT_CHAT_NAME.to_string(),
            is_group_chat: false,
            participant_ids: vec![requester_id, peer_id],
            admin_id: requester_id,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .chat_repo
            .create(&chat)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        let recipients = created.participants_except(requester_id);
        let response = self.hydrate(created).await?;
        self.notify_users(&recipients, &ChatEvent::NewChat(response.clone()));

        Ok(DirectChatOutcome {
            chat: response,
            created: true,
        })
    }

    async fn create_group_chat(
        &self,
        requester_id: i64,
        name: &str,
        participant_ids: &[i64],
    ) -> Result<ChatResponse, ChatError> {
        if participant_ids.contains(&requester_id) {
            return Err(ChatError::InvalidArgument(
                "Participant list must not include yourself".to_string(),
            ));
        }

        // Requester joins implicitly; dedup before the size check
        let mut members: Vec<i64> = Vec::with_capacity(participant_ids.len() + 1);
        members.push(requester_id);
        for &id in participant_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }

        if members.len() < MIN_GROUP_MEMBERS {
            return Err(ChatError::InvalidArgument(format!(
                "A group chat needs at least {} members",
                MIN_GROUP_MEMBERS
            )));
        }

        let now = Utc::now();
        let chat = Chat {
            id: self.id_generator.generate(),
            name: name.to_string(),
            is_group_chat: true,
            participant_ids: members,
            admin_id: requester_id,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .chat_repo
            .create(&chat)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        let recipients = created.participants_except(requester_id);
        let response = self.hydrate(created).await?;
        self.notify_users(&recipients, &ChatEvent::NewChat(response.clone()));

        Ok(response)
    }

    async fn get_group_chat(&self, chat_id: i64) -> Result<ChatResponse, ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        self.hydrate(chat).await
    }

    async fn rename_group_chat(
        &self,
        requester_id: i64,
        chat_id: i64,
        name: &str,
    ) -> Result<ChatResponse, ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        if !chat.is_admin(requester_id) {
            return Err(ChatError::Forbidden);
        }

        let updated = self
            .chat_repo
            .update_name(chat_id, name)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::NotFound)?;

        let recipients = updated.participants_except(requester_id);
        let response = self.hydrate(updated).await?;
        self.notify_users(&recipients, &ChatEvent::GroupRenamed(response.clone()));

        Ok(response)
    }

    async fn add_participant(
        &self,
        requester_id: i64,
        chat_id: i64,
        participant_id: i64,
    ) -> Result<ChatResponse, ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        if !chat.is_admin(requester_id) {
            return Err(ChatError::Forbidden);
        }
        if chat.is_participant(participant_id) {
            return Err(ChatError::InvalidArgument(
                "User is already a participant".to_string(),
            ));
        }

        // Guarded append; None means a concurrent update won the race
        let updated = self
            .chat_repo
            .add_participant(chat_id, participant_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or_else(|| {
                ChatError::InvalidArgument("User is already a participant".to_string())
            })?;

        let response = self.hydrate(updated).await?;
        self.notify_users(&[participant_id], &ChatEvent::NewChat(response.clone()));

        Ok(response)
    }

    async fn remove_participant(
        &self,
        requester_id: i64,
        chat_id: i64,
        participant_id: i64,
    ) -> Result<ChatResponse, ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        if !chat.is_admin(requester_id) {
            return Err(ChatError::Forbidden);
        }
        if participant_id == chat.admin_id {
            return Err(ChatError::InvalidArgument(
                "The group admin cannot be removed".to_string(),
            ));
        }
        if !chat.is_participant(participant_id) {
            return Err(ChatError::InvalidArgument(
                "User is not a participant".to_string(),
            ));
        }

        let updated = self
            .chat_repo
            .remove_participant(chat_id, participant_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or_else(|| ChatError::InvalidArgument("User is not a participant".to_string()))?;

        let response = self.hydrate(updated).await?;
        self.notify_users(&[participant_id], &ChatEvent::LeftChat(response.clone()));

        Ok(response)
    }

    async fn leave_group_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        if !chat.is_participant(requester_id) {
            return Err(ChatError::InvalidArgument(
                "You are not a participant of this chat".to_string(),
            ));
        }

        // The admin may leave like anyone else; no reassignment happens
        self.chat_repo
            .remove_participant(chat_id, requester_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or_else(|| {
                ChatError::InvalidArgument("You are not a participant of this chat".to_string())
            })?;

        Ok(())
    }

    async fn delete_group_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = self.load_group_chat(chat_id).await?;
        if !chat.is_admin(requester_id) {
            return Err(ChatError::Forbidden);
        }

        // Hydrate before the cascade wipes the last message
        let recipients = chat.participants_except(requester_id);
        let response = self.hydrate(chat).await?;

        self.cascade_delete_messages(chat_id).await?;

        let deleted = self
            .chat_repo
            .delete(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;
        if !deleted {
            return Err(ChatError::NotFound);
        }

        self.notify_users(&recipients, &ChatEvent::LeftChat(response));

        Ok(())
    }

    async fn delete_direct_chat(&self, requester_id: i64, chat_id: i64) -> Result<(), ChatError> {
        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::NotFound)?;

        if chat.is_group_chat {
            return Err(ChatError::NotFound);
        }
        if !chat.is_participant(requester_id) {
            return Err(ChatError::Forbidden);
        }

        let recipients = chat.participants_except(requester_id);
        let response = self.hydrate(chat).await?;

        self.cascade_delete_messages(chat_id).await?;

        let deleted = self
            .chat_repo
            .delete(chat_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;
        if !deleted {
            return Err(ChatError::NotFound);
        }

        self.notify_users(&recipients, &ChatEvent::LeftChat(response));

        Ok(())
    }

    async fn list_chats(&self, user_id: i64) -> Result<Vec<ChatResponse>, ChatError> {
        let chats = self
            .chat_repo
            .find_by_participant(user_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        hydration::chat_responses(&*self.user_repo, &*self.message_repo, chats)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))
    }

    async fn list_available_users(
        &self,
        requester_id: i64,
    ) -> Result<Vec<UserProfile>, ChatError> {
        let users = self
            .user_repo
            .find_all_except(requester_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        Ok(users.into_iter().map(UserProfile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{
        Message, MockChatRepository, MockMessageRepository, MockUserRepository, User,
    };

    fn user(id: i64, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            ..Default::default()
        }
    }

    fn group_chat(id: i64, admin_id: i64, participants: Vec<i64>) -> Chat {
        Chat {
            id,
            name: "Trip".to_string(),
            is_group_chat: true,
            participant_ids: participants,
            admin_id,
            ..Default::default()
        }
    }

    fn direct_chat(id: i64, a: i64, b: i64) -> Chat {
        Chat {
            id,
            name: DIRECT_CHAT_NAME.to_string(),
            is_group_chat: false,
            participant_ids: vec![a, b],
            admin_id: a,
            ..Default::default()
        }
    }

    /// User repo stub that resolves every id.
    fn open_user_repo() -> MockUserRepository {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .returning(|id| Ok(Some(user(id, &format!("u{}", id)))));
        repo.expect_find_by_ids().returning(|ids| {
            Ok(ids
                .iter()
                .map(|&id| user(id, &format!("u{}", id)))
                .collect())
        });
        repo
    }

    async fn build_service(
        chat_repo: MockChatRepository,
        message_repo: MockMessageRepository,
        user_repo: MockUserRepository,
    ) -> (
        ChatServiceImpl<MockChatRepository, MockMessageRepository, MockUserRepository>,
        Arc<ChatGateway>,
        TempDir,
    ) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(
            AttachmentStore::new(dir.path().to_path_buf(), "http://localhost:8080")
                .await
                .unwrap(),
        );
        let gateway = Arc::new(ChatGateway::new());
        let service = ChatServiceImpl::new(
            Arc::new(chat_repo),
            Arc::new(message_repo),
            Arc::new(user_repo),
            Arc::new(SnowflakeGenerator::new(0, 0)),
            gateway.clone(),
            storage,
        );
        (service, gateway, dir)
    }

    fn connect(gateway: &ChatGateway, user_id: i64) -> mpsc::UnboundedReceiver<ChatEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        gateway.register(Uuid::new_v4(), user_id, tx);
        rx
    }

    #[tokio::test]
    async fn test_direct_chat_is_idempotent() {
        let saved: Arc<Mutex<Option<Chat>>> = Arc::new(Mutex::new(None));

        let mut chat_repo = MockChatRepository::new();
        let lookup = saved.clone();
        chat_repo
            .expect_find_direct_between()
            .returning(move |_, _| Ok(lookup.lock().clone()));
        let store = saved.clone();
        chat_repo.expect_create().returning(move |chat| {
            *store.lock() = Some(chat.clone());
            Ok(chat.clone())
        });

        let (service, _gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;

        let first = service.create_or_get_direct_chat(1, 2).await.unwrap();
        let second = service.create_or_get_direct_chat(1, 2).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.chat.id, second.chat.id);
    }

    #[tokio::test]
    async fn test_direct_chat_with_self_is_rejected() {
        let (service, _gateway, _dir) = build_service(
            MockChatRepository::new(),
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.create_or_get_direct_chat(1, 1).await;

        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_direct_chat_with_unknown_peer_is_rejected() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_id().returning(|_| Ok(None));

        let (service, _gateway, _dir) = build_service(
            MockChatRepository::new(),
            MockMessageRepository::new(),
            user_repo,
        )
        .await;

        let result = service.create_or_get_direct_chat(1, 999).await;

        assert!(matches!(result, Err(ChatError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_direct_chat_notifies_peer_only() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_direct_between()
            .returning(|_, _| Ok(None));
        chat_repo.expect_create().returning(|chat| Ok(chat.clone()));

        let (service, gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;
        let mut requester_rx = connect(&gateway, 1);
        let mut peer_rx = connect(&gateway, 2);

        service.create_or_get_direct_chat(1, 2).await.unwrap();

        match peer_rx.try_recv() {
            Ok(ChatEvent::NewChat(chat)) => assert_eq!(chat.name, DIRECT_CHAT_NAME),
            other => panic!("expected new-chat, got {:?}", other),
        }
        assert!(requester_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_chat_rejects_self_inclusion() {
        let (service, _gateway, _dir) = build_service(
            MockChatRepository::new(),
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.create_group_chat(1, "Trip", &[1, 2]).await;

        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_group_chat_rejects_fewer_than_three_members() {
        let (service, _gateway, _dir) = build_service(
            MockChatRepository::new(),
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.create_group_chat(1, "Trip", &[2]).await;
        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));

        // Duplicates collapse before the size check
        let result = service.create_group_chat(1, "Trip", &[2, 2]).await;
        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_group_chat_sets_admin_and_notifies_members() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_create()
            .withf(|chat: &Chat| {
                chat.is_group_chat && chat.admin_id == 1 && chat.participant_ids == vec![1, 2, 3]
            })
            .returning(|chat| Ok(chat.clone()));

        let (service, gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;
        let mut b_rx = connect(&gateway, 2);
        let mut c_rx = connect(&gateway, 3);

        let chat = service.create_group_chat(1, "Trip", &[2, 3]).await.unwrap();

        assert_eq!(chat.participants.len(), 3);
        assert!(matches!(b_rx.try_recv(), Ok(ChatEvent::NewChat(_))));
        assert!(matches!(c_rx.try_recv(), Ok(ChatEvent::NewChat(_))));
    }

    #[tokio::test]
    async fn test_add_participant_requires_admin() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.add_participant(2, 10, 4).await;

        assert!(matches!(result, Err(ChatError::Forbidden)));
    }

    #[tokio::test]
    async fn test_add_participant_rejects_existing_member() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.add_participant(1, 10, 2).await;

        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_add_participant_notifies_added_user() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo.expect_add_participant().returning(|id, user_id| {
            let mut chat = group_chat(id, 1, vec![1, 2, 3]);
            chat.participant_ids.push(user_id);
            Ok(Some(chat))
        });

        let (service, gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;
        let mut added_rx = connect(&gateway, 4);

        let chat = service.add_participant(1, 10, 4).await.unwrap();

        assert_eq!(chat.participants.len(), 4);
        assert!(matches!(added_rx.try_recv(), Ok(ChatEvent::NewChat(_))));
    }

    #[tokio::test]
    async fn test_remove_participant_rejects_admin_target() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.remove_participant(1, 10, 1).await;

        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_remove_participant_notifies_removed_user() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo
            .expect_remove_participant()
            .returning(|id, user_id| {
                let mut chat = group_chat(id, 1, vec![1, 2, 3]);
                chat.participant_ids.retain(|&p| p != user_id);
                Ok(Some(chat))
            });

        let (service, gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;
        let mut removed_rx = connect(&gateway, 2);

        let chat = service.remove_participant(1, 10, 2).await.unwrap();

        assert_eq!(chat.participants.len(), 2);
        assert!(matches!(removed_rx.try_recv(), Ok(ChatEvent::LeftChat(_))));
    }

    #[tokio::test]
    async fn test_rename_requires_admin() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.rename_group_chat(2, 10, "Hijacked").await;

        assert!(matches!(result, Err(ChatError::Forbidden)));
    }

    #[tokio::test]
    async fn test_rename_notifies_other_participants() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo.expect_update_name().returning(|id, name| {
            let mut chat = group_chat(id, 1, vec![1, 2, 3]);
            chat.name = name.to_string();
            Ok(Some(chat))
        });

        let (service, gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;
        let mut requester_rx = connect(&gateway, 1);
        let mut c_rx = connect(&gateway, 3);

        let chat = service.rename_group_chat(1, 10, "Trip2").await.unwrap();

        assert_eq!(chat.name, "Trip2");
        match c_rx.try_recv() {
            Ok(ChatEvent::GroupRenamed(renamed)) => assert_eq!(renamed.name, "Trip2"),
            other => panic!("expected group-renamed, got {:?}", other),
        }
        assert!(requester_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_group_removes_requester() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo
            .expect_remove_participant()
            .withf(|id: &i64, user_id: &i64| *id == 10 && *user_id == 2)
            .returning(|id, user_id| {
                let mut chat = group_chat(id, 1, vec![1, 2, 3]);
                chat.participant_ids.retain(|&p| p != user_id);
                Ok(Some(chat))
            });

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        service.leave_group_chat(2, 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_leave_group_rejects_non_participant() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.leave_group_chat(9, 10).await;

        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_admin_can_leave_without_reassignment() {
        // The departed admin keeps their admin_id on the chat; nothing
        // promotes another member.
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo
            .expect_remove_participant()
            .withf(|id: &i64, user_id: &i64| *id == 10 && *user_id == 1)
            .returning(|id, user_id| {
                let mut chat = group_chat(id, 1, vec![1, 2, 3]);
                chat.participant_ids.retain(|&p| p != user_id);
                assert!(!chat.participant_ids.contains(&chat.admin_id));
                Ok(Some(chat))
            });

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        service.leave_group_chat(1, 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_group_requires_admin() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.delete_group_chat(2, 10).await;

        assert!(matches!(result, Err(ChatError::Forbidden)));
    }

    #[tokio::test]
    async fn test_delete_group_rejects_direct_chat() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(direct_chat(id, 1, 2))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.delete_group_chat(1, 10).await;

        assert!(matches!(result, Err(ChatError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_group_cascades_messages_and_files() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(
            AttachmentStore::new(dir.path().to_path_buf(), "http://localhost:8080")
                .await
                .unwrap(),
        );
        let attachment = storage.persist(500, "doc.pdf", b"pdf").await.unwrap();
        let stored_path = attachment.local_path.clone();

        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(group_chat(id, 1, vec![1, 2, 3]))));
        chat_repo.expect_delete().returning(|_| Ok(true));

        let message = Message {
            id: 500,
            chat_id: 10,
            sender_id: 2,
            content: String::new(),
            attachments: vec![attachment],
            ..Default::default()
        };
        let mut message_repo = MockMessageRepository::new();
        message_repo
            .expect_find_by_chat()
            .return_once(move |_| Ok(vec![message]));
        message_repo
            .expect_delete_by_chat()
            .times(1)
            .returning(|_| Ok(1));

        let gateway = Arc::new(ChatGateway::new());
        let service = ChatServiceImpl::new(
            Arc::new(chat_repo),
            Arc::new(message_repo),
            Arc::new(open_user_repo()),
            Arc::new(SnowflakeGenerator::new(0, 0)),
            gateway.clone(),
            storage,
        );
        let mut b_rx = connect(&gateway, 2);

        service.delete_group_chat(1, 10).await.unwrap();

        assert!(!std::path::Path::new(&stored_path).exists());
        assert!(matches!(b_rx.try_recv(), Ok(ChatEvent::LeftChat(_))));
    }

    #[tokio::test]
    async fn test_delete_direct_requires_participant() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(direct_chat(id, 1, 2))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.delete_direct_chat(3, 10).await;

        assert!(matches!(result, Err(ChatError::Forbidden)));
    }

    #[tokio::test]
    async fn test_delete_direct_notifies_peer() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(direct_chat(id, 1, 2))));
        chat_repo.expect_delete().returning(|_| Ok(true));

        let mut message_repo = MockMessageRepository::new();
        message_repo.expect_find_by_chat().returning(|_| Ok(vec![]));
        message_repo.expect_delete_by_chat().returning(|_| Ok(0));

        let (service, gateway, _dir) =
            build_service(chat_repo, message_repo, open_user_repo()).await;
        let mut peer_rx = connect(&gateway, 2);

        service.delete_direct_chat(1, 10).await.unwrap();

        assert!(matches!(peer_rx.try_recv(), Ok(ChatEvent::LeftChat(_))));
    }

    #[tokio::test]
    async fn test_get_group_chat_rejects_direct() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo
            .expect_find_by_id()
            .returning(|id| Ok(Some(direct_chat(id, 1, 2))));

        let (service, _gateway, _dir) = build_service(
            chat_repo,
            MockMessageRepository::new(),
            MockUserRepository::new(),
        )
        .await;

        let result = service.get_group_chat(10).await;

        assert!(matches!(result, Err(ChatError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_chats_preserves_repository_order() {
        let mut chat_repo = MockChatRepository::new();
        chat_repo.expect_find_by_participant().returning(|_| {
            Ok(vec![
                group_chat(20, 1, vec![1, 2, 3]),
                group_chat(10, 1, vec![1, 2, 3]),
            ])
        });

        let (service, _gateway, _dir) =
            build_service(chat_repo, MockMessageRepository::new(), open_user_repo()).await;

        let chats = service.list_chats(1).await.unwrap();

        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, 20);
        assert_eq!(chats[1].id, 10);
    }

    #[tokio::test]
    async fn test_list_available_users_excludes_requester() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_all_except()
            .withf(|id: &i64| *id == 1)
            .returning(|_| Ok(vec![user(2, "b"), user(3, "c")]));

        let (service, _gateway, _dir) = build_service(
            MockChatRepository::new(),
            MockMessageRepository::new(),
            user_repo,
        )
        .await;

        let users = service.list_available_users(1).await.unwrap();

        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|profile| profile.id != 1));
    }

    #[tokio::test]
    async fn test_group_lifecycle_notifies_affected_members() {
        use crate::application::services::message_service::{MessageService, MessageServiceImpl};

        let chats: Arc<Mutex<HashMap<i64, Chat>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut chat_repo = MockChatRepository::new();
        let state = chats.clone();
        chat_repo.expect_create().returning(move |chat| {
            state.lock().insert(chat.id, chat.clone());
            Ok(chat.clone())
        });
        let state = chats.clone();
        chat_repo
            .expect_find_by_id()
            .returning(move |id| Ok(state.lock().get(&id).cloned()));
        let state = chats.clone();
        chat_repo
            .expect_remove_participant()
            .returning(move |id, user_id| {
                let mut chats = state.lock();
                Ok(chats.get_mut(&id).map(|chat| {
                    chat.participant_ids.retain(|&p| p != user_id);
                    chat.clone()
                }))
            });
        let state = chats.clone();
        chat_repo.expect_update_name().returning(move |id, name| {
            let mut chats = state.lock();
            Ok(chats.get_mut(&id).map(|chat| {
                chat.name = name.to_string();
                chat.clone()
            }))
        });
        let state = chats.clone();
        chat_repo
            .expect_set_last_message()
            .returning(move |id, message_id| {
                if let Some(chat) = state.lock().get_mut(&id) {
                    chat.last_message_id = Some(message_id);
                }
                Ok(())
            });

        let mut message_repo = MockMessageRepository::new();
        message_repo
            .expect_create()
            .returning(|message| Ok(message.clone()));

        let dir = TempDir::new().unwrap();
        let storage = Arc::new(
            AttachmentStore::new(dir.path().to_path_buf(), "http://localhost:8080")
                .await
                .unwrap(),
        );
        let gateway = Arc::new(ChatGateway::new());
        let chat_repo = Arc::new(chat_repo);
        let message_repo = Arc::new(message_repo);
        let user_repo = Arc::new(open_user_repo());
        let ids = Arc::new(SnowflakeGenerator::new(0, 0));

        let chat_service = ChatServiceImpl::new(
            chat_repo.clone(),
            message_repo.clone(),
            user_repo.clone(),
            ids.clone(),
            gateway.clone(),
            storage.clone(),
        );
        let message_service = MessageServiceImpl::new(
            chat_repo,
            message_repo,
            user_repo,
            ids,
            gateway.clone(),
            storage,
        );

        let mut b_rx = connect(&gateway, 2);
        let mut c_rx = connect(&gateway, 3);

        // A creates the group: B and C learn about it
        let chat = chat_service
            .create_group_chat(1, "Trip", &[2, 3])
            .await
            .unwrap();
        assert_eq!(chat.participants.len(), 3);
        assert_eq!(chat.admin_id, 1);
        assert!(matches!(b_rx.try_recv(), Ok(ChatEvent::NewChat(_))));
        assert!(matches!(c_rx.try_recv(), Ok(ChatEvent::NewChat(_))));

        // A removes B: only B hears left-chat
        let updated = chat_service
            .remove_participant(1, chat.id, 2)
            .await
            .unwrap();
        assert_eq!(updated.participants.len(), 2);
        assert!(matches!(b_rx.try_recv(), Ok(ChatEvent::LeftChat(_))));
        assert!(c_rx.try_recv().is_err());

        // A renames: C hears group-renamed with the new name
        chat_service
            .rename_group_chat(1, chat.id, "Trip2")
            .await
            .unwrap();
        match c_rx.try_recv() {
            Ok(ChatEvent::GroupRenamed(renamed)) => assert_eq!(renamed.name, "Trip2"),
            other => panic!("expected group-renamed, got {:?}", other),
        }
        assert!(b_rx.try_recv().is_err());

        // A sends a message: C receives it with the hydrated sender
        message_service
            .send_message(1, chat.id, "hi".to_string(), Vec::new())
            .await
            .unwrap();
        match c_rx.try_recv() {
            Ok(ChatEvent::MessageReceived(message)) => {
                assert_eq!(message.content, "hi");
                assert_eq!(message.sender.unwrap().id, 1);
            }
            other => panic!("expected message-received, got {:?}", other),
        }
        assert!(b_rx.try_recv().is_err());
    }
}
