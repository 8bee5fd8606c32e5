//! Message Service
//!
//! Message sending and history. A sent message carries its uploads as
//! attachments persisted through the attachment store, bumps the chat's
//! last-message pointer, and fans out to every other participant's
//! personal room.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::MessageResponse;
use crate::application::hydration;
use crate::domain::{Attachment, ChatRepository, Message, MessageRepository, UserRepository};
use crate::infrastructure::storage::AttachmentStore;
use crate::presentation::websocket::{ChatEvent, ChatGateway, RoomKey};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// File received from a multipart upload, not yet persisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Send a message with optional file uploads
    async fn send_message(
        &self,
        requester_id: i64,
        chat_id: i64,
        content: String,
        uploads: Vec<UploadedFile>,
    ) -> Result<MessageResponse, MessageError>;

    /// All messages of a chat, newest first
    async fn list_messages(&self, chat_id: i64) -> Result<Vec<MessageResponse>, MessageError>;
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// MessageService implementation
pub struct MessageServiceImpl<C, M, U>
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

impl<C, M, U> MessageServiceImpl<C, M, U>
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

    fn notify_users(&self, user_ids: &[i64], event: &ChatEvent) {
        for user_id in user_ids {
            self.gateway.emit_to_room(&RoomKey::User(*user_id), event);
        }
    }

    async fn persist_uploads(
        &self,
        message_id: i64,
        uploads: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, MessageError> {
        let mut attachments = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let attachment = self
                .storage
                .persist(message_id, &upload.file_name, &upload.bytes)
                .await
                .map_err(|e| match e {
                    AppError::BadRequest(msg) => MessageError::InvalidArgument(msg),
                    other => MessageError::Internal(other.to_string()),
                })?;
            attachments.push(attachment);
        }
        Ok(attachments)
    }
}

#[async_trait]
impl<C, M, U> MessageService for MessageServiceImpl<C, M, U>
where
    C: ChatRepository + 'static,
    M: MessageRepository + 'static,
    U: UserRepository + 'static,
{
    async fn send_message(
        &self,
        requester_id: i64,
        chat_id: i64,
        content: String,
        uploads: Vec<UploadedFile>,
    ) -> Result<MessageResponse, MessageError> {
        if content.trim().is_empty() && uploads.is_empty() {
            return Err(MessageError::InvalidArgument(
                "A message needs text or at least one attachment".to_string(),
            ));
        }

        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?
            .ok_or(MessageError::ChatNotFound)?;

        // The attachment directory is keyed by the message id, so the id
        // must exist before any file is written
        let message_id = self.id_generator.generate();
        let attachments = self.persist_uploads(message_id, uploads).await?;

        let message = Message {
            id: message_id,
            chat_id,
            sender_id: requester_id,
            content,
            attachments,
            created_at: Utc::now(),
        };

        let created = self
            .message_repo
            .create(&message)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;

        self.chat_repo
            .set_last_message(chat_id, created.id)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;

        let recipients = chat.participants_except(requester_id);
        let response = hydration::message_response(&*self.user_repo, created)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;
        self.notify_users(&recipients, &ChatEvent::MessageReceived(response.clone()));

        Ok(response)
    }

    async fn list_messages(&self, chat_id: i64) -> Result<Vec<MessageResponse>, MessageError> {
        self.chat_repo
            .find_by_id(chat_id)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?
            .ok_or(MessageError::ChatNotFound)?;

        let messages = self
            .message_repo
            .find_by_chat(chat_id)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;

        hydration::message_responses(&*self.user_repo, messages)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))
    }
}
