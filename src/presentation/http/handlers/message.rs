//! Message Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::response::MessageResponse;
use crate::application::services::{
    MessageError, MessageService, MessageServiceImpl, UploadedFile,
};
use crate::infrastructure::repositories::{
    PgChatRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Maximum number of attachments per message
pub const MAX_ATTACHMENTS: usize = 5;

/// Get messages from a chat, newest first
pub async fn get_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let message_service = MessageServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let messages = message_service
        .list_messages(chat_id)
        .await
        .map_err(|e| match e {
            MessageError::ChatNotFound => AppError::NotFound("Chat not found".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(messages))
}

/// Send a message to a chat
///
/// Accepts a multipart body with a `content` text field and up to
/// [`MAX_ATTACHMENTS`] file fields.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let mut content = String::new();
    let mut uploads: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if let Some(file_name) = field.file_name().map(ToString::to_string) {
            if uploads.len() >= MAX_ATTACHMENTS {
                return Err(AppError::BadRequest(format!(
                    "A message can carry at most {} attachments",
                    MAX_ATTACHMENTS
                )));
            }

            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read attachment: {}", e)))?;
            if bytes.len() > state.settings.storage.max_file_size {
                return Err(AppError::BadRequest(format!(
                    "Attachment '{}' exceeds the size limit",
                    file_name
                )));
            }

            uploads.push(UploadedFile {
                file_name,
                bytes: bytes.to_vec(),
            });
        } else if field.name() == Some("content") {
            content = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Malformed content field: {}", e)))?;
        }
    }

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let message_service = MessageServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let message = message_service
        .send_message(auth.user_id, chat_id, content, uploads)
        .await
        .map_err(|e| match e {
            MessageError::ChatNotFound => AppError::NotFound("Chat not found".into()),
            MessageError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok((StatusCode::CREATED, Json(message)))
}
