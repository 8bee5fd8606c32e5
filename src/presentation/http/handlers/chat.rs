//! Chat Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{CreateGroupChatRequest, RenameGroupChatRequest};
use crate::application::dto::response::{ChatResponse, UserProfile};
use crate::application::services::{ChatError, ChatService, ChatServiceImpl};
use crate::infrastructure::repositories::{
    PgChatRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;
use crate::startup::AppState;

/// List the requester's chats
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chats = chat_service
        .list_chats(auth.user_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(chats))
}

/// List users available for a new chat
pub async fn list_available_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let users = chat_service
        .list_available_users(auth.user_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(users))
}

/// Open the direct chat with a peer, creating it on first use
pub async fn create_direct_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(peer_id): Path<String>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let peer_id: i64 = peer_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let outcome = chat_service
        .create_or_get_direct_chat(auth.user_id, peer_id)
        .await
        .map_err(|e| match e {
            ChatError::UserNotFound => AppError::NotFound("User not found".into()),
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(outcome.chat)))
}

/// Create a new group chat
pub async fn create_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateGroupChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    // Validate request
    body.validate().map_err(validation_error)?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chat = chat_service
        .create_group_chat(auth.user_id, &body.name, &body.participants)
        .await
        .map_err(|e| match e {
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok((StatusCode::CREATED, Json(chat)))
}

/// Get group chat by ID
pub async fn get_group_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chat = chat_service
        .get_group_chat(chat_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(chat))
}

/// Rename a group chat
pub async fn rename_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<RenameGroupChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    // Validate request
    body.validate().map_err(validation_error)?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chat = chat_service
        .rename_group_chat(auth.user_id, chat_id, &body.name)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::Forbidden => AppError::Forbidden("Permission denied".into()),
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(chat))
}

/// Add a participant to a group chat
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, participant_id)): Path<(String, String)>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;
    let participant_id: i64 = participant_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chat = chat_service
        .add_participant(auth.user_id, chat_id, participant_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::UserNotFound => AppError::NotFound("User not found".into()),
            ChatError::Forbidden => AppError::Forbidden("Permission denied".into()),
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(chat))
}

/// Remove a participant from a group chat
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, participant_id)): Path<(String, String)>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;
    let participant_id: i64 = participant_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid user ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    let chat = chat_service
        .remove_participant(auth.user_id, chat_id, participant_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::Forbidden => AppError::Forbidden("Permission denied".into()),
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(chat))
}

/// Leave a group chat
pub async fn leave_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    chat_service
        .leave_group_chat(auth.user_id, chat_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::InvalidArgument(msg) => AppError::BadRequest(msg),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a group chat
pub async fn delete_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    chat_service
        .delete_group_chat(auth.user_id, chat_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::Forbidden => AppError::Forbidden("Permission denied".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a direct chat
pub async fn delete_direct_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let chat_id: i64 = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let chat_repo = Arc::new(PgChatRepository::new(state.db.clone()));
    let message_repo = Arc::new(PgMessageRepository::new(state.db.clone()));
    let user_repo = Arc::new(PgUserRepository::new(state.db.clone()));

    let chat_service = ChatServiceImpl::new(
        chat_repo,
        message_repo,
        user_repo,
        state.snowflake.clone(),
        state.gateway.clone(),
        state.storage.clone(),
    );

    chat_service
        .delete_direct_chat(auth.user_id, chat_id)
        .await
        .map_err(|e| match e {
            ChatError::NotFound => AppError::NotFound("Chat not found".into()),
            ChatError::Forbidden => AppError::Forbidden("Permission denied".into()),
            e => AppError::Internal(e.to_string()),
        })?;

    Ok(StatusCode::NO_CONTENT)
}
