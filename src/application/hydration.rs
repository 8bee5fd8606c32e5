//! Response hydration
//!
//! Expands raw chat and message rows into the typed response models.
//! Lookups are batched per call so listing N chats costs one message
//! fetch and one user fetch, not 2N. Users that no longer exist are
//! dropped from participant lists and leave `sender` unset.

use std::collections::{HashMap, HashSet};

use crate::application::dto::{ChatResponse, MessageResponse, UserProfile};
use crate::domain::{Chat, Message, MessageRepository, UserRepository};
use crate::shared::error::AppError;

/// Hydrate a batch of chats into full responses.
pub async fn chat_responses<U, M>(
    user_repository: &U,
    message_repository: &M,
    chats: Vec<Chat>,
) -> Result<Vec<ChatResponse>, AppError>
where
    U: UserRepository,
    M: MessageRepository,
{
    let message_ids: Vec<i64> = chats.iter().filter_map(|chat| chat.last_message_id).collect();
    let messages = if message_ids.is_empty() {
        Vec::new()
    } else {
        message_repository.find_by_ids(&message_ids).await?
    };
    let mut messages_by_id: HashMap<i64, Message> =
        messages.into_iter().map(|message| (message.id, message)).collect();

    let mut user_ids: HashSet<i64> = chats
        .iter()
        .flat_map(|chat| chat.participant_ids.iter().copied())
        .collect();
    user_ids.extend(messages_by_id.values().map(|message| message.sender_id));

    let profiles = load_profiles(user_repository, user_ids).await?;

    let mut responses = Vec::with_capacity(chats.len());
    for chat in chats {
        let participants = chat
            .participant_ids
            .iter()
            .filter_map(|id| profiles.get(id).cloned())
            .collect();
        let last_message = chat
            .last_message_id
            .and_then(|id| messages_by_id.remove(&id))
            .map(|message| {
                let sender = profiles.get(&message.sender_id).cloned();
                MessageResponse::from_message(message, sender)
            });
        responses.push(ChatResponse::from_parts(chat, participants, last_message));
    }
    Ok(responses)
}

/// Hydrate a single chat.
pub async fn chat_response<U, M>(
    user_repository: &U,
    message_repository: &M,
    chat: Chat,
) -> Result<ChatResponse, AppError>
where
    U: UserRepository,
    M: MessageRepository,
{
    let mut responses = chat_responses(user_repository, message_repository, vec![chat]).await?;
    responses
        .pop()
        .ok_or_else(|| AppError::Internal("chat hydration yielded no response".to_string()))
}

/// Hydrate a batch of messages, resolving each sender once.
pub async fn message_responses<U>(
    user_repository: &U,
    messages: Vec<Message>,
) -> Result<Vec<MessageResponse>, AppError>
where
    U: UserRepository,
{
    let user_ids: HashSet<i64> = messages.iter().map(|message| message.sender_id).collect();
    let profiles = load_profiles(user_repository, user_ids).await?;

    Ok(messages
        .into_iter()
        .map(|message| {
            let sender = profiles.get(&message.sender_id).cloned();
            MessageResponse::from_message(message, sender)
        })
        .collect())
}

/// Hydrate a single message.
pub async fn message_response<U>(
    user_repository: &U,
    message: Message,
) -> Result<MessageResponse, AppError>
where
    U: UserRepository,
{
    let sender = user_repository
        .find_by_id(message.sender_id)
        .await?
        .map(UserProfile::from);
    Ok(MessageResponse::from_message(message, sender))
}

async fn load_profiles<U>(
    user_repository: &U,
    user_ids: HashSet<i64>,
) -> Result<HashMap<i64, UserProfile>, AppError>
where
    U: UserRepository,
{
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<i64> = user_ids.into_iter().collect();
    let users = user_repository.find_by_ids(&ids).await?;
    Ok(users
        .into_iter()
        .map(|user| (user.id, UserProfile::from(user)))
        .collect())
}
