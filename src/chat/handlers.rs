use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ConversationList, MarkReadResult, MessageInput},
    model::Message,
    service,
};
use crate::{
    auth::{
        claims::Capability,
        extractors::AuthUser,
        guard::{require_auth, require_role, RolePolicy},
    },
    error::{AppError, AppResult},
    response::{self, Envelope},
    state::AppState,
    users::repo_types::User,
};

/// `:id` is the receiver's user id for POST and the conversation id otherwise.
pub fn chat_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_conversations))
        .route("/chats/:id/messages", post(send_message).get(get_messages))
        .route("/chats/:id/read", put(mark_as_read))
        .route_layer(from_fn_with_state(
            RolePolicy::capability(Capability::Chat),
            require_role,
        ))
        .route_layer(from_fn_with_state(state.tokens.clone(), require_auth))
}

fn positive_id(id: i64, field: &'static str) -> AppResult<i64> {
    if id <= 0 {
        return Err(AppError::validation(field, "must be a positive id"));
    }
    Ok(id)
}

#[instrument(skip(state, ctx), fields(user_id = ctx.user_id))]
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> AppResult<Json<Envelope<ConversationList>>> {
    let conversations =
        service::list_conversations_with_stats(state.chats.as_ref(), ctx.user_id).await?;
    Ok(response::ok(
        "Conversations retrieved",
        ConversationList {
            total: conversations.len(),
            conversations,
        },
    ))
}

#[instrument(skip(state, ctx, input), fields(user_id = ctx.user_id))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(receiver_id): Path<i64>,
    Json(input): Json<MessageInput>,
) -> AppResult<Json<Envelope<Message>>> {
    let receiver_id = positive_id(receiver_id, "user_id")?;
    service::check_outgoing(ctx.user_id, receiver_id, &input.content)?;
    if User::find_by_id(&state.db, receiver_id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    let message = service::send(state.chats.as_ref(), ctx.user_id, receiver_id, &input.content).await?;
    Ok(response::ok("Message sent successfully", message))
}

#[instrument(skip(state, ctx), fields(user_id = ctx.user_id))]
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(conversation_id): Path<i64>,
) -> AppResult<Json<Envelope<Vec<Message>>>> {
    let conversation_id = positive_id(conversation_id, "conversation_id")?;
    let messages =
        service::list_by_conversation(state.chats.as_ref(), conversation_id, ctx.user_id).await?;
    Ok(response::ok("Messages retrieved successfully", messages))
}

#[instrument(skip(state, ctx), fields(user_id = ctx.user_id))]
pub async fn mark_as_read(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(conversation_id): Path<i64>,
) -> AppResult<Json<Envelope<MarkReadResult>>> {
    let conversation_id = positive_id(conversation_id, "conversation_id")?;
    let updated = service::mark_read(state.chats.as_ref(), conversation_id, ctx.user_id).await?;
    Ok(response::ok("Messages marked as read", MarkReadResult { updated }))
}
