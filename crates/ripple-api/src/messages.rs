use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use ripple_types::api::{Claims, MarkReadResponse, SendMessageRequest};
use ripple_types::events::{ChangeEvent, ChangeOp, Table};
use ripple_types::filter::row;
use ripple_types::models::{ConversationView, MessageView, UserSummary};

use crate::auth::AppState;
use crate::views;

/// Inbox: every conversation involving the caller, most recent first. The
/// unread counter comes straight from the conversation row and is never
/// recomputed from message rows here.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let uid = claims.sub.to_string();

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_conversations(&uid))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let conversations: Vec<ConversationView> = rows
        .iter()
        .map(|c| ConversationView {
            id: views::parse_id(&c.id, "conversations"),
            other_user: UserSummary {
                id: views::parse_id(&c.other_user_id, "conversations"),
                name: c.other_name.clone(),
                company_name: c.other_company.clone(),
                avatar_url: c.other_avatar.clone(),
            },
            last_message: c.last_message.as_ref().map(views::message_view),
            unread_count: c.unread_count,
        })
        .collect();

    Ok(Json(conversations))
}

/// All messages between the caller and another user, oldest first. 404 when
/// the other user does not exist; an empty history is an empty list.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let other = other_id.to_string();
    let current = claims.sub.to_string();

    if state
        .db
        .get_user_by_id(&other)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_between(&current, &other))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let messages: Vec<MessageView> = rows.iter().map(views::message_view).collect();
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(receiver_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if receiver_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let receiver = receiver_id.to_string();
    if state
        .db
        .get_user_by_id(&receiver)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let message_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();
    let sender = claims.sub.to_string();
    let content = req.content.trim().to_string();

    state
        .db
        .send_message(
            &message_id.to_string(),
            &conversation_id.to_string(),
            &sender,
            &receiver,
            &content,
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Chat views watching this pair refresh off the messages event; inbox
    // views watching either participant refresh off the conversations event.
    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Messages,
            op: ChangeOp::Insert,
            row: row([
                ("id", message_id.to_string().into()),
                ("sender_id", sender.clone().into()),
                ("receiver_id", receiver.clone().into()),
                ("is_read", false.into()),
            ]),
        })
        .await;
    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Conversations,
            op: ChangeOp::Update,
            row: row([
                ("user1_id", sender.into()),
                ("user2_id", receiver.into()),
            ]),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(MessageView {
            id: message_id,
            sender_id: claims.sub,
            receiver_id,
            content,
            is_read: false,
            created_at: chrono::Utc::now(),
        }),
    ))
}

/// Flip everything the other user sent the caller to read and reset the
/// conversation's unread counter. Messages the caller sent are untouched.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let other = other_id.to_string();
    let current = claims.sub.to_string();

    let updated = state
        .db
        .mark_read(&current, &other)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated > 0 {
        state
            .hub
            .publish(&ChangeEvent {
                table: Table::Messages,
                op: ChangeOp::Update,
                row: row([
                    ("sender_id", other.clone().into()),
                    ("receiver_id", current.clone().into()),
                ]),
            })
            .await;
        state
            .hub
            .publish(&ChangeEvent {
                table: Table::Conversations,
                op: ChangeOp::Update,
                row: row([
                    ("user1_id", other.into()),
                    ("user2_id", current.into()),
                ]),
            })
            .await;
    }

    Ok(Json(MarkReadResponse { updated }))
}
