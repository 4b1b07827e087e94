//! Conversions from DB rows to API views. SQLite stores ids and timestamps
//! as text; corrupt values are logged and defaulted rather than failing the
//! whole response, matching how list endpoints degrade.

use tracing::warn;
use uuid::Uuid;

use ripple_db::models::{CommentRow, MessageRow, PostRow, UserRow};
use ripple_types::models::{CommentView, MessageView, PostView, UserSummary};

pub(crate) fn parse_id(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' in {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(raw: &str, context: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' in {}: {}", raw, context, e);
            chrono::DateTime::default()
        })
}

pub(crate) fn user_summary(row: &UserRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.id, "users"),
        name: row.name.clone(),
        company_name: row.company_name.clone(),
        avatar_url: row.avatar_url.clone(),
    }
}

pub(crate) fn message_view(row: &MessageRow) -> MessageView {
    MessageView {
        id: parse_id(&row.id, "messages"),
        sender_id: parse_id(&row.sender_id, "messages"),
        receiver_id: parse_id(&row.receiver_id, "messages"),
        content: row.content.clone(),
        is_read: row.is_read,
        created_at: parse_ts(&row.created_at, "messages"),
    }
}

pub(crate) fn post_view(
    row: &PostRow,
    likes_count: i64,
    comments_count: i64,
    liked_by_viewer: bool,
) -> PostView {
    PostView {
        id: parse_id(&row.id, "posts"),
        author: UserSummary {
            id: parse_id(&row.user_id, "posts"),
            name: row.author_name.clone(),
            company_name: row.author_company.clone(),
            avatar_url: row.author_avatar.clone(),
        },
        content: row.content.clone(),
        image_url: row.image_url.clone(),
        created_at: parse_ts(&row.created_at, "posts"),
        likes_count,
        comments_count,
        liked_by_viewer,
    }
}

pub(crate) fn comment_view(row: &CommentRow) -> CommentView {
    CommentView {
        id: parse_id(&row.id, "comments"),
        post_id: parse_id(&row.post_id, "comments"),
        author: UserSummary {
            id: parse_id(&row.user_id, "comments"),
            name: row.author_name.clone(),
            company_name: row.author_company.clone(),
            avatar_url: row.author_avatar.clone(),
        },
        content: row.content.clone(),
        created_at: parse_ts(&row.created_at, "comments"),
    }
}
