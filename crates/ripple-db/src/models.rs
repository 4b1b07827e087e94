//! Database row types mapping directly to SQLite rows. Distinct from the
//! ripple-types API models so the storage layer stays independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub password: String,
    pub created_at: String,
}

/// A post joined with its author, as returned by feed queries.
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub author_company: Option<String>,
    pub author_avatar: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author_name: String,
    pub author_company: Option<String>,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

/// A conversation joined with the other participant and the last message.
pub struct ConversationRow {
    pub id: String,
    pub other_user_id: String,
    pub other_name: String,
    pub other_company: Option<String>,
    pub other_avatar: Option<String>,
    pub last_message: Option<MessageRow>,
    pub unread_count: i64,
}
