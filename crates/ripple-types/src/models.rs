use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of a user, embedded wherever a row references its author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Full profile view with derived follow counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub followers_count: i64,
    pub following_count: i64,
    pub followed_by_viewer: bool,
}

/// A post expanded with its author and derived engagement counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A conversation as shown in the inbox list. `unread_count` is read straight
/// from the stored row; it is maintained at message-insert and mark-read time,
/// never recomputed from message rows on the read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub other_user: UserSummary,
    pub last_message: Option<MessageView>,
    pub unread_count: i64,
}
