use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared across ripple-api (REST middleware) and ripple-gateway
/// (WebSocket authentication). Canonical definition lives here in ripple-types
/// to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Outcome of a like/follow toggle. `active` is the membership state after
/// the toggle (true = liked / following).
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub active: bool,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    /// Number of message rows flipped to read.
    pub updated: usize,
}

// -- Support bot --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupportMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SupportReply {
    pub reply: String,
}

// -- Avatars --

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}
