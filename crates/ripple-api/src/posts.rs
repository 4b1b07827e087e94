use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use ripple_types::api::{Claims, CreateCommentRequest, CreatePostRequest, ToggleResponse};
use ripple_types::events::{ChangeEvent, ChangeOp, Table};
use ripple_types::filter::row;
use ripple_types::models::{CommentView, PostView};

use crate::auth::AppState;
use crate::views;

/// Feed: every post, newest first, expanded with author and engagement
/// counts. Counts are computed per post at read time and default to zero.
pub async fn list_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer_id = claims.sub.to_string();

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let posts = tokio::task::spawn_blocking(move || build_post_views(&db, None, &viewer_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(posts))
}

/// Posts by a single user, for profile pages.
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let viewer_id = claims.sub.to_string();
    let author_id = user_id.to_string();

    let db = state.clone();
    let posts =
        tokio::task::spawn_blocking(move || build_post_views(&db, Some(&author_id), &viewer_id))
            .await
            .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let pid = post_id.to_string();

    let post = state
        .db
        .get_post(&pid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let likes = state.db.likes_count(&pid).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let comments = state.db.comments_count(&pid).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let liked = state
        .db
        .liked_by_user(&pid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(views::post_view(&post, likes, comments, liked)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Fetch the author row so the immediate response carries the same
    // company/avatar fields a refetch would.
    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let post_id = Uuid::new_v4();

    state
        .db
        .create_post(
            &post_id.to_string(),
            &claims.sub.to_string(),
            req.content.trim(),
            req.image_url.as_deref(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Posts,
            op: ChangeOp::Insert,
            row: row([
                ("id", post_id.to_string().into()),
                ("user_id", claims.sub.to_string().into()),
            ]),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(PostView {
            id: post_id,
            author: views::user_summary(&author),
            content: req.content.trim().to_string(),
            image_url: req.image_url,
            created_at: chrono::Utc::now(),
            likes_count: 0,
            comments_count: 0,
            liked_by_viewer: false,
        }),
    ))
}

/// Like toggle: absent -> present (insert) or present -> absent (delete).
/// The store treats a duplicate insert as already-liked, so a double click
/// cannot push the count past one.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let pid = post_id.to_string();

    if state
        .db
        .get_post(&pid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let like_id = Uuid::new_v4();
    let active = state
        .db
        .toggle_like(&like_id.to_string(), &pid, &claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Likes,
            op: if active { ChangeOp::Insert } else { ChangeOp::Delete },
            row: row([
                ("post_id", pid.clone().into()),
                ("user_id", claims.sub.to_string().into()),
            ]),
        })
        .await;

    Ok(Json(ToggleResponse { active }))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_comments(&post_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let comments: Vec<CommentView> = rows.iter().map(views::comment_view).collect();
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let pid = post_id.to_string();
    if state
        .db
        .get_post(&pid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let comment_id = Uuid::new_v4();
    state
        .db
        .create_comment(
            &comment_id.to_string(),
            &pid,
            &claims.sub.to_string(),
            req.content.trim(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Comments,
            op: ChangeOp::Insert,
            row: row([
                ("id", comment_id.to_string().into()),
                ("post_id", pid.into()),
                ("user_id", claims.sub.to_string().into()),
            ]),
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CommentView {
            id: comment_id,
            post_id,
            author: views::user_summary(&author),
            content: req.content.trim().to_string(),
            created_at: chrono::Utc::now(),
        }),
    ))
}

fn build_post_views(
    state: &AppState,
    author_id: Option<&str>,
    viewer_id: &str,
) -> anyhow::Result<Vec<PostView>> {
    let rows = match author_id {
        Some(uid) => state.db.list_posts_by_user(uid)?,
        None => state.db.list_posts()?,
    };

    let mut posts = Vec::with_capacity(rows.len());
    for post in &rows {
        let likes = state.db.likes_count(&post.id)?;
        let comments = state.db.comments_count(&post.id)?;
        let liked = state.db.liked_by_user(&post.id, viewer_id)?;
        posts.push(views::post_view(post, likes, comments, liked));
    }

    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ripple_db::Database;
    use ripple_gateway::ChangeHub;

    use crate::auth::AppStateInner;
    use crate::storage::AvatarStore;

    async fn test_state() -> AppState {
        let dir = std::env::temp_dir().join(format!("ripple-test-{}", Uuid::new_v4()));
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            hub: ChangeHub::new(),
            jwt_secret: "test-secret".into(),
            avatars: AvatarStore::new(dir).await.unwrap(),
        })
    }

    fn claims_for(user_id: Uuid, name: &str) -> Claims {
        Claims {
            sub: user_id,
            name: name.to_string(),
            exp: usize::MAX,
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_post_and_comment_carry_full_author_profile() {
        let state = test_state().await;
        let user_id = Uuid::new_v4();
        state
            .db
            .create_user(&user_id.to_string(), "ana@exemplo.com", "Ana", Some("Acme"), "hash")
            .unwrap();
        state
            .db
            .set_avatar_url(&user_id.to_string(), "/avatars/ana.png")
            .unwrap();

        let response = create_post(
            State(state.clone()),
            Extension(claims_for(user_id, "Ana")),
            Json(CreatePostRequest {
                content: "primeiro".into(),
                image_url: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        // The immediate response matches what a refetch would return
        let post: PostView = body_json(response).await;
        assert_eq!(post.author.name, "Ana");
        assert_eq!(post.author.company_name.as_deref(), Some("Acme"));
        assert_eq!(post.author.avatar_url.as_deref(), Some("/avatars/ana.png"));

        let response = create_comment(
            State(state.clone()),
            Path(post.id),
            Extension(claims_for(user_id, "Ana")),
            Json(CreateCommentRequest {
                content: "legal".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let comment: CommentView = body_json(response).await;
        assert_eq!(comment.author.company_name.as_deref(), Some("Acme"));
        assert_eq!(comment.author.avatar_url.as_deref(), Some("/avatars/ana.png"));
    }
}
