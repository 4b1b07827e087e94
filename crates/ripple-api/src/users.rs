use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_db::models::UserRow;
use ripple_types::api::{Claims, SearchQuery, ToggleResponse, UpdateProfileRequest};
use ripple_types::events::{ChangeEvent, ChangeOp, Table};
use ripple_types::filter::row;
use ripple_types::models::{Profile, UserSummary};

use crate::auth::AppState;
use crate::views;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    build_profile(&state, claims.sub, claims.sub).map(Json)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    build_profile(&state, user_id, claims.sub).map(Json)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.name.trim().is_empty() || req.name.len() > 64 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let uid = claims.sub.to_string();
    let updated = state
        .db
        .update_profile(
            &uid,
            req.name.trim(),
            req.company_name.as_deref(),
            req.avatar_url.as_deref(),
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if updated == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Users,
            op: ChangeOp::Update,
            row: row([("id", uid.into())]),
        })
        .await;

    build_profile(&state, claims.sub, claims.sub).map(Json)
}

/// User search. An empty or whitespace query returns an empty list without
/// touching the store.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    if query.q.trim().is_empty() {
        return Ok(Json(Vec::<UserSummary>::new()));
    }

    let rows = state
        .db
        .search_users(query.q.trim(), 10)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(summaries(&rows)))
}

/// Follow toggle. Following yourself is rejected outright.
pub async fn toggle_follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if user_id == claims.sub {
        return Err(StatusCode::BAD_REQUEST);
    }

    let target = user_id.to_string();
    if state
        .db
        .get_user_by_id(&target)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_none()
    {
        return Err(StatusCode::NOT_FOUND);
    }

    let edge_id = Uuid::new_v4();
    let active = state
        .db
        .toggle_follow(&edge_id.to_string(), &claims.sub.to_string(), &target)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Followers,
            op: if active { ChangeOp::Insert } else { ChangeOp::Delete },
            row: row([
                ("follower_id", claims.sub.to_string().into()),
                ("following_id", target.into()),
            ]),
        })
        .await;

    Ok(Json(ToggleResponse { active }))
}

pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_followers(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(summaries(&rows)))
}

pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let rows = state
        .db
        .list_following(&user_id.to_string())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(summaries(&rows)))
}

fn summaries(rows: &[UserRow]) -> Vec<UserSummary> {
    rows.iter().map(views::user_summary).collect()
}

fn build_profile(state: &AppState, user_id: Uuid, viewer_id: Uuid) -> Result<Profile, StatusCode> {
    let uid = user_id.to_string();

    let user = state
        .db
        .get_user_by_id(&uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let followers_count = state
        .db
        .followers_count(&uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let following_count = state
        .db
        .following_count(&uid)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let followed_by_viewer = if viewer_id == user_id {
        false
    } else {
        state
            .db
            .is_following(&viewer_id.to_string(), &uid)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    };

    Ok(Profile {
        id: user_id,
        email: user.email,
        name: user.name,
        company_name: user.company_name,
        avatar_url: user.avatar_url,
        created_at: views::parse_ts(&user.created_at, "users"),
        followers_count,
        following_count,
        followed_by_viewer,
    })
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

    #[tokio::test]
    async fn whitespace_search_short_circuits_without_store_query() {
        let state = test_state().await;
        // An empty needle reaching the store would render LIKE '%%' and
        // match this row; the handler must return [] before that happens.
        state
            .db
            .create_user("u1", "ana@exemplo.com", "Ana", None, "hash")
            .unwrap();

        for q in ["", "   ", "\t"] {
            let response = search(State(state.clone()), Query(SearchQuery { q: q.into() }))
                .await
                .unwrap()
                .into_response();
            assert_eq!(response.status(), StatusCode::OK);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(body.as_ref(), b"[]");
        }
    }
}
