use std::path::PathBuf;

use anyhow::{Result, bail};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use ripple_types::api::{AvatarResponse, Claims};
use ripple_types::events::{ChangeEvent, ChangeOp, Table};
use ripple_types::filter::row;

use crate::auth::AppState;

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Maximum avatar size: 2 MiB.
const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// On-disk avatar storage. Files land flat under `{dir}/{user_id}-{nonce}.{ext}`
/// and are served back under the `/avatars/` public path.
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Avatar storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Store uploaded bytes and return the public URL path.
    pub async fn save(&self, user_id: Uuid, ext: &str, data: &[u8]) -> Result<String> {
        let ext = ext.to_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            bail!("Unsupported avatar extension: {}", ext);
        }

        // Random nonce so a re-upload never collides with a cached old file
        let file_name = format!("{}-{}.{}", user_id, Uuid::new_v4(), ext);
        let path = self.dir.join(&file_name);
        fs::write(&path, data).await?;

        Ok(public_url(&file_name))
    }
}

pub fn public_url(file_name: &str) -> String {
    format!("/avatars/{file_name}")
}

#[derive(Debug, Deserialize)]
pub struct AvatarQuery {
    pub ext: String,
}

pub async fn upload_avatar(
    State(state): State<AppState>,
    Query(query): Query<AvatarQuery>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, StatusCode> {
    if body.is_empty() || body.len() > MAX_AVATAR_BYTES {
        return Err(StatusCode::BAD_REQUEST);
    }

    let avatar_url = state
        .avatars
        .save(claims.sub, &query.ext, &body)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    state
        .db
        .set_avatar_url(&claims.sub.to_string(), &avatar_url)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    state
        .hub
        .publish(&ChangeEvent {
            table: Table::Users,
            op: ChangeOp::Update,
            row: row([("id", claims.sub.to_string().into())]),
        })
        .await;

    Ok((StatusCode::CREATED, Json(AvatarResponse { avatar_url })))
}
