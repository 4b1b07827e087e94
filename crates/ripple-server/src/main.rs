use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use ripple_api::auth::{self, AppState, AppStateInner};
use ripple_api::middleware::require_auth;
use ripple_api::storage::AvatarStore;
use ripple_api::{messages, posts, storage, support, users};
use ripple_gateway::ChangeHub;
use ripple_gateway::connection;

#[derive(Clone)]
struct ServerState {
    hub: ChangeHub,
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripple=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("RIPPLE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("RIPPLE_DB_PATH").unwrap_or_else(|_| "ripple.db".into());
    let avatar_dir = std::env::var("RIPPLE_AVATAR_DIR").unwrap_or_else(|_| "avatars".into());
    let host = std::env::var("RIPPLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("RIPPLE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and avatar storage
    let db = ripple_db::Database::open(&PathBuf::from(&db_path))?;
    let avatars = AvatarStore::new(PathBuf::from(&avatar_dir)).await?;
    let avatar_dir = avatars.dir().clone();

    // Shared state
    let hub = ChangeHub::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        hub: hub.clone(),
        jwt_secret: jwt_secret.clone(),
        avatars,
    });

    let server_state = ServerState {
        hub,
        jwt_secret,
    };

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/me", patch(users::update_profile))
        .route("/users/me/avatar", post(storage::upload_avatar))
        .route("/users/search", get(users::search))
        .route("/users/{user_id}", get(users::get_profile))
        .route("/users/{user_id}/follow", post(users::toggle_follow))
        .route("/users/{user_id}/followers", get(users::list_followers))
        .route("/users/{user_id}/following", get(users::list_following))
        .route("/users/{user_id}/posts", get(posts::list_user_posts))
        .route("/posts", get(posts::list_feed))
        .route("/posts", post(posts::create_post))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/like", post(posts::toggle_like))
        .route("/posts/{post_id}/comments", get(posts::list_comments))
        .route("/posts/{post_id}/comments", post(posts::create_comment))
        .route("/conversations", get(messages::list_conversations))
        .route("/messages/{user_id}", get(messages::get_messages))
        .route("/messages/{user_id}", post(messages::send_message))
        .route("/messages/{user_id}/read", post(messages::mark_read))
        .route("/support/greeting", get(support::greeting))
        .route("/support/messages", post(support::respond))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(server_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .nest_service("/avatars", ServeDir::new(avatar_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Ripple server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.hub, state.jwt_secret))
}
