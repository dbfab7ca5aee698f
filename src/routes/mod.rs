use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::services::providers::SteamProvider;

pub mod auth;
pub mod friends;
pub mod games;

/// Session key for the verified steam id of the signed-in user.
pub const SESSION_STEAM_ID_KEY: &str = "steam_id";

/// Session key for the most recently submitted friend selection.
pub const SESSION_SELECTED_FRIENDS_KEY: &str = "selected_friends";

/// Shared application state
pub struct AppState {
    pub provider: Arc<dyn SteamProvider>,
    pub openid_url: String,
    pub public_url: String,
    pub http_client: reqwest::Client,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store).with_secure(false);

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(auth::index))
        .route("/login", get(auth::login))
        .route("/authorize", get(auth::authorize))
        .route("/logout", get(auth::logout))
        .route("/load-friends", get(friends::load_friends))
        .route("/select-games", post(friends::select_games))
        .route("/load-common-games", get(games::load_common_games))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
