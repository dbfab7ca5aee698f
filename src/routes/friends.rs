use axum::{
    extract::State,
    response::Html,
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use crate::{
    error::{AppError, AppResult},
    models::SteamId,
    routes::{AppState, SESSION_SELECTED_FRIENDS_KEY, SESSION_STEAM_ID_KEY},
    views,
};

/// Friend-selection fragment for htmx back-navigation.
pub async fn load_friends(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Html<String>> {
    let steam_id: SteamId = session
        .get(SESSION_STEAM_ID_KEY)
        .await?
        .ok_or_else(|| AppError::Unauthorized("no session".to_string()))?;

    let friends = state.provider.get_friends(&steam_id).await?;
    Ok(Html(views::friends_fragment(&friends)))
}

#[derive(Debug, Deserialize)]
pub struct SelectGamesForm {
    /// Comma-joined steam ids, assembled client-side from the checked friends.
    #[serde(default)]
    pub selected_friends: String,
}

/// Stores the submitted friend selection in the session and swaps in the
/// games shell, which then htmx-loads the aggregation results.
pub async fn select_games(
    session: Session,
    Form(form): Form<SelectGamesForm>,
) -> AppResult<Html<String>> {
    let selected: Vec<SteamId> = form
        .selected_friends
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SteamId::from)
        .collect();

    session
        .insert(SESSION_SELECTED_FRIENDS_KEY, &selected)
        .await?;

    tracing::info!(selected = selected.len(), "Friend selection stored");

    let param = selected
        .iter()
        .map(SteamId::as_str)
        .collect::<Vec<_>>()
        .join(",");

    Ok(Html(views::games_page(&param)))
}
