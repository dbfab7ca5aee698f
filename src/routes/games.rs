use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use crate::{
    error::{AppError, AppResult},
    models::SteamId,
    routes::{AppState, SESSION_SELECTED_FRIENDS_KEY, SESSION_STEAM_ID_KEY},
    services::{aggregation, share},
    views,
};

#[derive(Debug, Deserialize)]
pub struct LoadCommonGamesQuery {
    /// Comma-separated friend steam ids.
    pub friend_ids: Option<String>,
    /// Opaque share token carrying a full participant list; bypasses the
    /// session requirement.
    pub share_data: Option<String>,
}

/// Computes and renders the ranked common-games list.
///
/// The participant set is the signed-in user plus the listed friends, or —
/// for shared links — exactly the list recovered from the token. With a
/// share token there is no authenticated requester, so no participant gets
/// the primary user's strict error handling.
pub async fn load_common_games(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<LoadCommonGamesQuery>,
) -> AppResult<Html<String>> {
    let (participants, primary) = match &params.share_data {
        Some(token) => (share::decode_share_token(token)?, None),
        None => {
            let primary: SteamId = session
                .get(SESSION_STEAM_ID_KEY)
                .await?
                .ok_or_else(|| AppError::Unauthorized("no session".to_string()))?;

            let mut participants = vec![primary.clone()];
            match &params.friend_ids {
                Some(listed) => participants.extend(
                    listed
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(SteamId::from),
                ),
                // Fall back to the selection stored by /select-games.
                None => {
                    let stored: Option<Vec<SteamId>> =
                        session.get(SESSION_SELECTED_FRIENDS_KEY).await?;
                    participants.extend(stored.unwrap_or_default());
                }
            }

            (participants, Some(primary))
        }
    };

    let report =
        aggregation::compute_common_games(state.provider.clone(), &participants, primary.as_ref())
            .await?;

    let share_token = share::encode_share_token(&participants)?;

    Ok(Html(views::common_games_list(&report, &share_token)))
}
