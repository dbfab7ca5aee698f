use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

use crate::{
    error::AppResult,
    models::SteamId,
    routes::{AppState, SESSION_STEAM_ID_KEY},
    services::openid::{self, Verification},
    views,
};

/// Landing page: login prompt when signed out, friend picker when signed in.
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Html<String>> {
    let steam_id: Option<SteamId> = session.get(SESSION_STEAM_ID_KEY).await?;

    match steam_id {
        None => Ok(Html(views::login_page())),
        Some(steam_id) => {
            let friends = state.provider.get_friends(&steam_id).await?;
            Ok(Html(views::friends_page(&friends)))
        }
    }
}

/// Sends the browser off to Steam's OpenID endpoint.
pub async fn login(State(state): State<Arc<AppState>>, session: Session) -> AppResult<Response> {
    let steam_id: Option<SteamId> = session.get(SESSION_STEAM_ID_KEY).await?;
    if steam_id.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let url = openid::login_url(&state.openid_url, &state.public_url)?;
    Ok(Redirect::to(&url).into_response())
}

/// OpenID return leg: confirm the assertion with Steam before trusting it.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    match openid::verify_login(&state.http_client, &state.openid_url, &query).await? {
        Verification::Verified(steam_id) => {
            session.insert(SESSION_STEAM_ID_KEY, &steam_id).await?;
            tracing::info!(steam_id = %steam_id, "User signed in");
            Ok(Redirect::to("/").into_response())
        }
        Verification::Rejected => Ok((
            StatusCode::UNAUTHORIZED,
            Html(views::error_notice(
                "Failed to authenticate with Steam. Please try signing in again.",
            )),
        )
            .into_response()),
    }
}

pub async fn logout(session: Session) -> AppResult<Response> {
    session.flush().await?;
    Ok(Redirect::to("/").into_response())
}
