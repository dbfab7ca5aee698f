/// Steam Web API provider
///
/// Endpoints used:
/// - ISteamUser/GetPlayerSummaries/v0002/  → persona names and avatars
/// - ISteamUser/GetFriendList/v0001/       → friend steam ids
/// - IPlayerService/GetOwnedGames/v0001/   → owned-game catalogs
///
/// All three are cached in Redis per user. Steam reports a private game
/// library as a 200 with an empty `response` object, so that case is decoded
/// after the cache layer and mapped to `PrivateProfile`.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CachedOwnedGames, FriendListEnvelope, GameRecord, OwnedGamesBody, OwnedGamesEnvelope,
        PlayerSummariesEnvelope, PlayerSummary, SteamId,
    },
    services::providers::SteamProvider,
};
use chrono::Utc;
use reqwest::{Client as HttpClient, StatusCode};

const SUMMARY_CACHE_TTL: u64 = 900; // 15 minutes
const FRIENDS_CACHE_TTL: u64 = 900; // 15 minutes
const OWNED_CACHE_TTL: u64 = 300; // 5 minutes

/// GetPlayerSummaries accepts at most 100 ids per call.
const SUMMARY_BATCH_SIZE: usize = 100;

#[derive(Clone)]
pub struct SteamWebApiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl SteamWebApiProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    /// Maps a non-success Steam response to the error taxonomy.
    ///
    /// Steam answers 401/403 when the requested data is access-restricted;
    /// anything else is treated as the service being unavailable.
    fn status_error(status: StatusCode, body: String) -> AppError {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            AppError::PrivateProfile
        } else {
            AppError::ServiceUnavailable(format!("Steam returned status {}: {}", status, body))
        }
    }

    async fn fetch_summaries_chunk(&self, steam_ids: &[SteamId]) -> AppResult<Vec<PlayerSummary>> {
        let url = format!("{}/ISteamUser/GetPlayerSummaries/v0002/", self.api_url);
        let ids = steam_ids
            .iter()
            .map(SteamId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .http_client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("steamids", ids.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let envelope: PlayerSummariesEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

        Ok(envelope.response.players)
    }
}

/// Decodes the owned-games body, distinguishing "private" from "owns nothing".
fn interpret_owned_games(body: OwnedGamesBody) -> AppResult<Vec<GameRecord>> {
    match body.games {
        Some(games) => Ok(games),
        // game_count present without a games array means an empty library
        None if body.game_count.is_some() => Ok(Vec::new()),
        None => Err(AppError::PrivateProfile),
    }
}

/// Extracts friend ids, mapping the private-profile shape to an error.
fn interpret_friend_list(envelope: FriendListEnvelope) -> AppResult<Vec<SteamId>> {
    match envelope.friendslist {
        Some(body) => Ok(body.friends.into_iter().map(|f| f.steamid).collect()),
        None if envelope.error.is_some() => Err(AppError::PrivateProfile),
        // Absent without an error body: user simply has no visible friends
        None => Ok(Vec::new()),
    }
}

#[async_trait::async_trait]
impl SteamProvider for SteamWebApiProvider {
    async fn get_player_summary(&self, steam_id: &SteamId) -> AppResult<PlayerSummary> {
        cached!(
            self.cache,
            CacheKey::PlayerSummary(steam_id.clone()),
            SUMMARY_CACHE_TTL,
            async move {
                let players = self
                    .fetch_summaries_chunk(std::slice::from_ref(steam_id))
                    .await?;

                players.into_iter().next().ok_or_else(|| {
                    AppError::NotFound(format!("No Steam profile for id {}", steam_id))
                })
            }
        )
    }

    async fn get_friends(&self, steam_id: &SteamId) -> AppResult<Vec<PlayerSummary>> {
        cached!(
            self.cache,
            CacheKey::FriendList(steam_id.clone()),
            FRIENDS_CACHE_TTL,
            async move {
                let url = format!("{}/ISteamUser/GetFriendList/v0001/", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("key", self.api_key.as_str()),
                        ("steamid", steam_id.as_str()),
                        ("relationship", "friend"),
                    ])
                    .send()
                    .await
                    .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::status_error(status, body));
                }

                let envelope: FriendListEnvelope = response
                    .json()
                    .await
                    .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

                let friend_ids = interpret_friend_list(envelope)?;

                let mut friends = Vec::with_capacity(friend_ids.len());
                for chunk in friend_ids.chunks(SUMMARY_BATCH_SIZE) {
                    friends.extend(self.fetch_summaries_chunk(chunk).await?);
                }

                tracing::info!(
                    steam_id = %steam_id,
                    friends = friends.len(),
                    "Friend list fetched"
                );

                Ok(friends)
            }
        )
    }

    async fn get_owned_games(&self, steam_id: &SteamId) -> AppResult<Vec<GameRecord>> {
        let payload: CachedOwnedGames = cached!(
            self.cache,
            CacheKey::OwnedGames(steam_id.clone()),
            OWNED_CACHE_TTL,
            async move {
                let url = format!("{}/IPlayerService/GetOwnedGames/v0001/", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("key", self.api_key.as_str()),
                        ("steamid", steam_id.as_str()),
                        ("include_appinfo", "true"),
                        ("include_played_free_games", "true"),
                    ])
                    .send()
                    .await
                    .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::status_error(status, body));
                }

                let envelope: OwnedGamesEnvelope = response
                    .json()
                    .await
                    .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

                tracing::debug!(
                    steam_id = %steam_id,
                    game_count = ?envelope.response.game_count,
                    "Owned games fetched"
                );

                // The raw body is cached, private shape included, so the
                // interpretation below stays consistent across cache hits.
                Ok(CachedOwnedGames {
                    body: envelope.response,
                    cached_at: Utc::now(),
                })
            }
        )?;

        interpret_owned_games(payload.body)
    }

    async fn invalidate(&self, steam_id: &SteamId) -> AppResult<()> {
        self.cache.invalidate_user(steam_id).await
    }
}
