/// Steam data provider abstraction
///
/// The aggregation core and the route handlers only ever see this trait, so
/// tests can substitute a mock and the Steam Web API client stays swappable.
use crate::{
    error::AppResult,
    models::{GameRecord, PlayerSummary, SteamId},
};

pub mod steam;

/// Per-user lookups against the friends/owned-games data provider.
///
/// Implementations are expected to tolerate concurrent calls; a single
/// aggregation fans out one lookup pair per participant.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SteamProvider: Send + Sync {
    /// Resolve a user's public profile (persona name, avatar).
    ///
    /// Fails with `NotFound` for unknown ids and `ServiceUnavailable` when
    /// the upstream cannot be reached.
    async fn get_player_summary(&self, steam_id: &SteamId) -> AppResult<PlayerSummary>;

    /// Resolve a user's friend list, expanded to full profile summaries.
    ///
    /// Fails with `PrivateProfile` when the friend list is access-restricted;
    /// a public but empty friend list is `Ok(vec![])`.
    async fn get_friends(&self, steam_id: &SteamId) -> AppResult<Vec<PlayerSummary>>;

    /// Resolve the set of games a user owns.
    ///
    /// Fails with `PrivateProfile` when the game library is hidden. An empty
    /// library is `Ok(vec![])`, not an error.
    async fn get_owned_games(&self, steam_id: &SteamId) -> AppResult<Vec<GameRecord>>;

    /// Drop any cached data held for the user.
    ///
    /// Invoked when a `PrivateProfile` is detected for the requesting user,
    /// so a retry after they fix their settings succeeds promptly.
    async fn invalidate(&self, steam_id: &SteamId) -> AppResult<()>;
}
