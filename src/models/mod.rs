use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A 64-bit Steam account identifier, kept as an opaque string.
///
/// Steam ids overflow JavaScript numbers and are never used arithmetically,
/// so string form is the safe representation everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteamId(pub String);

impl SteamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SteamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SteamId {
    fn from(s: &str) -> Self {
        SteamId(s.to_string())
    }
}

impl From<String> for SteamId {
    fn from(s: String) -> Self {
        SteamId(s)
    }
}

/// Steam application (game) identifier.
pub type AppId = u64;

/// Descriptive data for one owned game, as returned by GetOwnedGames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub appid: AppId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub img_icon_url: Option<String>,
}

impl GameRecord {
    /// Display name, falling back when Steam omits app info.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Game")
    }

    /// Community CDN URL for the game icon, when one exists.
    pub fn icon_url(&self) -> Option<String> {
        self.img_icon_url.as_ref().map(|hash| {
            format!(
                "https://media.steampowered.com/steamcommunity/public/images/apps/{}/{}.jpg",
                self.appid, hash
            )
        })
    }
}

/// Public profile data for one Steam user, from GetPlayerSummaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub steamid: SteamId,
    pub personaname: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// One qualifying game in an aggregation result.
///
/// Invariants: `owner_count == owner_names.len()` and `owner_count` meets the
/// quorum threshold computed for the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonGame {
    pub game: GameRecord,
    pub owner_count: usize,
    pub owner_names: Vec<String>,
}

/// Ranked aggregation output, plus the group size the view needs for
/// "N/M own this" badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonGamesReport {
    pub games: Vec<CommonGame>,
    pub total_users: usize,
}

// ============================================================================
// Steam Web API wire types
// ============================================================================

/// Envelope of GET /ISteamUser/GetPlayerSummaries/v0002/
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSummariesEnvelope {
    pub response: PlayerSummariesBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSummariesBody {
    #[serde(default)]
    pub players: Vec<PlayerSummary>,
}

/// Envelope of GET /ISteamUser/GetFriendList/v0001/
///
/// `friendslist` is absent entirely when the profile's friend list is not
/// public; the body may instead carry an `error` message.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendListEnvelope {
    #[serde(default)]
    pub friendslist: Option<FriendListBody>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendListBody {
    #[serde(default)]
    pub friends: Vec<FriendEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FriendEntry {
    pub steamid: SteamId,
}

/// Envelope of GET /IPlayerService/GetOwnedGames/v0001/
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGamesEnvelope {
    pub response: OwnedGamesBody,
}

/// Body of the owned-games response.
///
/// Steam signals a private game library with a 200 whose `response` object is
/// empty: neither `game_count` nor `games` present. An account that owns
/// nothing still gets `game_count: 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedGamesBody {
    #[serde(default)]
    pub game_count: Option<u32>,
    #[serde(default)]
    pub games: Option<Vec<GameRecord>>,
}

/// Owned-games payload as stored in the cache, stamped for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedOwnedGames {
    pub body: OwnedGamesBody,
    pub cached_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steam_id_display_and_serde() {
        let id = SteamId::from("76561198000000001");
        assert_eq!(format!("{}", id), "76561198000000001");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""76561198000000001""#);
        let back: SteamId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_game_record_icon_url() {
        let game = GameRecord {
            appid: 570,
            name: Some("Dota 2".to_string()),
            img_icon_url: Some("0bbb630d63262dd66d2fdd0f7d37e8661a410075".to_string()),
        };
        assert_eq!(
            game.icon_url().unwrap(),
            "https://media.steampowered.com/steamcommunity/public/images/apps/570/0bbb630d63262dd66d2fdd0f7d37e8661a410075.jpg"
        );

        let bare = GameRecord {
            appid: 570,
            name: None,
            img_icon_url: None,
        };
        assert_eq!(bare.icon_url(), None);
        assert_eq!(bare.display_name(), "Unknown Game");
    }

    #[test]
    fn test_owned_games_private_signature() {
        // Private profile: empty response object
        let private: OwnedGamesEnvelope = serde_json::from_str(r#"{"response":{}}"#).unwrap();
        assert!(private.response.game_count.is_none());
        assert!(private.response.games.is_none());

        // Public but empty library: game_count present
        let empty: OwnedGamesEnvelope =
            serde_json::from_str(r#"{"response":{"game_count":0}}"#).unwrap();
        assert_eq!(empty.response.game_count, Some(0));
    }

    #[test]
    fn test_owned_games_deserialization() {
        let json = r#"{
            "response": {
                "game_count": 2,
                "games": [
                    {"appid": 570, "name": "Dota 2", "img_icon_url": "abc", "playtime_forever": 100},
                    {"appid": 730, "name": "Counter-Strike 2", "img_icon_url": "def"}
                ]
            }
        }"#;

        let envelope: OwnedGamesEnvelope = serde_json::from_str(json).unwrap();
        let games = envelope.response.games.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].appid, 570);
        assert_eq!(games[0].name.as_deref(), Some("Dota 2"));
    }

    #[test]
    fn test_friend_list_absent_for_private_profiles() {
        let json = r#"{"error": "Unauthorized"}"#;
        let envelope: FriendListEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.friendslist.is_none());
        assert_eq!(envelope.error.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn test_player_summaries_deserialization() {
        let json = r#"{
            "response": {
                "players": [
                    {"steamid": "76561198000000001", "personaname": "Gordon", "avatar": "https://a/x.jpg"}
                ]
            }
        }"#;

        let envelope: PlayerSummariesEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.response.players.len(), 1);
        assert_eq!(envelope.response.players[0].personaname, "Gordon");
    }
}
