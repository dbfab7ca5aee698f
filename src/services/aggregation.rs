//! Common-library aggregation
//!
//! Turns a list of steam ids into a ranked list of games the group owns in
//! common. Per-user lookups fan out concurrently; their completion order
//! cannot affect the result because everything is folded back in input order.

use crate::{
    error::{AppError, AppResult},
    models::{AppId, CommonGame, CommonGamesReport, GameRecord, SteamId},
    services::providers::SteamProvider,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Placeholder when a display-name lookup fails; one bad lookup must not
/// fail the whole aggregation.
const UNKNOWN_USER: &str = "Unknown User";

/// Minimum number of distinct owners a game needs to qualify.
///
/// At least half the group (rounded down), and never fewer than two, so a
/// two-person group still works while a large group is not flooded with
/// games only one person owns.
pub fn min_owners(total_distinct_users: usize) -> usize {
    2.max(total_distinct_users / 2)
}

/// Per-participant lookup results, in participant order.
struct ParticipantData {
    name: String,
    games: Vec<GameRecord>,
}

/// Computes the games owned in common by the given users, ranked by how many
/// of them own each game.
///
/// `user_ids` may contain duplicates; they are collapsed before counting so a
/// repeated id can never inflate ownership. When `primary` names the
/// authenticated requester, a failure of *their* owned-games lookup
/// propagates (with cache invalidation on `PrivateProfile`); failures for
/// other participants degrade to an empty library. If the lookup fails for
/// every participant the call fails with `ServiceUnavailable` rather than
/// returning a misleading empty result.
pub async fn compute_common_games(
    provider: Arc<dyn SteamProvider>,
    user_ids: &[SteamId],
    primary: Option<&SteamId>,
) -> AppResult<CommonGamesReport> {
    // Deduplicate, preserving first-seen order for deterministic output.
    let mut seen = HashSet::new();
    let participants: Vec<SteamId> = user_ids
        .iter()
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect();

    if participants.is_empty() {
        return Err(AppError::Internal(
            "Aggregation requires at least one user".to_string(),
        ));
    }

    let total_users = participants.len();
    let threshold = min_owners(total_users);

    tracing::info!(
        participants = total_users,
        min_owners = threshold,
        "Starting common-games aggregation"
    );

    // Fan out: one task per participant resolving name and library together.
    let mut tasks = Vec::with_capacity(total_users);
    for id in &participants {
        let provider = Arc::clone(&provider);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            tokio::join!(
                provider.get_player_summary(&id),
                provider.get_owned_games(&id)
            )
        }));
    }

    let mut results = Vec::with_capacity(total_users);
    let mut failed_lookups = 0;

    for (id, task) in participants.iter().zip(tasks) {
        let (summary, owned) = task
            .await
            .map_err(|e| AppError::Internal(format!("Lookup task panicked: {}", e)))?;

        let name = match summary {
            Ok(player) => player.personaname,
            Err(e) => {
                tracing::warn!(steam_id = %id, error = %e, "Display-name lookup failed");
                UNKNOWN_USER.to_string()
            }
        };

        let games = match owned {
            Ok(games) => games,
            Err(e) => {
                if primary == Some(id) {
                    // The requester's own library is non-negotiable: surface
                    // the failure so the UI can say why, and drop any cached
                    // negative so a retry after a settings fix works.
                    if matches!(e, AppError::PrivateProfile) {
                        if let Err(inv_err) = provider.invalidate(id).await {
                            tracing::warn!(steam_id = %id, error = %inv_err, "Cache invalidation failed");
                        }
                    }
                    return Err(e);
                }
                tracing::warn!(steam_id = %id, error = %e, "Owned-games lookup failed, treating as empty");
                failed_lookups += 1;
                Vec::new()
            }
        };

        results.push(ParticipantData { name, games });
    }

    if failed_lookups == total_users {
        return Err(AppError::ServiceUnavailable(
            "Owned-games lookups failed for every participant".to_string(),
        ));
    }

    let games = rank_common_games(&results, threshold);

    tracing::info!(
        qualifying_games = games.len(),
        degraded_lookups = failed_lookups,
        "Aggregation completed"
    );

    Ok(CommonGamesReport { games, total_users })
}

/// Builds the ownership index and applies the quorum filter and ranking.
///
/// `results` holds one entry per distinct participant, in input order; that
/// order carries through to `owner_names`.
fn rank_common_games(results: &[ParticipantData], threshold: usize) -> Vec<CommonGame> {
    // appid → (representative record, owner indexes in participant order)
    let mut index: HashMap<AppId, (&GameRecord, Vec<usize>)> = HashMap::new();

    for (participant, data) in results.iter().enumerate() {
        // A library can list the same appid twice; count each owner once.
        let mut counted = HashSet::new();
        for game in &data.games {
            if !counted.insert(game.appid) {
                continue;
            }
            index
                .entry(game.appid)
                .or_insert_with(|| (game, Vec::new()))
                .1
                .push(participant);
        }
    }

    let mut common: Vec<CommonGame> = index
        .into_values()
        .filter(|(_, owners)| owners.len() >= threshold)
        .map(|(record, owners)| CommonGame {
            game: record.clone(),
            owner_count: owners.len(),
            owner_names: owners.iter().map(|&i| results[i].name.clone()).collect(),
        })
        .collect();

    // Most-owned first; ties alphabetically, then by appid so the order is
    // fully deterministic regardless of map iteration.
    common.sort_by(|a, b| {
        b.owner_count
            .cmp(&a.owner_count)
            .then_with(|| {
                a.game
                    .display_name()
                    .to_lowercase()
                    .cmp(&b.game.display_name().to_lowercase())
            })
            .then_with(|| a.game.appid.cmp(&b.game.appid))
    });

    common
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlayerSummary;
    use crate::services::providers::MockSteamProvider;
    use mockall::predicate::eq;

    fn game(appid: AppId, name: &str) -> GameRecord {
        GameRecord {
            appid,
            name: Some(name.to_string()),
            img_icon_url: None,
        }
    }

    fn summary(id: &str, name: &str) -> PlayerSummary {
        PlayerSummary {
            steamid: SteamId::from(id),
            personaname: name.to_string(),
            avatar: None,
        }
    }

    /// Mock where every participant resolves successfully.
    fn provider_with(users: Vec<(&str, &str, Vec<GameRecord>)>) -> MockSteamProvider {
        let mut mock = MockSteamProvider::new();
        for (id, name, games) in users {
            let player = summary(id, name);
            mock.expect_get_player_summary()
                .with(eq(SteamId::from(id)))
                .returning(move |_| Ok(player.clone()));
            mock.expect_get_owned_games()
                .with(eq(SteamId::from(id)))
                .returning(move |_| Ok(games.clone()));
        }
        mock
    }

    #[tokio::test]
    async fn test_concrete_scenario_ranking_and_quorum() {
        // U1: {10, 20, 30}, U2: {10, 20}, U3: {10} → min_owners = max(2, 1) = 2
        let provider = provider_with(vec![
            ("u1", "Alice", vec![game(10, "Ten"), game(20, "Twenty"), game(30, "Thirty")]),
            ("u2", "Bob", vec![game(10, "Ten"), game(20, "Twenty")]),
            ("u3", "Carol", vec![game(10, "Ten")]),
        ]);

        let ids = vec![SteamId::from("u1"), SteamId::from("u2"), SteamId::from("u3")];
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        assert_eq!(report.total_users, 3);
        assert_eq!(report.games.len(), 2);

        // Game 10 (3 owners) ranks above game 20 (2 owners); 30 is excluded.
        assert_eq!(report.games[0].game.appid, 10);
        assert_eq!(report.games[0].owner_count, 3);
        assert_eq!(report.games[0].owner_names, vec!["Alice", "Bob", "Carol"]);

        assert_eq!(report.games[1].game.appid, 20);
        assert_eq!(report.games[1].owner_count, 2);
        assert_eq!(report.games[1].owner_names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_every_result_meets_quorum_invariants() {
        let provider = provider_with(vec![
            ("u1", "A", vec![game(1, "One"), game(2, "Two")]),
            ("u2", "B", vec![game(2, "Two"), game(3, "Three")]),
            ("u3", "C", vec![game(2, "Two")]),
            ("u4", "D", vec![game(3, "Three"), game(1, "One")]),
        ]);

        let ids: Vec<SteamId> = ["u1", "u2", "u3", "u4"].iter().map(|&s| SteamId::from(s)).collect();
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        let threshold = min_owners(4);
        assert_eq!(threshold, 2);
        for entry in &report.games {
            assert!(entry.owner_count >= threshold);
            assert_eq!(entry.owner_count, entry.owner_names.len());
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_do_not_inflate_counts() {
        let users = vec![
            ("u1", "Alice", vec![game(10, "Ten")]),
            ("u2", "Bob", vec![game(10, "Ten")]),
        ];

        let without_dup = {
            let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
            compute_common_games(Arc::new(provider_with(users.clone())), &ids, None)
                .await
                .unwrap()
        };

        let with_dup = {
            let ids = vec![SteamId::from("u1"), SteamId::from("u2"), SteamId::from("u1")];
            compute_common_games(Arc::new(provider_with(users)), &ids, None)
                .await
                .unwrap()
        };

        assert_eq!(without_dup, with_dup);
        assert_eq!(with_dup.total_users, 2);
        assert_eq!(with_dup.games[0].owner_count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_appids_in_one_library_count_once() {
        let provider = provider_with(vec![
            ("u1", "A", vec![game(10, "Ten"), game(10, "Ten")]),
            ("u2", "B", vec![game(10, "Ten")]),
        ]);

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        assert_eq!(report.games[0].owner_count, 2);
        assert_eq!(report.games[0].owner_names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_disjoint_libraries_yield_empty_ok() {
        let provider = provider_with(vec![
            ("u1", "A", vec![game(1, "One")]),
            ("u2", "B", vec![game(2, "Two")]),
        ]);

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        assert!(report.games.is_empty());
    }

    #[tokio::test]
    async fn test_single_user_never_reaches_quorum() {
        let provider = provider_with(vec![("u1", "A", vec![game(1, "One"), game(2, "Two")])]);

        let ids = vec![SteamId::from("u1")];
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        assert!(report.games.is_empty());
        assert_eq!(report.total_users, 1);
    }

    #[tokio::test]
    async fn test_tie_break_is_alphabetical_case_insensitive() {
        let provider = provider_with(vec![
            ("u1", "A", vec![game(5, "Zeta"), game(7, "alpha")]),
            ("u2", "B", vec![game(5, "Zeta"), game(7, "alpha")]),
            ("u3", "C", vec![]),
        ]);

        let ids = vec![SteamId::from("u1"), SteamId::from("u2"), SteamId::from("u3")];
        let report = compute_common_games(Arc::new(provider), &ids, None)
            .await
            .unwrap();

        assert_eq!(report.games.len(), 2);
        assert_eq!(report.games[0].game.display_name(), "alpha");
        assert_eq!(report.games[1].game.display_name(), "Zeta");
    }

    #[tokio::test]
    async fn test_determinism_across_repeated_calls() {
        let users = || {
            vec![
                ("u1", "A", vec![game(3, "Same"), game(4, "Same"), game(5, "Same")]),
                ("u2", "B", vec![game(5, "Same"), game(3, "Same"), game(4, "Same")]),
            ]
        };

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let first = compute_common_games(Arc::new(provider_with(users())), &ids, None)
            .await
            .unwrap();
        let second = compute_common_games(Arc::new(provider_with(users())), &ids, None)
            .await
            .unwrap();

        assert_eq!(first, second);
        // Identical names fall back to the appid tie-break.
        let appids: Vec<AppId> = first.games.iter().map(|g| g.game.appid).collect();
        assert_eq!(appids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_secondary_lookup_failure_degrades_gracefully() {
        let mut mock = MockSteamProvider::new();
        for (id, name, games) in [
            ("u1", "A", Some(vec![game(10, "Ten")])),
            ("u2", "B", Some(vec![game(10, "Ten")])),
            ("u3", "C", None),
        ] {
            let player = summary(id, name);
            mock.expect_get_player_summary()
                .with(eq(SteamId::from(id)))
                .returning(move |_| Ok(player.clone()));
            match games {
                Some(games) => {
                    mock.expect_get_owned_games()
                        .with(eq(SteamId::from(id)))
                        .returning(move |_| Ok(games.clone()));
                }
                None => {
                    mock.expect_get_owned_games()
                        .with(eq(SteamId::from(id)))
                        .returning(|_| {
                            Err(AppError::ServiceUnavailable("timeout".to_string()))
                        });
                }
            }
        }

        let primary = SteamId::from("u1");
        let ids = vec![SteamId::from("u1"), SteamId::from("u2"), SteamId::from("u3")];
        let report = compute_common_games(Arc::new(mock), &ids, Some(&primary))
            .await
            .unwrap();

        // 2-of-3 quorum still met by the two reachable libraries.
        assert_eq!(report.games.len(), 1);
        assert_eq!(report.games[0].owner_count, 2);
        assert_eq!(report.total_users, 3);
    }

    #[tokio::test]
    async fn test_private_primary_propagates_and_invalidates() {
        let mut mock = MockSteamProvider::new();
        let primary = SteamId::from("u1");

        let player = summary("u1", "A");
        mock.expect_get_player_summary()
            .returning(move |_| Ok(player.clone()));
        mock.expect_get_owned_games()
            .with(eq(primary.clone()))
            .returning(|_| Err(AppError::PrivateProfile));
        mock.expect_get_owned_games()
            .with(eq(SteamId::from("u2")))
            .returning(|_| Ok(vec![game(10, "Ten")]));
        mock.expect_invalidate()
            .with(eq(primary.clone()))
            .times(1)
            .returning(|_| Ok(()));

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let result = compute_common_games(Arc::new(mock), &ids, Some(&primary)).await;

        assert!(matches!(result, Err(AppError::PrivateProfile)));
    }

    #[tokio::test]
    async fn test_private_secondary_degrades_to_empty() {
        let mut mock = MockSteamProvider::new();
        for id in ["u1", "u2", "u3"] {
            let player = summary(id, id);
            mock.expect_get_player_summary()
                .with(eq(SteamId::from(id)))
                .returning(move |_| Ok(player.clone()));
        }
        mock.expect_get_owned_games()
            .with(eq(SteamId::from("u1")))
            .returning(|_| Ok(vec![game(10, "Ten")]));
        mock.expect_get_owned_games()
            .with(eq(SteamId::from("u2")))
            .returning(|_| Ok(vec![game(10, "Ten")]));
        mock.expect_get_owned_games()
            .with(eq(SteamId::from("u3")))
            .returning(|_| Err(AppError::PrivateProfile));

        let primary = SteamId::from("u1");
        let ids = vec![SteamId::from("u1"), SteamId::from("u2"), SteamId::from("u3")];
        let report = compute_common_games(Arc::new(mock), &ids, Some(&primary))
            .await
            .unwrap();

        assert_eq!(report.games.len(), 1);
        assert_eq!(report.games[0].owner_names, vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_all_lookups_failing_is_an_aggregate_error() {
        let mut mock = MockSteamProvider::new();
        mock.expect_get_player_summary()
            .returning(|_| Err(AppError::ServiceUnavailable("down".to_string())));
        mock.expect_get_owned_games()
            .returning(|_| Err(AppError::ServiceUnavailable("down".to_string())));

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let result = compute_common_games(Arc::new(mock), &ids, None).await;

        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_failed_name_lookup_uses_placeholder() {
        let mut mock = MockSteamProvider::new();
        mock.expect_get_player_summary()
            .with(eq(SteamId::from("u1")))
            .returning(|_| Err(AppError::NotFound("gone".to_string())));
        let player = summary("u2", "Bob");
        mock.expect_get_player_summary()
            .with(eq(SteamId::from("u2")))
            .returning(move |_| Ok(player.clone()));
        mock.expect_get_owned_games()
            .returning(|_| Ok(vec![game(10, "Ten")]));

        let ids = vec![SteamId::from("u1"), SteamId::from("u2")];
        let report = compute_common_games(Arc::new(mock), &ids, None)
            .await
            .unwrap();

        assert_eq!(report.games[0].owner_names, vec!["Unknown User", "Bob"]);
    }

    #[test]
    fn test_min_owners_formula() {
        assert_eq!(min_owners(1), 2);
        assert_eq!(min_owners(2), 2);
        assert_eq!(min_owners(3), 2);
        assert_eq!(min_owners(4), 2);
        assert_eq!(min_owners(5), 2);
        assert_eq!(min_owners(6), 3);
        assert_eq!(min_owners(10), 5);
        assert_eq!(min_owners(11), 5);
    }
}
