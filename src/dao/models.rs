use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum number of entries returned by a leaderboard query.
pub const LEADERBOARD_LIMIT: usize = 640;

/// Highest click count a team can reach; the relational backend reads counts as `BIGINT`.
pub const MAX_CLICKS: u64 = i64::MAX as u64;

/// A team tracked by the score store.
///
/// Callers always receive copies; the store keeps the authoritative value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Team {
    /// Externally assigned identifier, unique within a store.
    pub id: String,
    /// Total clicks recorded for the team so far.
    pub clicks: u64,
}

impl Team {
    /// Build a team snapshot.
    pub fn new(id: impl Into<String>, clicks: u64) -> Self {
        Self {
            id: id.into(),
            clicks,
        }
    }

    /// The zero-value team standing in for "no leader" on an empty store.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether this is the zero-value team returned when nobody leads.
    pub fn is_none(&self) -> bool {
        self.id.is_empty() && self.clicks == 0
    }
}

/// Teams ordered by rank, best first.
pub type Leaderboard = Vec<Team>;

/// Ranking order shared by every backend: most clicks first, ties by ascending id.
///
/// Ids compare bytewise, which the relational backend mirrors with the `"C"` collation.
pub fn rank_order(left_id: &str, left_clicks: u64, right_id: &str, right_clicks: u64) -> Ordering {
    right_clicks
        .cmp(&left_clicks)
        .then_with(|| left_id.as_bytes().cmp(right_id.as_bytes()))
}

/// Sort teams in place by [`rank_order`] and apply [`LEADERBOARD_LIMIT`].
pub fn rank(mut teams: Vec<Team>) -> Leaderboard {
    teams.sort_by(|a, b| rank_order(&a.id, a.clicks, &b.id, b.clicks));
    teams.truncate(LEADERBOARD_LIMIT);
    teams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_sorts_by_clicks_then_id() {
        let board = rank(vec![
            Team::new("owl", 3),
            Team::new("fox", 5),
            Team::new("bee", 3),
            Team::new("ant", 0),
        ]);

        let ids: Vec<_> = board.iter().map(|team| team.id.as_str()).collect();
        assert_eq!(ids, vec!["fox", "bee", "owl", "ant"]);
    }

    #[test]
    fn rank_caps_leaderboard_length() {
        let teams = (0..LEADERBOARD_LIMIT + 10)
            .map(|n| Team::new(format!("team-{n:04}"), n as u64))
            .collect();

        let board = rank(teams);
        assert_eq!(board.len(), LEADERBOARD_LIMIT);
        assert_eq!(board[0].clicks, (LEADERBOARD_LIMIT + 9) as u64);
    }

    #[test]
    fn none_team_is_zero_value() {
        assert!(Team::none().is_none());
        assert!(!Team::new("fox", 0).is_none());
    }

    #[test]
    fn team_serializes_as_id_and_clicks() {
        let json = serde_json::to_value(Team::new("fox", 5)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "fox", "clicks": 5 }));
    }
}
