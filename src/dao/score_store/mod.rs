pub mod memory;
#[cfg(feature = "postgres-store")]
pub mod postgres;

use crate::dao::models::{Leaderboard, Team};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::MemoryScoreStore;

/// Abstraction over the persistence layer holding team scores.
///
/// Every backend ranks teams the same way (see [`crate::dao::models::rank_order`])
/// and publishes the same events for the same sequence of calls.
pub trait ScoreStore: Send + Sync {
    /// Insert a team with zero clicks, failing with `AlreadyExists` on duplicates.
    fn create_team(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>>;
    /// Look up a single team.
    fn find_by_id(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>>;
    /// Add `count` clicks to an existing team and return the updated snapshot.
    ///
    /// Fails with `ClicksOverflow`, recording nothing, past [`MAX_CLICKS`](crate::dao::models::MAX_CLICKS).
    fn record_clicks(&self, id: &str, count: u32) -> BoxFuture<'static, StorageResult<Team>>;
    /// Rank every team from a single consistent snapshot.
    fn leaderboard(&self) -> BoxFuture<'static, StorageResult<Leaderboard>>;
    /// Probe the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Release held resources. Calling it again is a no-op.
    fn close(&self) -> BoxFuture<'static, ()>;
}

/// Whether `updated` took the lead from `previous`, the leader captured before the increment.
///
/// Teams without clicks never lead, so `previous` is [`Team::none`] until someone scores.
/// Backends break ties for the lead in favour of the team that reached the count first,
/// so a challenger only takes over by strictly passing the incumbent.
/// A team extending its own lead is not a leader change, and neither is catching up to a tie.
pub fn took_the_lead(previous: &Team, updated: &Team) -> bool {
    updated.clicks > previous.clicks && updated.id != previous.id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overtaking_the_leader_is_a_change() {
        assert!(took_the_lead(&Team::new("fox", 5), &Team::new("owl", 7)));
    }

    #[test]
    fn first_click_on_empty_store_takes_the_lead() {
        assert!(took_the_lead(&Team::none(), &Team::new("fox", 1)));
    }

    #[test]
    fn trailing_or_tying_is_not_a_change() {
        assert!(!took_the_lead(&Team::new("fox", 5), &Team::new("owl", 3)));
        assert!(!took_the_lead(&Team::new("fox", 5), &Team::new("owl", 5)));
    }

    #[test]
    fn extending_own_lead_is_not_a_change() {
        assert!(!took_the_lead(&Team::new("fox", 5), &Team::new("fox", 9)));
    }
}
