//! In-process score store guarded by a single reader/writer lock.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::{
    dao::{
        models::{Leaderboard, MAX_CLICKS, Team, rank},
        score_store::{ScoreStore, took_the_lead},
        storage::{StorageError, StorageResult},
    },
    services::notifier::{ScoreEvent, ScoreEventSink},
};

/// Score store keeping every team in a process-local map.
///
/// Reads share the lock; writes hold it exclusively, so leaderboards are never
/// torn by a concurrent increment.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    scores: RwLock<Scores>,
    events: Option<Arc<dyn ScoreEventSink>>,
}

#[derive(Default)]
struct Scores {
    teams: HashMap<String, Score>,
    /// Bumped on every increment.
    clock: u64,
}

#[derive(Debug, Clone, Copy)]
struct Score {
    clicks: u64,
    /// Clock value of the increment that produced `clicks`.
    reached_at: u64,
}

impl MemoryScoreStore {
    /// Create an empty store that publishes no events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store publishing its events to `events`.
    pub fn with_events(events: Arc<dyn ScoreEventSink>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                scores: RwLock::default(),
                events: Some(events),
            }),
        }
    }
}

impl MemoryInner {
    async fn publish(&self, event: ScoreEvent) {
        if let Some(events) = &self.events {
            events.publish(event).await;
        }
    }
}

/// Team with the most clicks, or [`Team::none`] while nobody has scored.
///
/// On a tie the team that reached the count first keeps the lead.
fn current_leader(teams: &HashMap<String, Score>) -> Team {
    teams
        .iter()
        .filter(|(_, score)| score.clicks > 0)
        .min_by(|(_, left), (_, right)| {
            right
                .clicks
                .cmp(&left.clicks)
                .then(left.reached_at.cmp(&right.reached_at))
        })
        .map(|(id, score)| Team::new(id.clone(), score.clicks))
        .unwrap_or_else(Team::none)
}

impl ScoreStore for MemoryScoreStore {
    fn create_team(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        Box::pin(async move {
            {
                let mut scores = inner.scores.write().await;
                if scores.teams.contains_key(&id) {
                    return Err(StorageError::already_exists(id));
                }
                scores.teams.insert(
                    id.clone(),
                    Score {
                        clicks: 0,
                        reached_at: 0,
                    },
                );
            }

            inner.publish(ScoreEvent::NewTeam(id.clone())).await;
            Ok(Team::new(id, 0))
        })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let scores = inner.scores.read().await;
            match scores.teams.get(&id) {
                Some(score) => Ok(Team::new(id, score.clicks)),
                None => Err(StorageError::not_found(id)),
            }
        })
    }

    fn record_clicks(&self, id: &str, count: u32) -> BoxFuture<'static, StorageResult<Team>> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let (previous_leader, updated) = {
                let mut scores = inner.scores.write().await;
                let Some(current) = scores.teams.get(&id).copied() else {
                    return Err(StorageError::not_found(id));
                };

                // Must be captured before the increment.
                let previous_leader = current_leader(&scores.teams);

                let Some(clicks) = current
                    .clicks
                    .checked_add(u64::from(count))
                    .filter(|clicks| *clicks <= MAX_CLICKS)
                else {
                    return Err(StorageError::clicks_overflow(id));
                };

                scores.clock += 1;
                let reached_at = scores.clock;
                scores.teams.insert(id.clone(), Score { clicks, reached_at });
                (previous_leader, Team::new(id, clicks))
            };

            if took_the_lead(&previous_leader, &updated) {
                inner.publish(ScoreEvent::NewLeader(updated.id.clone())).await;
            }

            Ok(updated)
        })
    }

    fn leaderboard(&self) -> BoxFuture<'static, StorageResult<Leaderboard>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let snapshot = {
                let scores = inner.scores.read().await;
                scores
                    .teams
                    .iter()
                    .map(|(id, score)| Team::new(id.clone(), score.clicks))
                    .collect::<Vec<_>>()
            };
            Ok(rank(snapshot))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}
