//! Event port between the score store and the announcement pipeline.
//!
//! The store publishes a [`ScoreEvent`] after each qualifying mutation. The
//! default [`ChannelNotifier`] queues events on two bounded channels, one per
//! event kind, so a slow consumer never stalls request handling for longer than
//! the configured [`OverflowPolicy`] allows.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use serde::Deserialize;
use tokio::sync::mpsc::{
    self,
    error::{SendTimeoutError, TrySendError},
};
use tracing::{debug, warn};

/// Side effect emitted by the score store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreEvent {
    /// A team was created.
    NewTeam(String),
    /// A team overtook the previous leader.
    NewLeader(String),
}

impl ScoreEvent {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreEvent::NewTeam(_) => "new_team",
            ScoreEvent::NewLeader(_) => "new_leader",
        }
    }

    /// Identifier of the team the event is about.
    pub fn team_id(&self) -> &str {
        match self {
            ScoreEvent::NewTeam(id) | ScoreEvent::NewLeader(id) => id,
        }
    }
}

/// Destination for store events.
///
/// Publishing is fire-and-forget: implementations swallow (and log) their own
/// failures so a mutation never fails because of its notification.
pub trait ScoreEventSink: Send + Sync {
    /// Hand `event` over; resolves once it is queued or dropped.
    fn publish(&self, event: ScoreEvent) -> BoxFuture<'static, ()>;
}

/// What to do with an event when its queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the incoming event immediately.
    #[default]
    DropNewest,
    /// Wait for room up to the given number of milliseconds, then discard.
    BlockWithTimeout(#[serde(deserialize_with = "millis::deserialize")] Duration),
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Consumer half of [`channel`], drained by the announcer.
pub struct ScoreEventReceivers {
    /// Ids of newly created teams.
    pub new_team: mpsc::Receiver<String>,
    /// Ids of teams that just took the lead.
    pub new_leader: mpsc::Receiver<String>,
}

/// Producer half of [`channel`], installed into the score store.
#[derive(Clone)]
pub struct ChannelNotifier {
    new_team: mpsc::Sender<String>,
    new_leader: mpsc::Sender<String>,
    overflow: OverflowPolicy,
}

/// Create a bounded notifier with `capacity` slots per event kind.
pub fn channel(
    capacity: usize,
    overflow: OverflowPolicy,
) -> (ChannelNotifier, ScoreEventReceivers) {
    let capacity = capacity.max(1);
    let (new_team_tx, new_team_rx) = mpsc::channel(capacity);
    let (new_leader_tx, new_leader_rx) = mpsc::channel(capacity);

    let notifier = ChannelNotifier {
        new_team: new_team_tx,
        new_leader: new_leader_tx,
        overflow,
    };
    let receivers = ScoreEventReceivers {
        new_team: new_team_rx,
        new_leader: new_leader_rx,
    };
    (notifier, receivers)
}

impl ChannelNotifier {
    /// Box the notifier as the trait object expected by score stores.
    pub fn into_sink(self) -> Arc<dyn ScoreEventSink> {
        Arc::new(self)
    }
}

enum Dropped {
    Full,
    Closed,
}

impl ScoreEventSink for ChannelNotifier {
    fn publish(&self, event: ScoreEvent) -> BoxFuture<'static, ()> {
        let kind = event.kind();
        let (sender, team_id) = match event {
            ScoreEvent::NewTeam(id) => (self.new_team.clone(), id),
            ScoreEvent::NewLeader(id) => (self.new_leader.clone(), id),
        };
        let overflow = self.overflow;

        Box::pin(async move {
            let outcome = match overflow {
                OverflowPolicy::DropNewest => {
                    sender.try_send(team_id.clone()).map_err(|err| match err {
                        TrySendError::Full(_) => Dropped::Full,
                        TrySendError::Closed(_) => Dropped::Closed,
                    })
                }
                OverflowPolicy::BlockWithTimeout(limit) => sender
                    .send_timeout(team_id.clone(), limit)
                    .await
                    .map_err(|err| match err {
                        SendTimeoutError::Timeout(_) => Dropped::Full,
                        SendTimeoutError::Closed(_) => Dropped::Closed,
                    }),
            };

            match outcome {
                Ok(()) => debug!(kind, team_id = %team_id, "queued score event"),
                Err(Dropped::Full) => {
                    warn!(kind, team_id = %team_id, "event queue full; dropping event")
                }
                Err(Dropped::Closed) => {
                    debug!(kind, team_id = %team_id, "no event consumer running; dropping event")
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_are_routed_by_kind() {
        let (notifier, mut receivers) = channel(4, OverflowPolicy::DropNewest);

        notifier.publish(ScoreEvent::NewTeam("fox".into())).await;
        notifier.publish(ScoreEvent::NewLeader("owl".into())).await;

        assert_eq!(receivers.new_team.try_recv().unwrap(), "fox");
        assert_eq!(receivers.new_leader.try_recv().unwrap(), "owl");
        assert!(receivers.new_team.try_recv().is_err());
        assert!(receivers.new_leader.try_recv().is_err());
    }

    #[tokio::test]
    async fn drop_newest_discards_when_full() {
        let (notifier, mut receivers) = channel(1, OverflowPolicy::DropNewest);

        notifier.publish(ScoreEvent::NewTeam("first".into())).await;
        notifier.publish(ScoreEvent::NewTeam("second".into())).await;

        assert_eq!(receivers.new_team.try_recv().unwrap(), "first");
        assert!(receivers.new_team.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn block_with_timeout_gives_up_after_limit() {
        let (notifier, mut receivers) =
            channel(1, OverflowPolicy::BlockWithTimeout(Duration::from_millis(50)));

        notifier.publish(ScoreEvent::NewLeader("first".into())).await;
        let started = tokio::time::Instant::now();
        notifier.publish(ScoreEvent::NewLeader("second".into())).await;

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(receivers.new_leader.try_recv().unwrap(), "first");
        assert!(receivers.new_leader.try_recv().is_err());
    }

    #[tokio::test]
    async fn block_with_timeout_delivers_once_room_frees_up() {
        let (notifier, mut receivers) =
            channel(1, OverflowPolicy::BlockWithTimeout(Duration::from_secs(5)));

        notifier.publish(ScoreEvent::NewTeam("first".into())).await;
        let pending = tokio::spawn(notifier.publish(ScoreEvent::NewTeam("second".into())));

        assert_eq!(receivers.new_team.recv().await.unwrap(), "first");
        pending.await.unwrap();
        assert_eq!(receivers.new_team.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn publishing_without_consumer_is_harmless() {
        let (notifier, receivers) = channel(1, OverflowPolicy::DropNewest);
        drop(receivers);

        notifier.publish(ScoreEvent::NewTeam("fox".into())).await;
    }

    #[test]
    fn overflow_policy_deserializes_from_config() {
        let drop: OverflowPolicy = serde_json::from_str("\"drop_newest\"").unwrap();
        assert_eq!(drop, OverflowPolicy::DropNewest);

        let block: OverflowPolicy =
            serde_json::from_str(r#"{"block_with_timeout": 250}"#).unwrap();
        assert_eq!(
            block,
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(250))
        );
    }
}
