//! Behaviour every score store backend has to share.
//!
//! The in-memory backend always runs; the PostgreSQL backend runs when
//! `TEST_DATABASE_URL` points at a database the tests may create tables in.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use clicker_back::{
    dao::{
        models::Team,
        score_store::{MemoryScoreStore, ScoreStore},
        storage::StorageError,
    },
    services::notifier::{ScoreEvent, ScoreEventSink},
};

#[derive(Default)]
struct RecordedEvents {
    events: Mutex<Vec<ScoreEvent>>,
}

impl RecordedEvents {
    fn take(&self) -> Vec<ScoreEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ScoreEventSink for RecordedEvents {
    fn publish(&self, event: ScoreEvent) -> BoxFuture<'static, ()> {
        self.events.lock().unwrap().push(event);
        Box::pin(async {})
    }
}

async fn fresh_team_has_zero_clicks(store: &dyn ScoreStore) {
    assert_eq!(store.create_team("fox").await.unwrap(), Team::new("fox", 0));
    assert_eq!(store.find_by_id("fox").await.unwrap(), Team::new("fox", 0));
    assert!(matches!(
        store.create_team("fox").await,
        Err(StorageError::AlreadyExists { .. })
    ));
    assert!(matches!(
        store.find_by_id("owl").await,
        Err(StorageError::NotFound { .. })
    ));
}

async fn unknown_team_clicks_change_nothing(store: &dyn ScoreStore) {
    store.create_team("fox").await.unwrap();
    assert!(matches!(
        store.record_clicks("ghost", 3).await,
        Err(StorageError::NotFound { .. })
    ));
    assert_eq!(store.leaderboard().await.unwrap(), vec![Team::new("fox", 0)]);
}

async fn fox_and_owl(store: &dyn ScoreStore, events: &RecordedEvents) {
    store.create_team("fox").await.unwrap();
    store.create_team("owl").await.unwrap();
    assert_eq!(
        events.take(),
        vec![
            ScoreEvent::NewTeam("fox".into()),
            ScoreEvent::NewTeam("owl".into()),
        ]
    );

    assert_eq!(store.record_clicks("fox", 5).await.unwrap().clicks, 5);
    assert_eq!(events.take(), vec![ScoreEvent::NewLeader("fox".into())]);
    assert_eq!(
        store.leaderboard().await.unwrap(),
        vec![Team::new("fox", 5), Team::new("owl", 0)]
    );

    assert_eq!(store.record_clicks("owl", 3).await.unwrap().clicks, 3);
    assert!(events.take().is_empty());

    assert_eq!(store.record_clicks("owl", 4).await.unwrap().clicks, 7);
    assert_eq!(events.take(), vec![ScoreEvent::NewLeader("owl".into())]);

    assert_eq!(store.record_clicks("owl", 1).await.unwrap().clicks, 8);
    assert!(events.take().is_empty());

    assert_eq!(
        store.leaderboard().await.unwrap(),
        vec![Team::new("owl", 8), Team::new("fox", 5)]
    );
}

async fn tie_keeps_the_incumbent(store: &dyn ScoreStore, events: &RecordedEvents) {
    store.create_team("fox").await.unwrap();
    store.create_team("bee").await.unwrap();
    events.take();

    store.record_clicks("fox", 5).await.unwrap();
    store.record_clicks("bee", 5).await.unwrap();
    assert_eq!(
        store.leaderboard().await.unwrap(),
        vec![Team::new("bee", 5), Team::new("fox", 5)]
    );

    store.record_clicks("fox", 1).await.unwrap();
    assert_eq!(events.take(), vec![ScoreEvent::NewLeader("fox".into())]);

    store.record_clicks("bee", 2).await.unwrap();
    assert_eq!(events.take(), vec![ScoreEvent::NewLeader("bee".into())]);
}

async fn leaderboard_puts_idle_teams_last(store: &dyn ScoreStore) {
    for id in ["cat", "bee", "ant"] {
        store.create_team(id).await.unwrap();
    }
    store.record_clicks("cat", 4).await.unwrap();

    assert_eq!(
        store.leaderboard().await.unwrap(),
        vec![Team::new("cat", 4), Team::new("ant", 0), Team::new("bee", 0)]
    );
}

async fn concurrent_clicks_are_not_lost(store: Arc<dyn ScoreStore>) {
    store.create_team("fox").await.unwrap();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for count in 1..=10 {
                    store.record_clicks("fox", count).await.unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(store.find_by_id("fox").await.unwrap().clicks, 8 * 55);
}

fn memory_store() -> (Arc<dyn ScoreStore>, Arc<RecordedEvents>) {
    let events = Arc::new(RecordedEvents::default());
    let store = MemoryScoreStore::with_events(events.clone());
    (Arc::new(store), events)
}

#[tokio::test]
async fn memory_fresh_team_has_zero_clicks() {
    let (store, _) = memory_store();
    fresh_team_has_zero_clicks(store.as_ref()).await;
}

#[tokio::test]
async fn memory_unknown_team_clicks_change_nothing() {
    let (store, _) = memory_store();
    unknown_team_clicks_change_nothing(store.as_ref()).await;
}

#[tokio::test]
async fn memory_fox_and_owl() {
    let (store, events) = memory_store();
    fox_and_owl(store.as_ref(), &events).await;
}

#[tokio::test]
async fn memory_tie_keeps_the_incumbent() {
    let (store, events) = memory_store();
    tie_keeps_the_incumbent(store.as_ref(), &events).await;
}

#[tokio::test]
async fn memory_leaderboard_puts_idle_teams_last() {
    let (store, _) = memory_store();
    leaderboard_puts_idle_teams_last(store.as_ref()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_clicks_are_not_lost() {
    let (store, _) = memory_store();
    concurrent_clicks_are_not_lost(store).await;
}

#[cfg(feature = "postgres-store")]
mod postgres {
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use clicker_back::dao::{models::MAX_CLICKS, score_store::postgres::PgScoreStore};

    use super::*;

    /// A store on a throwaway table, dropped again when the scenario ends.
    async fn with_pg_store<F, Fut>(scenario: F)
    where
        F: FnOnce(Arc<dyn ScoreStore>, Arc<RecordedEvents>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL contract test");
            return;
        };

        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await
            .unwrap();
        let table = format!("teams_{}", Uuid::new_v4().simple());
        let events = Arc::new(RecordedEvents::default());
        let store = PgScoreStore::with_pool(pool.clone(), &table)
            .await
            .unwrap()
            .with_events(events.clone());

        scenario(Arc::new(store), events).await;

        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn pg_fresh_team_has_zero_clicks() {
        with_pg_store(|store, _| async move { fresh_team_has_zero_clicks(store.as_ref()).await })
            .await;
    }

    #[tokio::test]
    async fn pg_unknown_team_clicks_change_nothing() {
        with_pg_store(|store, _| async move {
            unknown_team_clicks_change_nothing(store.as_ref()).await
        })
        .await;
    }

    #[tokio::test]
    async fn pg_fox_and_owl() {
        with_pg_store(|store, events| async move { fox_and_owl(store.as_ref(), &events).await })
            .await;
    }

    #[tokio::test]
    async fn pg_tie_keeps_the_incumbent() {
        with_pg_store(|store, events| async move {
            tie_keeps_the_incumbent(store.as_ref(), &events).await
        })
        .await;
    }

    #[tokio::test]
    async fn pg_clicks_past_the_ceiling_are_rejected() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping PostgreSQL contract test");
            return;
        };

        let pool = PgPoolOptions::new().connect(&url).await.unwrap();
        let table = format!("teams_{}", Uuid::new_v4().simple());
        let store = PgScoreStore::with_pool(pool.clone(), &table).await.unwrap();
        store.create_team("fox").await.unwrap();
        sqlx::query(&format!("UPDATE {table} SET clicks = $1 WHERE teamID = 'fox'"))
            .bind(i64::MAX - 1)
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(
            store.record_clicks("fox", 2).await,
            Err(StorageError::ClicksOverflow { .. })
        ));
        assert_eq!(
            store.record_clicks("fox", 1).await.unwrap().clicks,
            MAX_CLICKS
        );

        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn pg_leaderboard_puts_idle_teams_last() {
        with_pg_store(|store, _| async move {
            leaderboard_puts_idle_teams_last(store.as_ref()).await
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pg_concurrent_clicks_are_not_lost() {
        with_pg_store(|store, _| concurrent_clicks_are_not_lost(store)).await;
    }
}
