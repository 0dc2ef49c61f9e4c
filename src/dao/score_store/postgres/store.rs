use std::sync::Arc;

use futures::future::BoxFuture;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};

use crate::{
    dao::{
        models::{LEADERBOARD_LIMIT, Leaderboard, Team},
        score_store::{ScoreStore, took_the_lead},
        storage::{StorageError, StorageResult},
    },
    services::notifier::{ScoreEvent, ScoreEventSink},
};

use super::{
    config::{PgConfig, validate_table_name},
    error::{PgDaoError, PgResult},
};

/// Score store backed by a single PostgreSQL table.
///
/// Increments are single additive statements, so concurrent writers, including
/// other processes sharing the table, never lose clicks. The leader captured for
/// `NewLeader` events is read in a separate statement and may be stale when
/// another process writes in between; scores stay exact regardless.
///
/// Every increment stamps `reached_at`, so on a tie the team that reached the
/// count first keeps the lead. Counts are capped at
/// [`MAX_CLICKS`](crate::dao::models::MAX_CLICKS): the
/// `BIGINT` cast in `RETURNING` fails above it and the update is rolled back.
#[derive(Clone)]
pub struct PgScoreStore {
    pool: PgPool,
    queries: Arc<Queries>,
    events: Option<Arc<dyn ScoreEventSink>>,
}

/// SQLSTATE raised when `clicks::BIGINT` does not fit.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// SQL statements bound to one validated table name.
struct Queries {
    create_table: String,
    add_reached_at: String,
    insert: String,
    select_one: String,
    select_leader: String,
    add_clicks: String,
    select_ranked: String,
}

impl Queries {
    fn for_table(table: &str) -> Self {
        // "C" collation orders ids bytewise, matching `rank_order`.
        let ranking = r#"ORDER BY clicks DESC, teamID COLLATE "C" ASC"#;
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} \
                 (teamID TEXT NOT NULL, clicks NUMERIC, reached_at TIMESTAMPTZ, UNIQUE(teamID))"
            ),
            add_reached_at: format!(
                "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS reached_at TIMESTAMPTZ"
            ),
            insert: format!("INSERT INTO {table} (teamID, clicks) VALUES ($1, 0)"),
            select_one: format!(
                "SELECT teamID, clicks::BIGINT FROM {table} WHERE teamID = $1 LIMIT 1"
            ),
            select_leader: format!(
                "SELECT teamID, clicks::BIGINT FROM {table} WHERE clicks > 0 \
                 ORDER BY clicks DESC, reached_at ASC NULLS LAST, teamID COLLATE \"C\" ASC LIMIT 1"
            ),
            add_clicks: format!(
                "UPDATE {table} SET clicks = clicks + $2, reached_at = clock_timestamp() \
                 WHERE teamID = $1 RETURNING teamID, clicks::BIGINT"
            ),
            select_ranked: format!(
                "SELECT teamID, clicks::BIGINT FROM {table} {ranking} LIMIT {LEADERBOARD_LIMIT}"
            ),
        }
    }
}

fn into_team((id, clicks): (String, i64)) -> PgResult<Team> {
    match u64::try_from(clicks) {
        Ok(clicks) => Ok(Team::new(id, clicks)),
        Err(_) => Err(PgDaoError::InvalidClicks { id, value: clicks }),
    }
}

impl PgScoreStore {
    /// Connect to PostgreSQL and make sure the score table exists.
    pub async fn connect(config: PgConfig) -> PgResult<Self> {
        validate_table_name(&config.table)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|source| PgDaoError::Connect { source })?;

        Self::with_pool(pool, &config.table).await
    }

    /// Use an existing pool, creating the score table if needed.
    pub async fn with_pool(pool: PgPool, table: &str) -> PgResult<Self> {
        validate_table_name(table)?;
        let queries = Queries::for_table(table);

        sqlx::query(&queries.create_table)
            .execute(&pool)
            .await
            .map_err(|source| PgDaoError::CreateTable {
                table: table.to_owned(),
                source,
            })?;
        sqlx::query(&queries.add_reached_at)
            .execute(&pool)
            .await
            .map_err(|source| PgDaoError::CreateTable {
                table: table.to_owned(),
                source,
            })?;
        info!(table, "score table ready");

        Ok(Self {
            pool,
            queries: Arc::new(queries),
            events: None,
        })
    }

    /// Publish store events to `events`.
    pub fn with_events(mut self, events: Arc<dyn ScoreEventSink>) -> Self {
        self.events = Some(events);
        self
    }

    async fn publish(&self, event: ScoreEvent) {
        if let Some(events) = &self.events {
            events.publish(event).await;
        }
    }

    async fn find_leader(&self) -> PgResult<Team> {
        let row = sqlx::query_as::<_, (String, i64)>(&self.queries.select_leader)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| PgDaoError::Query {
                operation: "select leader",
                source,
            })?;

        match row {
            Some(row) => into_team(row),
            None => Ok(Team::none()),
        }
    }

    async fn find(&self, id: String) -> StorageResult<Team> {
        let row = sqlx::query_as::<_, (String, i64)>(&self.queries.select_one)
            .bind(&id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| PgDaoError::Query {
                operation: "select team",
                source,
            })?;

        match row {
            Some(row) => Ok(into_team(row)?),
            None => Err(StorageError::not_found(id)),
        }
    }

    async fn insert(&self, id: String) -> StorageResult<Team> {
        let inserted = sqlx::query(&self.queries.insert)
            .bind(&id)
            .execute(&self.pool)
            .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(StorageError::already_exists(id));
            }
            Err(source) => {
                return Err(PgDaoError::Query {
                    operation: "insert team",
                    source,
                }
                .into());
            }
        }

        self.publish(ScoreEvent::NewTeam(id.clone())).await;
        Ok(Team::new(id, 0))
    }

    async fn add_clicks(&self, id: String, count: u32) -> StorageResult<Team> {
        let previous_leader = match self.find_leader().await {
            Ok(leader) => Some(leader),
            Err(err) => {
                warn!(
                    error = %err,
                    team_id = %id,
                    "could not capture leader; skipping leader event"
                );
                None
            }
        };

        let row = match sqlx::query_as::<_, (String, i64)>(&self.queries.add_clicks)
            .bind(&id)
            .bind(i64::from(count))
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row,
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) =>
            {
                return Err(StorageError::clicks_overflow(id));
            }
            Err(source) => {
                return Err(PgDaoError::Query {
                    operation: "add clicks",
                    source,
                }
                .into());
            }
        };

        let Some(row) = row else {
            return Err(StorageError::not_found(id));
        };
        let updated = into_team(row)?;

        if previous_leader.is_some_and(|leader| took_the_lead(&leader, &updated)) {
            self.publish(ScoreEvent::NewLeader(updated.id.clone())).await;
        }

        Ok(updated)
    }

    async fn ranked(&self) -> StorageResult<Leaderboard> {
        let rows = sqlx::query_as::<_, (String, i64)>(&self.queries.select_ranked)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| PgDaoError::Query {
                operation: "select leaderboard",
                source,
            })?;

        // the database already sorted it for us
        let leaderboard = rows
            .into_iter()
            .map(into_team)
            .collect::<PgResult<Leaderboard>>()?;
        Ok(leaderboard)
    }
}

impl ScoreStore for PgScoreStore {
    fn create_team(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.insert(id).await })
    }

    fn find_by_id(&self, id: &str) -> BoxFuture<'static, StorageResult<Team>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.find(id).await })
    }

    fn record_clicks(&self, id: &str, count: u32) -> BoxFuture<'static, StorageResult<Team>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.add_clicks(id, count).await })
    }

    fn leaderboard(&self) -> BoxFuture<'static, StorageResult<Leaderboard>> {
        let store = self.clone();
        Box::pin(async move { store.ranked().await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&store.pool)
                .await
                .map_err(|source| PgDaoError::Query {
                    operation: "ping",
                    source,
                })?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        let pool = self.pool.clone();
        Box::pin(async move {
            if !pool.is_closed() {
                pool.close().await;
                info!("PostgreSQL pool closed");
            }
        })
    }
}
