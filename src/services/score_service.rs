//! Service helpers behind the `/v1/team` and `/v1/leaderboard` routes.

use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::{
        models::{Leaderboard, Team},
        storage::StorageError,
    },
    dto::score::{ClickQuery, TeamId},
    error::ServiceError,
    state::SharedState,
};

/// Outcome of a create request.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The team did not exist and now has zero clicks.
    Created(Team),
    /// The team was already there; its current state is returned untouched.
    Existing(Team),
}

/// Create `id`, or return the existing team when it was created before.
pub async fn create_team(state: &SharedState, id: String) -> Result<CreateOutcome, ServiceError> {
    let id = checked_id(id)?;
    match state.store().create_team(&id).await {
        Ok(team) => {
            info!(team_id = %team.id, "team created");
            Ok(CreateOutcome::Created(team))
        }
        Err(StorageError::AlreadyExists { id }) => {
            debug!(team_id = %id, "team already exists");
            let team = state.store().find_by_id(&id).await?;
            Ok(CreateOutcome::Existing(team))
        }
        Err(err) => Err(err.into()),
    }
}

/// Return a single team.
pub async fn find_team(state: &SharedState, id: String) -> Result<Team, ServiceError> {
    let id = checked_id(id)?;
    Ok(state.store().find_by_id(&id).await?)
}

/// Return the ranked leaderboard.
pub async fn leaderboard(state: &SharedState) -> Result<Leaderboard, ServiceError> {
    Ok(state.store().leaderboard().await?)
}

/// Record the clicks requested by `query` for `id`.
pub async fn record_clicks(
    state: &SharedState,
    id: String,
    query: &ClickQuery,
) -> Result<Team, ServiceError> {
    let count = query.click_count().ok_or(ServiceError::InvalidClickCount)?;
    let id = checked_id(id)?;
    Ok(state.store().record_clicks(&id, count).await?)
}

fn checked_id(id: String) -> Result<String, ServiceError> {
    let team_id = TeamId::new(id);
    team_id.validate()?;
    Ok(team_id.id)
}
