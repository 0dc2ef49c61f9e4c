use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::post,
};
use tracing::debug;

use crate::{
    dao::models::Team,
    dto::score::ClickQuery,
    error::{AppError, ServiceError},
    services::score_service::{self, CreateOutcome},
    state::SharedState,
};

/// Team creation, lookup and click endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/v1/team/{teamId}", post(create_team).get(get_team))
        .route("/v1/team/{teamId}/click", post(click))
}

#[utoipa::path(
    post,
    path = "/v1/team/{teamId}",
    tag = "teams",
    params(("teamId" = String, Path, description = "Identifier of the team, usually an emoji")),
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 200, description = "Team already existed", body = Team),
        (status = 400, description = "Invalid team id"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Create a team with zero clicks, or return it unchanged if it already exists.
pub async fn create_team(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
) -> Result<(StatusCode, Json<Team>), AppError> {
    let response = match score_service::create_team(&state, team_id).await? {
        CreateOutcome::Created(team) => (StatusCode::CREATED, Json(team)),
        CreateOutcome::Existing(team) => (StatusCode::OK, Json(team)),
    };
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/v1/team/{teamId}",
    tag = "teams",
    params(("teamId" = String, Path, description = "Identifier of the team")),
    responses(
        (status = 200, description = "Team found", body = Team),
        (status = 404, description = "No such team")
    )
)]
/// Return a single team and its clicks.
pub async fn get_team(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
) -> Result<Json<Team>, AppError> {
    Ok(Json(score_service::find_team(&state, team_id).await?))
}

#[utoipa::path(
    post,
    path = "/v1/team/{teamId}/click",
    tag = "teams",
    params(("teamId" = String, Path, description = "Identifier of the team"), ClickQuery),
    responses(
        (status = 200, description = "Clicks recorded", body = Team),
        (status = 402, description = "Click count outside 1..=10"),
        (status = 404, description = "No such team")
    )
)]
/// Add clicks to an existing team.
///
/// A query string that does not even deserialize (e.g. a repeated `count`) is a
/// bad click count like any other.
pub async fn click(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    query: Result<Query<ClickQuery>, QueryRejection>,
) -> Result<Json<Team>, AppError> {
    let Query(query) = query.map_err(|rejection| {
        debug!(error = %rejection, "rejecting click query");
        ServiceError::InvalidClickCount
    })?;
    Ok(Json(
        score_service::record_clicks(&state, team_id, &query).await?,
    ))
}
