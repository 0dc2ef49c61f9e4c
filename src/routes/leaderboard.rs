use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dao::models::{Leaderboard, Team},
    error::AppError,
    services::score_service,
    state::SharedState,
};

/// Leaderboard endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route("/v1/leaderboard", get(get_leaderboard))
}

#[utoipa::path(
    get,
    path = "/v1/leaderboard",
    tag = "leaderboard",
    responses(
        (status = 200, description = "Teams ranked by clicks, ties by id", body = [Team]),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Return the highest scoring teams, best first.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<Leaderboard>, AppError> {
    Ok(Json(score_service::leaderboard(&state).await?))
}
