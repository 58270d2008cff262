use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::session::{BindHostRequest, LeaderboardResponse, RosterSnapshot},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling live session operations exposed over REST.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{quiz_id}/host", post(bind_host))
        .route("/sessions/{quiz_id}/leaderboard", get(leaderboard))
}

/// Authorize a connected client as host for a quiz's session.
#[utoipa::path(
    post,
    path = "/sessions/{quiz_id}/host",
    tag = "session",
    params(("quiz_id" = String, Path, description = "Identifier of the quiz being hosted")),
    request_body = BindHostRequest,
    responses(
        (status = 200, description = "Host bound", body = RosterSnapshot),
        (status = 401, description = "Principal does not own the quiz"),
        (status = 404, description = "Quiz or connection not found")
    )
)]
pub async fn bind_host(
    State(state): State<SharedState>,
    Path(quiz_id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<BindHostRequest>>,
) -> Result<Json<RosterSnapshot>, AppError> {
    let snapshot = session_service::bind_host(&state, quiz_id, payload).await?;
    Ok(Json(snapshot))
}

/// Read the current leaderboard of a session, valid in every phase.
#[utoipa::path(
    get,
    path = "/sessions/{quiz_id}/leaderboard",
    tag = "session",
    params(("quiz_id" = String, Path, description = "Identifier of the quiz whose session to rank")),
    responses(
        (status = 200, description = "Current ranking", body = LeaderboardResponse),
        (status = 404, description = "No session exists for this quiz")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(quiz_id): Path<Uuid>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let leaderboard = session_service::session_leaderboard(&state, quiz_id).await?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}
