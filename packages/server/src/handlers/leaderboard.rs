use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::Stream;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::instrument;

use crate::coordinator::scoring;
use crate::error::{AppError, ErrorBody};
use crate::models::leaderboard::{LeaderboardResponse, LeaderboardRow};
use crate::state::AppState;
use crate::store;

/// Current leaderboard of a contest.
#[utoipa::path(
    get,
    path = "/{id}/leaderboard",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Get the current leaderboard",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Ordered participants", body = LeaderboardResponse),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    store::contests::get_contest_row(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;

    let mut participants = store::participants::get_participants_by_contest(&state.db, id).await?;
    scoring::order_participants(&mut participants);

    Ok(Json(LeaderboardResponse {
        contest_id: id,
        participants: participants
            .iter()
            .enumerate()
            .map(|(i, p)| LeaderboardRow::ranked(p, i as i32 + 1))
            .collect(),
        updated_at: Utc::now(),
    }))
}

/// Live leaderboard updates for an active contest.
///
/// The stream mirrors the coordinator subscription: it delivers snapshots in
/// `updated_at` order and ends after the final update when the contest
/// stops. A slow client misses intermediate snapshots rather than stalling
/// the contest.
#[utoipa::path(
    get,
    path = "/{id}/leaderboard/stream",
    tag = "Leaderboard",
    operation_id = "streamLeaderboard",
    summary = "Stream leaderboard updates",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Server-sent event stream of leaderboard updates"),
        (status = 409, description = "Contest not active (CONTEST_CLOSED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn stream_leaderboard(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let updates = state.coordinator.subscribe_leaderboard(id).await?;

    let stream = ReceiverStream::new(updates)
        .map(|update| Event::default().event("leaderboard").json_data(&update));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
