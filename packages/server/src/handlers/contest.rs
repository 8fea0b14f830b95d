use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Duration, Utc};
use common::{ContestState, ProblemStatus};
use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::{error, info, instrument, warn};

use crate::entity::problem;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::contest::*;
use crate::state::AppState;
use crate::store;

/// Find a contest snapshot by ID or return 404.
async fn find_contest_data<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<store::contests::ContestData, AppError> {
    store::contests::get_contest(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

/// Persist a new contest with its problems, participants, and NON_TRIED
/// problem results, all in one transaction. Returns the contest id.
async fn persist_contest(
    state: &AppState,
    problems: Vec<problem::Model>,
    participant_models: &[String],
) -> Result<i32, AppError> {
    let txn = state.db.begin().await?;

    let started_at = Utc::now();
    let ends_at = started_at + Duration::seconds(state.config.contest.duration_seconds);
    let contest = store::contests::create_contest(
        &txn,
        ContestState::Running,
        started_at,
        ends_at,
        problems.len() as i32,
    )
    .await?;

    for (order, problem) in problems.iter().enumerate() {
        store::contests::add_problem_to_contest(&txn, contest.id, problem.id, order as i32)
            .await?;
    }

    let mut participant_ids = Vec::with_capacity(participant_models.len());
    for model_name in participant_models {
        let participant =
            store::participants::create_participant(&txn, contest.id, model_name.trim()).await?;
        participant_ids.push(participant.id);
    }

    for participant_id in &participant_ids {
        for problem in &problems {
            let result = crate::entity::problem_result::Model {
                participant_id: *participant_id,
                problem_id: problem.id,
                status: ProblemStatus::NonTried,
                penalty_count: 0,
                penalty_seconds: 0,
            };
            store::results::upsert_problem_result(&txn, &result).await?;
        }
    }

    txn.commit().await?;
    Ok(contest.id)
}

/// Admit the contest into the coordinator; mark it finished if admission
/// fails so it is not rehydrated later.
async fn admit_contest(state: &AppState, contest_id: i32) -> Result<(), AppError> {
    if let Err(e) = state
        .coordinator
        .start_contest(contest_id, HashMap::new())
        .await
    {
        warn!(contest_id, error = %e, "Contest admission failed, finishing contest");
        if let Err(mark) =
            store::contests::update_contest_state(&state.db, contest_id, ContestState::Finished)
                .await
        {
            error!(contest_id, error = %mark, "Failed to finish unadmitted contest");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Create a contest over randomly selected problems and start it.
#[utoipa::path(
    post,
    path = "/",
    tag = "Contests",
    operation_id = "createContest",
    summary = "Create and start a contest",
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created and started", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Concurrency bound exceeded (CAPACITY_EXCEEDED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_contest(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContestRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_contest(&payload)?;

    let problems =
        store::problems::get_random_problems(&state.db, payload.num_problems as u64).await?;
    if problems.len() < payload.num_problems as usize {
        return Err(AppError::Validation("Not enough problems available".into()));
    }

    let contest_id = persist_contest(&state, problems, &payload.participant_models).await?;
    admit_contest(&state, contest_id).await?;

    let data = find_contest_data(&state.db, contest_id).await?;
    info!(
        contest_id,
        participants = payload.participant_models.len(),
        "Contest created"
    );
    Ok((StatusCode::CREATED, Json(ContestResponse::from(data))))
}

/// Create a contest over an explicit problem list and start it.
#[utoipa::path(
    post,
    path = "/with-problems",
    tag = "Contests",
    operation_id = "createContestWithProblems",
    summary = "Create and start a contest with explicit problems",
    request_body = CreateContestWithProblemsRequest,
    responses(
        (status = 201, description = "Contest created and started", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Concurrency bound exceeded (CAPACITY_EXCEEDED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_contest_with_problems(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContestWithProblemsRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_contest_with_problems(&payload)?;

    let mut problems = Vec::with_capacity(payload.problem_ids.len());
    for problem_id in &payload.problem_ids {
        let problem = store::problems::get_problem(&state.db, *problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {problem_id} not found")))?;
        problems.push(problem);
    }

    let contest_id = persist_contest(&state, problems, &payload.participant_models).await?;
    admit_contest(&state, contest_id).await?;

    let data = find_contest_data(&state.db, contest_id).await?;
    Ok((StatusCode::CREATED, Json(ContestResponse::from(data))))
}

/// Get a contest snapshot.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Contests",
    operation_id = "getContest",
    summary = "Get contest details",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest snapshot", body = ContestResponse),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn get_contest(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContestResponse>, AppError> {
    let data = find_contest_data(&state.db, id).await?;
    Ok(Json(ContestResponse::from(data)))
}

/// List recent contests.
#[utoipa::path(
    get,
    path = "/",
    tag = "Contests",
    operation_id = "listContests",
    summary = "List recent contests",
    params(ContestListQuery),
    responses(
        (status = 200, description = "Recent contests", body = ContestListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_contests(
    State(state): State<AppState>,
    Query(query): Query<ContestListQuery>,
) -> Result<Json<ContestListResponse>, AppError> {
    let page_size = query.page_size.unwrap_or(5).clamp(1, 50);
    let contests = store::contests::list_contests(&state.db, page_size).await?;
    Ok(Json(ContestListResponse {
        contests: contests.into_iter().map(ContestResponse::from).collect(),
    }))
}

/// Stop a running contest.
#[utoipa::path(
    post,
    path = "/{id}/stop",
    tag = "Contests",
    operation_id = "stopContest",
    summary = "Stop a running contest",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest stopped", body = ContestResponse),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn stop_contest(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContestResponse>, AppError> {
    state.coordinator.stop_contest(id).await?;
    let data = find_contest_data(&state.db, id).await?;
    Ok(Json(ContestResponse::from(data)))
}
