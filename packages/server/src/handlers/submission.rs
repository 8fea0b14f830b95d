use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{info, instrument};

use crate::entity::{contest_problem, participant};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;
use crate::store;

/// Submissions returned per listing request, newest first.
const SUBMISSION_LIST_LIMIT: u64 = 100;

/// Check that the participant belongs to the contest.
async fn is_contest_participant(
    state: &AppState,
    contest_id: i32,
    participant_id: i32,
) -> Result<bool, AppError> {
    let exists = participant::Entity::find_by_id(participant_id)
        .filter(participant::Column::ContestId.eq(contest_id))
        .one(&state.db)
        .await?
        .is_some();
    Ok(exists)
}

/// Check that the problem belongs to the contest.
async fn is_problem_in_contest(
    state: &AppState,
    contest_id: i32,
    problem_id: i32,
) -> Result<bool, AppError> {
    let exists = contest_problem::Entity::find_by_id((contest_id, problem_id))
        .one(&state.db)
        .await?
        .is_some();
    Ok(exists)
}

/// Submit a solution to a contest problem and hand it to the coordinator.
#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "submitSolution",
    summary = "Submit a solution",
    description = "Persists the submission and queues it for judging. Rejected once the contest has ended.",
    request_body = SubmitSolutionRequest,
    responses(
        (status = 201, description = "Submission accepted for judging", body = SubmitSolutionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Contest, participant, or problem not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Contest not accepting submissions (CONTEST_CLOSED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(contest_id = payload.contest_id, participant_id = payload.participant_id, problem_id = payload.problem_id))]
pub async fn submit_solution(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitSolutionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_submit_solution(&payload)?;

    let contest = store::contests::get_contest_row(&state.db, payload.contest_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;

    if contest.state.is_finished() || Utc::now() >= contest.ends_at {
        return Err(AppError::ContestClosed(
            "Contest is not accepting submissions".into(),
        ));
    }

    if !is_contest_participant(&state, payload.contest_id, payload.participant_id).await? {
        return Err(AppError::NotFound(
            "Participant not found in this contest".into(),
        ));
    }
    if !is_problem_in_contest(&state, payload.contest_id, payload.problem_id).await? {
        return Err(AppError::NotFound(
            "Problem not found in this contest".into(),
        ));
    }

    let total_test_cases =
        store::problems::count_test_cases_by_problem(&state.db, payload.problem_id).await? as i32;

    let submission = store::submissions::create_submission(
        &state.db,
        store::submissions::NewSubmission {
            contest_id: payload.contest_id,
            participant_id: payload.participant_id,
            problem_id: payload.problem_id,
            code: payload.code,
            language: payload.language,
            total_test_cases,
        },
    )
    .await?;

    state.coordinator.process_submission(submission.id).await?;

    // Re-read so the response reflects the queued status.
    let submission = store::submissions::get_submission(&state.db, submission.id)
        .await?
        .ok_or_else(|| AppError::Internal("Submission vanished after creation".into()))?;

    info!(submission_id = submission.id, "Solution submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmitSolutionResponse {
            submission_id: submission.id,
            submission: SubmissionResponse::from(submission),
        }),
    ))
}

/// List recent submissions, optionally filtered.
#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "getSubmissions",
    summary = "List recent submissions",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Up to 100 most recent matching submissions", body = SubmissionListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let submissions = store::submissions::list_submissions(
        &state.db,
        query.contest_id,
        query.participant_id,
        query.problem_id,
        SUBMISSION_LIST_LIMIT,
    )
    .await?;

    Ok(Json(SubmissionListResponse {
        submissions: submissions
            .into_iter()
            .map(SubmissionResponse::from)
            .collect(),
    }))
}
