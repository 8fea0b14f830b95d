use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::problem::*;
use crate::state::AppState;
use crate::store;

/// Create a problem with its ordered test cases (importer entry point).
#[utoipa::path(
    post,
    path = "/",
    tag = "Problems",
    operation_id = "createProblem",
    summary = "Import a problem",
    request_body = CreateProblemRequest,
    responses(
        (status = 201, description = "Problem created", body = ProblemResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn create_problem(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProblemRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_problem(&payload)?;

    let model = store::problems::create_problem(
        &state.db,
        store::problems::NewProblem {
            name: payload.name.trim().to_string(),
            description: payload.description,
            time_limit_ms: payload.time_limit_ms,
            memory_limit_mb: payload.memory_limit_mb,
            tag: payload.tag,
            source: payload.source.unwrap_or_else(|| "UNKNOWN".into()),
            test_cases: payload
                .test_cases
                .into_iter()
                .map(|tc| (tc.input, tc.expected_output))
                .collect(),
        },
    )
    .await?;

    let test_cases = store::problems::get_test_cases_by_problem(&state.db, model.id).await?;
    info!(problem_id = model.id, "Problem imported");
    Ok((
        StatusCode::CREATED,
        Json(ProblemResponse::from_parts(model, test_cases)),
    ))
}

/// Get a problem with its test cases.
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Problems",
    operation_id = "getProblem",
    summary = "Get problem details",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 200, description = "Problem details", body = ProblemResponse),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(problem_id = %id))]
pub async fn get_problem(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProblemResponse>, AppError> {
    let model = store::problems::get_problem(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;
    let test_cases = store::problems::get_test_cases_by_problem(&state.db, id).await?;
    Ok(Json(ProblemResponse::from_parts(model, test_cases)))
}

/// List recent problems.
#[utoipa::path(
    get,
    path = "/",
    tag = "Problems",
    operation_id = "listProblems",
    summary = "List problems",
    params(ProblemListQuery),
    responses(
        (status = 200, description = "Recent problems", body = ProblemListResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_problems(
    State(state): State<AppState>,
    Query(query): Query<ProblemListQuery>,
) -> Result<Json<ProblemListResponse>, AppError> {
    let page_size = query.page_size.unwrap_or(100).clamp(1, 100);
    let problems = store::problems::list_problems(&state.db, page_size).await?;
    Ok(Json(ProblemListResponse {
        problems: problems.into_iter().map(ProblemListItem::from).collect(),
    }))
}

/// Delete a problem and everything referencing it.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Problems",
    operation_id = "deleteProblem",
    summary = "Delete a problem",
    description = "Removes the problem together with its test cases, problem results, submissions, and contest links in one transaction.",
    params(("id" = i32, Path, description = "Problem ID")),
    responses(
        (status = 204, description = "Problem deleted"),
        (status = 404, description = "Problem not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(problem_id = %id))]
pub async fn delete_problem(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    store::problems::get_problem(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Problem not found".into()))?;

    store::problems::delete_problem(&state.db, id).await?;
    info!(problem_id = id, "Problem deleted");
    Ok(StatusCode::NO_CONTENT)
}
