use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::coordinator::CoordinatorError;

/// Structured error response body.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    ContestClosed(String),
    CapacityExceeded(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::ContestClosed(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONTEST_CLOSED",
                    message: msg,
                },
            ),
            AppError::CapacityExceeded(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CAPACITY_EXCEEDED",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        match err {
            CoordinatorError::CapacityReached(limit) => AppError::CapacityExceeded(format!(
                "Maximum concurrent contests ({limit}) reached"
            )),
            CoordinatorError::ContestNotActive(id) => {
                AppError::ContestClosed(format!("Contest {id} is not active"))
            }
            CoordinatorError::ContestNotFound(id) => {
                AppError::NotFound(format!("Contest {id} not found"))
            }
            CoordinatorError::SubmissionNotFound(id) => {
                AppError::NotFound(format!("Submission {id} not found"))
            }
            CoordinatorError::ProblemNotFound(id) => {
                AppError::NotFound(format!("Problem {id} not found"))
            }
            CoordinatorError::ParticipantNotFound(id) => {
                AppError::NotFound(format!("Participant {id} not found"))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
