use chrono::{DateTime, Utc};
use common::{Language, SubmissionStatus};
use serde::{Deserialize, Serialize};

use crate::entity::submission;
use crate::error::AppError;

/// Largest accepted source code payload, in bytes.
pub const MAX_CODE_SIZE: usize = 1_048_576;

/// Request body for submitting a solution.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitSolutionRequest {
    #[schema(example = 1)]
    pub contest_id: i32,
    #[schema(example = 7)]
    pub participant_id: i32,
    #[schema(example = 4)]
    pub problem_id: i32,
    pub code: String,
    pub language: Language,
}

/// Query parameters for submission listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    pub contest_id: Option<i32>,
    pub participant_id: Option<i32>,
    pub problem_id: Option<i32>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub contest_id: i32,
    pub participant_id: i32,
    pub problem_id: i32,
    pub language: Language,
    pub status: SubmissionStatus,
    pub verdict_message: String,
    pub total_test_cases: i32,
    pub processed_test_cases: i32,
    pub submitted_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitSolutionResponse {
    pub submission_id: i32,
    pub submission: SubmissionResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionResponse>,
}

impl From<submission::Model> for SubmissionResponse {
    fn from(m: submission::Model) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            participant_id: m.participant_id,
            problem_id: m.problem_id,
            language: m.language,
            status: m.status,
            verdict_message: m.verdict_message,
            total_test_cases: m.total_test_cases,
            processed_test_cases: m.processed_test_cases,
            submitted_at: m.submitted_at,
            judged_at: m.judged_at,
        }
    }
}

pub fn validate_submit_solution(req: &SubmitSolutionRequest) -> Result<(), AppError> {
    if req.code.trim().is_empty() {
        return Err(AppError::Validation("Code must be non-empty".into()));
    }
    if req.code.len() > MAX_CODE_SIZE {
        return Err(AppError::Validation(format!(
            "Code exceeds the maximum size of {MAX_CODE_SIZE} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_submit_solution() {
        let ok = SubmitSolutionRequest {
            contest_id: 1,
            participant_id: 1,
            problem_id: 1,
            code: "print(1)".into(),
            language: Language::Python,
        };
        assert!(validate_submit_solution(&ok).is_ok());

        let empty = SubmitSolutionRequest {
            code: "   ".into(),
            ..ok
        };
        assert!(validate_submit_solution(&empty).is_err());

        let oversized = SubmitSolutionRequest {
            code: "x".repeat(MAX_CODE_SIZE + 1),
            contest_id: 1,
            participant_id: 1,
            problem_id: 1,
            language: Language::Python,
        };
        assert!(validate_submit_solution(&oversized).is_err());
    }
}
