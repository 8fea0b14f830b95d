use chrono::{DateTime, Utc};
use common::ProblemTag;
use serde::{Deserialize, Serialize};

use crate::entity::{problem, test_case};
use crate::error::AppError;

/// A test case within a problem intake request, in submission order.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTestCaseRequest {
    pub input: String,
    pub expected_output: String,
}

/// Request body used by the problem importer.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProblemRequest {
    #[schema(example = "sum_two_numbers")]
    pub name: String,
    #[schema(example = "Read two integers and print their sum.")]
    pub description: String,
    /// Per-test-case wall-clock limit in milliseconds.
    #[schema(example = 1000)]
    pub time_limit_ms: i32,
    /// Peak memory limit in megabytes.
    #[schema(example = 256)]
    pub memory_limit_mb: i32,
    pub tag: ProblemTag,
    #[schema(example = "icpc-archive")]
    pub source: Option<String>,
    /// Ordered test cases; `test_order` is assigned from the array index.
    pub test_cases: Vec<CreateTestCaseRequest>,
}

/// Query parameters for problem listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ProblemListQuery {
    /// Number of recent problems to return (1-100, default 100).
    #[param(example = 100)]
    pub page_size: Option<u64>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct TestCaseResponse {
    pub id: i32,
    pub input: String,
    pub expected_output: String,
    pub test_order: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
    pub tag: ProblemTag,
    pub source: String,
    pub test_cases: Vec<TestCaseResponse>,
    pub created_at: DateTime<Utc>,
}

/// Problem summary for list views (description and test cases omitted).
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemListItem {
    pub id: i32,
    pub name: String,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
    pub tag: ProblemTag,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemListResponse {
    pub problems: Vec<ProblemListItem>,
}

impl ProblemResponse {
    pub fn from_parts(model: problem::Model, test_cases: Vec<test_case::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            time_limit_ms: model.time_limit_ms,
            memory_limit_mb: model.memory_limit_mb,
            tag: model.tag,
            source: model.source,
            test_cases: test_cases
                .into_iter()
                .map(|tc| TestCaseResponse {
                    id: tc.id,
                    input: tc.input,
                    expected_output: tc.expected_output,
                    test_order: tc.test_order,
                })
                .collect(),
            created_at: model.created_at,
        }
    }
}

impl From<problem::Model> for ProblemListItem {
    fn from(m: problem::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            time_limit_ms: m.time_limit_ms,
            memory_limit_mb: m.memory_limit_mb,
            tag: m.tag,
            source: m.source,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_problem(req: &CreateProblemRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty() || req.name.len() > 255 {
        return Err(AppError::Validation("Name must be 1-255 characters".into()));
    }
    if req.description.trim().is_empty() {
        return Err(AppError::Validation("Description must be non-empty".into()));
    }
    if req.time_limit_ms <= 0 {
        return Err(AppError::Validation("time_limit_ms must be positive".into()));
    }
    if req.memory_limit_mb <= 0 {
        return Err(AppError::Validation("memory_limit_mb must be positive".into()));
    }
    if req.test_cases.is_empty() {
        return Err(AppError::Validation(
            "A problem needs at least one test case".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateProblemRequest {
        CreateProblemRequest {
            name: "sum_two_numbers".into(),
            description: "Read two integers and print their sum.".into(),
            time_limit_ms: 1000,
            memory_limit_mb: 256,
            tag: ProblemTag::Math,
            source: None,
            test_cases: vec![CreateTestCaseRequest {
                input: "2 3".into(),
                expected_output: "5".into(),
            }],
        }
    }

    #[test]
    fn test_validate_create_problem() {
        assert!(validate_create_problem(&request()).is_ok());

        let mut bad = request();
        bad.time_limit_ms = 0;
        assert!(validate_create_problem(&bad).is_err());

        let mut bad = request();
        bad.test_cases.clear();
        assert!(validate_create_problem(&bad).is_err());
    }
}
