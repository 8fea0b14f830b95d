use chrono::{DateTime, Utc};
use common::{ContestState, ProblemStatus, ProblemTag};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::contests::ContestData;

/// Request body for creating a contest over randomly selected problems.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestRequest {
    /// Number of problems to select (at least 1).
    #[schema(example = 3)]
    pub num_problems: i32,
    /// Model names to enroll as participants (at least one).
    #[schema(example = json!(["claude-sonnet", "claude-haiku"]))]
    pub participant_models: Vec<String>,
}

/// Request body for creating a contest over an explicit problem set.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestWithProblemsRequest {
    /// Problems in the order they should appear.
    #[schema(example = json!([4, 9, 2]))]
    pub problem_ids: Vec<i32>,
    /// Model names to enroll as participants (at least one).
    #[schema(example = json!(["claude-sonnet"]))]
    pub participant_models: Vec<String>,
}

/// Query parameters for contest listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ContestListQuery {
    /// Number of recent contests to return (1-50, default 5).
    #[param(example = 5)]
    pub page_size: Option<u64>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

/// Scoring record of one participant on one problem.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProblemResultResponse {
    pub problem_id: i32,
    pub status: ProblemStatus,
    pub penalty_count: i32,
    pub penalty_seconds: i32,
}

/// A participant with their scoring records.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub id: i32,
    pub contest_id: i32,
    pub model_name: String,
    pub solved: i32,
    pub total_penalty_seconds: i32,
    pub problem_results: Vec<ProblemResultResponse>,
}

/// Problem summary embedded in a contest snapshot.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestProblemResponse {
    pub id: i32,
    pub name: String,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
    pub tag: ProblemTag,
}

/// Full contest snapshot: problems in contest order, participants in
/// leaderboard order with their problem results.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestResponse {
    pub id: i32,
    pub state: ContestState,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub num_problems: i32,
    pub problems: Vec<ContestProblemResponse>,
    pub participants: Vec<ParticipantResponse>,
    pub created_at: DateTime<Utc>,
}

/// List of recent contests.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestListResponse {
    pub contests: Vec<ContestResponse>,
}

impl From<ContestData> for ContestResponse {
    fn from(data: ContestData) -> Self {
        Self {
            id: data.contest.id,
            state: data.contest.state,
            started_at: data.contest.started_at,
            ends_at: data.contest.ends_at,
            num_problems: data.contest.num_problems,
            problems: data
                .problems
                .into_iter()
                .map(|p| ContestProblemResponse {
                    id: p.id,
                    name: p.name,
                    time_limit_ms: p.time_limit_ms,
                    memory_limit_mb: p.memory_limit_mb,
                    tag: p.tag,
                })
                .collect(),
            participants: data
                .participants
                .into_iter()
                .map(|p| ParticipantResponse {
                    id: p.participant.id,
                    contest_id: p.participant.contest_id,
                    model_name: p.participant.model_name,
                    solved: p.participant.solved,
                    total_penalty_seconds: p.participant.total_penalty_seconds,
                    problem_results: p
                        .problem_results
                        .into_iter()
                        .map(|pr| ProblemResultResponse {
                            problem_id: pr.problem_id,
                            status: pr.status,
                            penalty_count: pr.penalty_count,
                            penalty_seconds: pr.penalty_seconds,
                        })
                        .collect(),
                })
                .collect(),
            created_at: data.contest.created_at,
        }
    }
}

pub fn validate_create_contest(req: &CreateContestRequest) -> Result<(), AppError> {
    if req.num_problems < 1 {
        return Err(AppError::Validation("num_problems must be at least 1".into()));
    }
    validate_participant_models(&req.participant_models)
}

pub fn validate_create_contest_with_problems(
    req: &CreateContestWithProblemsRequest,
) -> Result<(), AppError> {
    if req.problem_ids.is_empty() {
        return Err(AppError::Validation("No problem IDs provided".into()));
    }
    validate_participant_models(&req.participant_models)
}

fn validate_participant_models(models: &[String]) -> Result<(), AppError> {
    if models.is_empty() {
        return Err(AppError::Validation("No participant models provided".into()));
    }
    if models.iter().any(|m| m.trim().is_empty()) {
        return Err(AppError::Validation(
            "Participant model names must be non-empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_create_contest() {
        let ok = CreateContestRequest {
            num_problems: 2,
            participant_models: vec!["model-a".into()],
        };
        assert!(validate_create_contest(&ok).is_ok());

        let no_problems = CreateContestRequest {
            num_problems: 0,
            participant_models: vec!["model-a".into()],
        };
        assert!(validate_create_contest(&no_problems).is_err());

        let no_models = CreateContestRequest {
            num_problems: 1,
            participant_models: vec![],
        };
        assert!(validate_create_contest(&no_models).is_err());

        let blank_model = CreateContestRequest {
            num_problems: 1,
            participant_models: vec!["  ".into()],
        };
        assert!(validate_create_contest(&blank_model).is_err());
    }

    #[test]
    fn test_validate_create_contest_with_problems() {
        let no_ids = CreateContestWithProblemsRequest {
            problem_ids: vec![],
            participant_models: vec!["model-a".into()],
        };
        assert!(validate_create_contest_with_problems(&no_ids).is_err());
    }
}
