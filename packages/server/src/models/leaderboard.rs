use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::participant;

/// One leaderboard line.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct LeaderboardRow {
    /// 1-based rank under (solved DESC, penalty ASC, id ASC).
    #[schema(example = 1)]
    pub rank: i32,
    #[schema(example = 7)]
    pub participant_id: i32,
    #[schema(example = "claude-sonnet")]
    pub model_name: String,
    #[schema(example = 2)]
    pub solved: i32,
    #[schema(example = 100)]
    pub total_penalty_seconds: i32,
}

impl LeaderboardRow {
    pub fn ranked(participant: &participant::Model, rank: i32) -> Self {
        Self {
            rank,
            participant_id: participant.id,
            model_name: participant.model_name.clone(),
            solved: participant.solved,
            total_penalty_seconds: participant.total_penalty_seconds,
        }
    }
}

/// Leaderboard snapshot returned by the read endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardResponse {
    pub contest_id: i32,
    pub participants: Vec<LeaderboardRow>,
    pub updated_at: DateTime<Utc>,
}
