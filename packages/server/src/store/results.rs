use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::entity::problem_result;

/// Insert or update the scoring record keyed by (participant_id, problem_id).
pub async fn upsert_problem_result<C: ConnectionTrait>(
    db: &C,
    result: &problem_result::Model,
) -> Result<(), DbErr> {
    let model = problem_result::ActiveModel {
        participant_id: Set(result.participant_id),
        problem_id: Set(result.problem_id),
        status: Set(result.status),
        penalty_count: Set(result.penalty_count),
        penalty_seconds: Set(result.penalty_seconds),
    };

    problem_result::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                problem_result::Column::ParticipantId,
                problem_result::Column::ProblemId,
            ])
            .update_columns([
                problem_result::Column::Status,
                problem_result::Column::PenaltyCount,
                problem_result::Column::PenaltySeconds,
            ])
            .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

pub async fn get_results_by_participant<C: ConnectionTrait>(
    db: &C,
    participant_id: i32,
) -> Result<Vec<problem_result::Model>, DbErr> {
    problem_result::Entity::find()
        .filter(problem_result::Column::ParticipantId.eq(participant_id))
        .all(db)
        .await
}
