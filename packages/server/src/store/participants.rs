use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::entity::{participant, problem_result};

/// A participant with their per-problem scoring records.
#[derive(Clone, Debug)]
pub struct ParticipantData {
    pub participant: participant::Model,
    pub problem_results: Vec<problem_result::Model>,
}

pub async fn create_participant<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    model_name: &str,
) -> Result<participant::Model, DbErr> {
    let now = Utc::now();
    participant::ActiveModel {
        contest_id: Set(contest_id),
        model_name: Set(model_name.to_string()),
        solved: Set(0),
        total_penalty_seconds: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get_participant<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<ParticipantData>, DbErr> {
    let Some(row) = participant::Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };

    let problem_results = problem_result::Entity::find()
        .filter(problem_result::Column::ParticipantId.eq(id))
        .all(db)
        .await?;

    Ok(Some(ParticipantData {
        participant: row,
        problem_results,
    }))
}

/// Participants in leaderboard order: solved DESC, penalty ASC, id ASC
/// (stable tie-break).
pub async fn get_participants_by_contest<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<Vec<participant::Model>, DbErr> {
    participant::Entity::find()
        .filter(participant::Column::ContestId.eq(contest_id))
        .order_by_desc(participant::Column::Solved)
        .order_by_asc(participant::Column::TotalPenaltySeconds)
        .order_by_asc(participant::Column::Id)
        .all(db)
        .await
}

pub async fn update_participant_stats<C: ConnectionTrait>(
    db: &C,
    id: i32,
    solved: i32,
    total_penalty_seconds: i32,
) -> Result<(), DbErr> {
    participant::ActiveModel {
        id: Set(id),
        solved: Set(solved),
        total_penalty_seconds: Set(total_penalty_seconds),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}
