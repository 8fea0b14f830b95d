use std::collections::HashMap;

use chrono::Utc;
use common::ContestState;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::{contest, contest_problem, problem, problem_result};
use crate::store::participants::{self, ParticipantData};

/// A contest snapshot with its problems (in contest order) and participants
/// (in leaderboard order) with their problem results.
#[derive(Clone, Debug)]
pub struct ContestData {
    pub contest: contest::Model,
    pub problems: Vec<problem::Model>,
    pub participants: Vec<ParticipantData>,
}

pub async fn create_contest<C: ConnectionTrait>(
    db: &C,
    state: ContestState,
    started_at: chrono::DateTime<Utc>,
    ends_at: chrono::DateTime<Utc>,
    num_problems: i32,
) -> Result<contest::Model, DbErr> {
    let now = Utc::now();
    contest::ActiveModel {
        state: Set(state),
        started_at: Set(started_at),
        ends_at: Set(ends_at),
        num_problems: Set(num_problems),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get_contest_row<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<contest::Model>, DbErr> {
    contest::Entity::find_by_id(id).one(db).await
}

/// Eager read: contest plus problems in `problem_order` plus participants
/// with their problem results.
pub async fn get_contest<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<ContestData>, DbErr> {
    let Some(row) = get_contest_row(db, id).await? else {
        return Ok(None);
    };

    Ok(Some(load_contest_data(db, row).await?))
}

async fn load_contest_data<C: ConnectionTrait>(
    db: &C,
    row: contest::Model,
) -> Result<ContestData, DbErr> {
    let problems = get_problems_by_contest(db, row.id).await?;
    let participant_rows = participants::get_participants_by_contest(db, row.id).await?;

    let participant_ids: Vec<i32> = participant_rows.iter().map(|p| p.id).collect();
    let mut results_by_participant: HashMap<i32, Vec<problem_result::Model>> = HashMap::new();
    if !participant_ids.is_empty() {
        let results = problem_result::Entity::find()
            .filter(problem_result::Column::ParticipantId.is_in(participant_ids))
            .all(db)
            .await?;
        for result in results {
            results_by_participant
                .entry(result.participant_id)
                .or_default()
                .push(result);
        }
    }

    let participants = participant_rows
        .into_iter()
        .map(|p| {
            let problem_results = results_by_participant.remove(&p.id).unwrap_or_default();
            ParticipantData {
                participant: p,
                problem_results,
            }
        })
        .collect();

    Ok(ContestData {
        contest: row,
        problems,
        participants,
    })
}

/// Problems of a contest in `problem_order`.
pub async fn get_problems_by_contest<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<Vec<problem::Model>, DbErr> {
    let links = contest_problem::Entity::find()
        .filter(contest_problem::Column::ContestId.eq(contest_id))
        .order_by_asc(contest_problem::Column::ProblemOrder)
        .all(db)
        .await?;

    if links.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<i32> = links.iter().map(|l| l.problem_id).collect();
    let mut by_id: HashMap<i32, problem::Model> = problem::Entity::find()
        .filter(problem::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(links
        .iter()
        .filter_map(|link| by_id.remove(&link.problem_id))
        .collect())
}

/// Most recent contests first, each with the full eager snapshot.
pub async fn list_contests<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<ContestData>, DbErr> {
    let rows = contest::Entity::find()
        .order_by_desc(contest::Column::CreatedAt)
        .limit(Some(limit))
        .all(db)
        .await?;

    let mut contests = Vec::with_capacity(rows.len());
    for row in rows {
        contests.push(load_contest_data(db, row).await?);
    }
    Ok(contests)
}

pub async fn update_contest_state<C: ConnectionTrait>(
    db: &C,
    id: i32,
    state: ContestState,
) -> Result<(), DbErr> {
    contest::ActiveModel {
        id: Set(id),
        state: Set(state),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Contests persisted as `RUNNING`; the coordinator rehydrates these at
/// startup.
pub async fn get_running_contests<C: ConnectionTrait>(
    db: &C,
) -> Result<Vec<contest::Model>, DbErr> {
    contest::Entity::find()
        .filter(contest::Column::State.eq(ContestState::Running))
        .order_by_asc(contest::Column::Id)
        .all(db)
        .await
}

pub async fn add_problem_to_contest<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    problem_id: i32,
    problem_order: i32,
) -> Result<(), DbErr> {
    contest_problem::ActiveModel {
        contest_id: Set(contest_id),
        problem_id: Set(problem_id),
        problem_order: Set(problem_order),
    }
    .insert(db)
    .await?;
    Ok(())
}
