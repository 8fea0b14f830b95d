use chrono::Utc;
use common::{Language, SubmissionStatus};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entity::submission;

/// Statuses a verdict can still arrive for.
const NON_TERMINAL: [SubmissionStatus; 3] = [
    SubmissionStatus::Pending,
    SubmissionStatus::Compiling,
    SubmissionStatus::Running,
];

pub struct NewSubmission {
    pub contest_id: i32,
    pub participant_id: i32,
    pub problem_id: i32,
    pub code: String,
    pub language: Language,
    pub total_test_cases: i32,
}

pub async fn create_submission<C: ConnectionTrait>(
    db: &C,
    new: NewSubmission,
) -> Result<submission::Model, DbErr> {
    submission::ActiveModel {
        contest_id: Set(new.contest_id),
        participant_id: Set(new.participant_id),
        problem_id: Set(new.problem_id),
        code: Set(new.code),
        language: Set(new.language),
        status: Set(SubmissionStatus::Pending),
        verdict_message: Set(String::new()),
        total_test_cases: Set(new.total_test_cases),
        processed_test_cases: Set(0),
        submitted_at: Set(Utc::now()),
        judged_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn get_submission<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<submission::Model>, DbErr> {
    submission::Entity::find_by_id(id).one(db).await
}

/// Most recent submissions matching the optional filters.
pub async fn list_submissions<C: ConnectionTrait>(
    db: &C,
    contest_id: Option<i32>,
    participant_id: Option<i32>,
    problem_id: Option<i32>,
    limit: u64,
) -> Result<Vec<submission::Model>, DbErr> {
    let mut select = submission::Entity::find();

    if let Some(id) = contest_id {
        select = select.filter(submission::Column::ContestId.eq(id));
    }
    if let Some(id) = participant_id {
        select = select.filter(submission::Column::ParticipantId.eq(id));
    }
    if let Some(id) = problem_id {
        select = select.filter(submission::Column::ProblemId.eq(id));
    }

    select
        .order_by_desc(submission::Column::SubmittedAt)
        .order_by_desc(submission::Column::Id)
        .limit(Some(limit))
        .all(db)
        .await
}

/// Record a status transition. Terminal statuses also stamp `judged_at`.
pub async fn update_submission_status<C: ConnectionTrait>(
    db: &C,
    id: i32,
    status: SubmissionStatus,
    verdict_message: &str,
) -> Result<(), DbErr> {
    let mut model = submission::ActiveModel {
        id: Set(id),
        status: Set(status),
        verdict_message: Set(verdict_message.to_string()),
        ..Default::default()
    };
    if status.is_terminal() {
        model.judged_at = Set(Some(Utc::now()));
    }
    model.update(db).await?;
    Ok(())
}

pub async fn update_submission_progress<C: ConnectionTrait>(
    db: &C,
    id: i32,
    total_test_cases: i32,
    processed_test_cases: i32,
) -> Result<(), DbErr> {
    submission::ActiveModel {
        id: Set(id),
        total_test_cases: Set(total_test_cases),
        processed_test_cases: Set(processed_test_cases),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Fail every submission of a contest that never reached a terminal
/// verdict. Returns how many were cancelled.
pub async fn cancel_pending_submissions<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
) -> Result<u64, DbErr> {
    let result = submission::Entity::update_many()
        .col_expr(
            submission::Column::Status,
            sea_orm::sea_query::Expr::value(SubmissionStatus::JudgementFailed),
        )
        .col_expr(
            submission::Column::VerdictMessage,
            sea_orm::sea_query::Expr::value("contest ended"),
        )
        .col_expr(
            submission::Column::JudgedAt,
            sea_orm::sea_query::Expr::value(Some(Utc::now())),
        )
        .filter(submission::Column::ContestId.eq(contest_id))
        .filter(submission::Column::Status.is_in(NON_TERMINAL))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
