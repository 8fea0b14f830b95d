use chrono::Utc;
use common::ProblemTag;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};

use crate::entity::{contest_problem, problem, problem_result, submission, test_case};

pub struct NewProblem {
    pub name: String,
    pub description: String,
    pub time_limit_ms: i32,
    pub memory_limit_mb: i32,
    pub tag: ProblemTag,
    pub source: String,
    /// `(input, expected_output)` pairs in test order.
    pub test_cases: Vec<(String, String)>,
}

/// Create a problem and its ordered test cases in one transaction.
pub async fn create_problem<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    new: NewProblem,
) -> Result<problem::Model, DbErr> {
    let txn = db.begin().await?;
    let now = Utc::now();

    let model = problem::ActiveModel {
        name: Set(new.name),
        description: Set(new.description),
        time_limit_ms: Set(new.time_limit_ms),
        memory_limit_mb: Set(new.memory_limit_mb),
        tag: Set(new.tag),
        source: Set(new.source),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (order, (input, expected_output)) in new.test_cases.into_iter().enumerate() {
        test_case::ActiveModel {
            problem_id: Set(model.id),
            input: Set(input),
            expected_output: Set(expected_output),
            test_order: Set(order as i32 + 1),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok(model)
}

pub async fn get_problem<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<Option<problem::Model>, DbErr> {
    problem::Entity::find_by_id(id).one(db).await
}

pub async fn list_problems<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<problem::Model>, DbErr> {
    problem::Entity::find()
        .order_by_desc(problem::Column::CreatedAt)
        .limit(Some(limit))
        .all(db)
        .await
}

pub async fn count_problems<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    problem::Entity::find().count(db).await
}

/// A uniformly random selection of `n` problems.
pub async fn get_random_problems<C: ConnectionTrait>(
    db: &C,
    n: u64,
) -> Result<Vec<problem::Model>, DbErr> {
    problem::Entity::find()
        .order_by(Expr::cust("RANDOM()"), Order::Asc)
        .limit(Some(n))
        .all(db)
        .await
}

/// Test cases of a problem in ascending `test_order`.
pub async fn get_test_cases_by_problem<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<Vec<test_case::Model>, DbErr> {
    test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .order_by_asc(test_case::Column::TestOrder)
        .all(db)
        .await
}

pub async fn count_test_cases_by_problem<C: ConnectionTrait>(
    db: &C,
    problem_id: i32,
) -> Result<u64, DbErr> {
    test_case::Entity::find()
        .filter(test_case::Column::ProblemId.eq(problem_id))
        .count(db)
        .await
}

/// Delete a problem and everything hanging off it (test cases, problem
/// results, submissions, and contest join rows) in one transaction.
pub async fn delete_problem<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    id: i32,
) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    test_case::Entity::delete_many()
        .filter(test_case::Column::ProblemId.eq(id))
        .exec(&txn)
        .await?;
    problem_result::Entity::delete_many()
        .filter(problem_result::Column::ProblemId.eq(id))
        .exec(&txn)
        .await?;
    submission::Entity::delete_many()
        .filter(submission::Column::ProblemId.eq(id))
        .exec(&txn)
        .await?;
    contest_problem::Entity::delete_many()
        .filter(contest_problem::Column::ProblemId.eq(id))
        .exec(&txn)
        .await?;
    problem::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await
}
