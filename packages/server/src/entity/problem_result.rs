use common::ProblemStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "problem_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub participant_id: i32,
    #[sea_orm(primary_key)]
    pub problem_id: i32,

    pub status: ProblemStatus,
    /// Wrong submissions accrued while the problem was unsolved.
    #[sea_orm(default_value = 0)]
    pub penalty_count: i32,
    /// Seconds from contest start to the first accepted submission.
    #[sea_orm(default_value = 0)]
    pub penalty_seconds: i32,

    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: BelongsTo<super::participant::Entity>,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: BelongsTo<super::problem::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
