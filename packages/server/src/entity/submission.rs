use common::{Language, SubmissionStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    pub participant_id: i32,
    pub problem_id: i32,

    #[sea_orm(column_type = "Text")]
    pub code: String,
    pub language: Language,

    pub status: SubmissionStatus,
    #[sea_orm(column_type = "Text")]
    pub verdict_message: String,

    #[sea_orm(default_value = 0)]
    pub total_test_cases: i32,
    #[sea_orm(default_value = 0)]
    pub processed_test_cases: i32,

    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,
    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: HasOne<super::participant::Entity>,
    #[sea_orm(belongs_to, from = "problem_id", to = "id")]
    pub problem: HasOne<super::problem::Entity>,

    pub submitted_at: DateTimeUtc,
    /// Set once, when a terminal verdict is recorded.
    pub judged_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
