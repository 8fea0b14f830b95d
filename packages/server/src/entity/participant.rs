use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub contest_id: i32,
    pub model_name: String,

    /// Derived: number of accepted problem results.
    #[sea_orm(default_value = 0)]
    pub solved: i32,
    /// Derived: accepted penalty seconds plus 60 s per prior wrong attempt.
    #[sea_orm(default_value = 0)]
    pub total_penalty_seconds: i32,

    #[sea_orm(belongs_to, from = "contest_id", to = "id")]
    pub contest: HasOne<super::contest::Entity>,

    #[sea_orm(has_many)]
    pub problem_results: HasMany<super::problem_result::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
