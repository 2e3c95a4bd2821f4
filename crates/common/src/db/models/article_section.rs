//! Article section entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article_sections")]
pub struct Model {
    /// Sections of one article are ordered by this id
    #[sea_orm(primary_key)]
    pub id: i32,

    pub article_id: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub section_title: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub html_content: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
