//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Source page on the encyclopedia site, unique when present
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub url: Option<String>,

    /// Comma-joined list of medical section names
    #[sea_orm(column_type = "Text", nullable)]
    pub medical_section: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub version: Option<String>,

    /// Disease classification code (МКБ)
    #[sea_orm(column_type = "Text", nullable)]
    pub mkb: Option<String>,

    pub is_archived: bool,

    pub created_at: Option<DateTime>,

    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_section::Entity")]
    Sections,
}

impl Related<super::article_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Last modification time, falling back to creation time
    pub fn last_modified(&self) -> Option<DateTime> {
        self.updated_at.or(self.created_at)
    }

    /// Medical section names referenced by this article
    pub fn medical_section_names(&self) -> Vec<&str> {
        self.medical_section
            .as_deref()
            .map(|s| s.split(',').map(str::trim).filter(|n| !n.is_empty()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article() -> Model {
        Model {
            id: 1,
            title: "Хронический гастрит".to_string(),
            url: None,
            medical_section: Some("Гастроэнтерология, Терапия,".to_string()),
            version: None,
            mkb: Some("K29.5".to_string()),
            is_archived: false,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 2).and_then(|d| d.and_hms_opt(3, 4, 5)),
            updated_at: None,
        }
    }

    #[test]
    fn test_last_modified_falls_back_to_created_at() {
        let mut model = article();
        assert_eq!(model.last_modified(), model.created_at);

        model.updated_at = NaiveDate::from_ymd_opt(2025, 6, 7).and_then(|d| d.and_hms_opt(8, 9, 10));
        assert_eq!(model.last_modified(), model.updated_at);
    }

    #[test]
    fn test_medical_section_names() {
        assert_eq!(article().medical_section_names(), vec!["Гастроэнтерология", "Терапия"]);
    }
}
