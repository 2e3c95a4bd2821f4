//! SeaORM entity models
//!
//! Database entities for MedArticles

mod article;
mod article_section;
mod medical_section;

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
};

pub use article_section::{
    Entity as ArticleSectionEntity,
    Model as ArticleSection,
    ActiveModel as ArticleSectionActiveModel,
    Column as ArticleSectionColumn,
};

pub use medical_section::{
    Entity as MedicalSectionEntity,
    Model as MedicalSection,
    Column as MedicalSectionColumn,
};
