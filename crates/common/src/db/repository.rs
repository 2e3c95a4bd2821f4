//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::assistant::{ArticleMatch, ArticleStore, SectionText, TermLookup};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, QueryFilter, QueryOrder, QueryResult, QuerySelect, Set, Statement,
    TransactionTrait, Value,
};
use serde::Serialize;
use tracing::debug;

/// Filters for the article listing
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    /// Case-insensitive substring of title or classification code
    pub search: Option<String>,
    /// Medical section catalogue ids
    pub section_ids: Vec<i32>,
    pub versions: Vec<String>,
    pub is_archived: Option<bool>,
}

/// Row of the article listing
#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct ArticleSummary {
    pub id: i32,
    pub title: String,
    pub medical_section: Option<String>,
    pub version: Option<String>,
    pub mkb: Option<String>,
    pub is_archived: bool,
    /// Last modification, falling back to creation time
    pub updated_at: Option<NaiveDateTime>,
}

/// One page of the article listing
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub items: Vec<ArticleSummary>,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub medical_section: String,
    pub version: Option<String>,
    pub mkb: Option<String>,
    pub is_archived: bool,
}

#[derive(Debug, Clone)]
pub struct SectionInput {
    pub section_title: Option<String>,
    pub html_content: Option<String>,
}

/// Replacement metadata and sections for an article
#[derive(Debug, Clone)]
pub struct FullArticleUpdate {
    pub title: String,
    pub mkb: Option<String>,
    pub version: Option<String>,
    pub medical_section: Option<String>,
    /// Left unchanged when absent
    pub is_archived: Option<bool>,
    pub sections: Vec<SectionInput>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Distinct non-empty versions, sorted
    pub async fn list_versions(&self) -> Result<Vec<String>> {
        ArticleEntity::find()
            .select_only()
            .column(ArticleColumn::Version)
            .distinct()
            .filter(ArticleColumn::Version.is_not_null())
            .filter(ArticleColumn::Version.ne(""))
            .order_by_asc(ArticleColumn::Version)
            .into_tuple::<String>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Page through articles that reference at least one catalogued medical section
    pub async fn list_articles(
        &self,
        filter: &ArticleFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ArticlePage> {
        let offset = page_offset(page, per_page)?;
        let per_page_limit = i64::try_from(per_page).map_err(|_| AppError::InvalidFormat {
            message: format!("per_page out of range: {}", per_page),
        })?;
        let mut clause = WhereClause::from_filter(filter);
        let where_sql = clause.to_sql();

        let count_sql = format!(
            r#"
            SELECT COUNT(DISTINCT a.id) AS total
            FROM articles a
            CROSS JOIN unnest(string_to_array(a.medical_section, ',')) AS section_name
            INNER JOIN medical_sections ms ON trim(ms.name) = trim(section_name)
            {}
            "#,
            where_sql
        );

        let total = self
            .read_conn()
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &count_sql,
                clause.values.clone(),
            ))
            .await?
            .map(|row| row.try_get::<i64>("", "total"))
            .transpose()?
            .unwrap_or(0);

        let limit_param = clause.bind(per_page_limit);
        let offset_param = clause.bind(offset);

        let data_sql = format!(
            r#"
            SELECT DISTINCT a.id, a.title, a.medical_section, a.version, a.mkb, a.is_archived,
                   COALESCE(a.updated_at, a.created_at) AS updated_at
            FROM articles a
            CROSS JOIN unnest(string_to_array(a.medical_section, ',')) AS section_name
            INNER JOIN medical_sections ms ON trim(ms.name) = trim(section_name)
            {}
            ORDER BY a.id
            LIMIT {} OFFSET {}
            "#,
            where_sql, limit_param, offset_param
        );

        let items = ArticleSummary::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &data_sql,
            clause.values,
        ))
        .all(self.read_conn())
        .await?;

        debug!(total, returned = items.len(), page, per_page, "Listed articles");

        Ok(ArticlePage {
            items,
            total: total.max(0) as u64,
        })
    }

    /// Create a new article
    pub async fn create_article(&self, new: NewArticle) -> Result<Article> {
        let now = chrono::Utc::now().naive_utc();

        let article = ArticleActiveModel {
            id: NotSet,
            title: Set(new.title),
            url: Set(None),
            medical_section: Set(Some(new.medical_section)),
            version: Set(new.version),
            mkb: Set(new.mkb),
            is_archived: Set(new.is_archived),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        article.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find article by ID
    pub async fn find_article_by_id(&self, id: i32) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Article with all of its sections in id order
    pub async fn get_article_with_sections(
        &self,
        id: i32,
    ) -> Result<(Article, Vec<ArticleSection>)> {
        let article = self
            .find_article_by_id(id)
            .await?
            .ok_or(AppError::ArticleNotFound { id })?;

        let sections = ArticleSectionEntity::find()
            .filter(ArticleSectionColumn::ArticleId.eq(id))
            .order_by_asc(ArticleSectionColumn::Id)
            .all(self.read_conn())
            .await?;

        Ok((article, sections))
    }

    /// Replace metadata and every section of an article atomically
    pub async fn update_full_article(&self, id: i32, update: FullArticleUpdate) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let mut article: ArticleActiveModel = ArticleEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::ArticleNotFound { id })?
            .into();

        article.title = Set(update.title);
        article.mkb = Set(update.mkb);
        article.version = Set(update.version);
        article.medical_section = Set(update.medical_section);
        if let Some(archived) = update.is_archived {
            article.is_archived = Set(archived);
        }
        article.update(&txn).await?;

        let removed = ArticleSectionEntity::delete_many()
            .filter(ArticleSectionColumn::ArticleId.eq(id))
            .exec(&txn)
            .await?;

        let section_count = update.sections.len();
        if section_count > 0 {
            let sections = update.sections.into_iter().map(|s| ArticleSectionActiveModel {
                id: NotSet,
                article_id: Set(id),
                section_title: Set(s.section_title),
                html_content: Set(s.html_content),
            });
            ArticleSectionEntity::insert_many(sections).exec(&txn).await?;
        }

        txn.commit().await?;

        debug!(
            article_id = id,
            removed = removed.rows_affected,
            inserted = section_count,
            "Article replaced"
        );

        Ok(())
    }

    // ========================================================================
    // Section Operations
    // ========================================================================

    /// Append a section to an existing article
    pub async fn create_section(
        &self,
        article_id: i32,
        section_title: String,
        html_content: String,
    ) -> Result<ArticleSection> {
        let txn = self.write_conn().begin().await?;

        ArticleEntity::find_by_id(article_id)
            .one(&txn)
            .await?
            .ok_or(AppError::ArticleNotFound { id: article_id })?;

        let section = ArticleSectionActiveModel {
            id: NotSet,
            article_id: Set(article_id),
            section_title: Set(Some(section_title)),
            html_content: Set(Some(html_content)),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(section)
    }

    /// Rewrite one section and bump the article's modification time
    pub async fn update_section(
        &self,
        article_id: i32,
        section_id: i32,
        section_title: String,
        html_content: String,
    ) -> Result<(ArticleSection, NaiveDateTime)> {
        let txn = self.write_conn().begin().await?;

        let mut section: ArticleSectionActiveModel = ArticleSectionEntity::find_by_id(section_id)
            .filter(ArticleSectionColumn::ArticleId.eq(article_id))
            .one(&txn)
            .await?
            .ok_or(AppError::SectionNotFound {
                article_id,
                section_id,
            })?
            .into();

        section.section_title = Set(Some(section_title));
        section.html_content = Set(Some(html_content));
        let section = section.update(&txn).await?;

        let now = chrono::Utc::now().naive_utc();
        ArticleEntity::update_many()
            .col_expr(ArticleColumn::UpdatedAt, Expr::value(now))
            .filter(ArticleColumn::Id.eq(article_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok((section, now))
    }

    // ========================================================================
    // Medical Section Catalogue
    // ========================================================================

    pub async fn list_medical_sections(&self) -> Result<Vec<MedicalSection>> {
        MedicalSectionEntity::find()
            .order_by_asc(MedicalSectionColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl ArticleStore for Repository {
    async fn find_by_term(&self, term: &str) -> Result<TermLookup> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT id, title FROM articles WHERE LOWER(title) LIKE $1 OR LOWER(mkb) LIKE $1 LIMIT 1",
            [Value::from(format!("%{}%", term))],
        );

        let row = self.read_conn().query_one(stmt).await?;
        term_lookup_from_row(row.as_ref())
    }

    async fn leading_sections(&self, article_id: i32, limit: u64) -> Result<Vec<SectionText>> {
        let sections = ArticleSectionEntity::find()
            .filter(ArticleSectionColumn::ArticleId.eq(article_id))
            .order_by_asc(ArticleSectionColumn::Id)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok(sections
            .into_iter()
            .map(|s| SectionText {
                title: s.section_title.unwrap_or_default(),
                html: s.html_content.unwrap_or_default(),
            })
            .collect())
    }
}

/// Row offset of a 1-based page; pages past the addressable range are rejected
fn page_offset(page: u64, per_page: u64) -> Result<i64> {
    page.saturating_sub(1)
        .checked_mul(per_page)
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(|| AppError::InvalidFormat {
            message: format!("page out of range: {}", page),
        })
}

/// Adapt a term lookup row into a typed lookup result
fn term_lookup_from_row(row: Option<&QueryResult>) -> Result<TermLookup> {
    let Some(row) = row else {
        return Ok(TermLookup::Miss);
    };

    let (id, title) = match (
        row.try_get::<Option<i32>>("", "id"),
        row.try_get::<Option<String>>("", "title"),
    ) {
        (Ok(id), Ok(title)) => (id, title),
        (Err(e), _) | (_, Err(e)) => {
            return Ok(TermLookup::Malformed(format!("unreadable article row: {}", e)));
        }
    };

    Ok(match (id, title) {
        (Some(id), Some(title)) => TermLookup::Hit(ArticleMatch { id, title }),
        (None, _) => TermLookup::Malformed("article row without id".to_string()),
        (Some(id), None) => TermLookup::Malformed(format!("article {} has no title", id)),
    })
}

/// Positional WHERE clause for the article listing
struct WhereClause {
    conditions: Vec<String>,
    values: Vec<Value>,
}

impl WhereClause {
    fn from_filter(filter: &ArticleFilter) -> Self {
        let mut clause = Self {
            conditions: Vec::new(),
            values: Vec::new(),
        };

        if !filter.section_ids.is_empty() {
            let params = clause.bind_all(filter.section_ids.iter().copied());
            clause.conditions.push(format!("ms.id IN ({})", params));
        }

        if !filter.versions.is_empty() {
            let params = clause.bind_all(filter.versions.iter().cloned());
            clause.conditions.push(format!("a.version IN ({})", params));
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let param = clause.bind(format!("%{}%", search));
            clause
                .conditions
                .push(format!("(a.title ILIKE {0} OR a.mkb ILIKE {0})", param));
        }

        if let Some(archived) = filter.is_archived {
            let param = clause.bind(archived);
            clause.conditions.push(format!("a.is_archived = {}", param));
        }

        clause
    }

    /// Add a value and return its placeholder
    fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }

    fn bind_all<V: Into<Value>>(&mut self, values: impl IntoIterator<Item = V>) -> String {
        values
            .into_iter()
            .map(|v| self.bind(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;

    fn repository(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    fn term_row(id: Value, title: Value) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("id", id), ("title", title)])
    }

    #[tokio::test]
    async fn test_find_by_term_hit() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            term_row(Value::from(7), Value::from("Хронический гастрит")),
        ]]);

        let lookup = repository(db).find_by_term("гастрит").await.unwrap();

        assert_eq!(
            lookup,
            TermLookup::Hit(ArticleMatch {
                id: 7,
                title: "Хронический гастрит".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_find_by_term_miss() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()]);

        let lookup = repository(db).find_by_term("перелом").await.unwrap();
        assert_eq!(lookup, TermLookup::Miss);
    }

    #[tokio::test]
    async fn test_find_by_term_row_without_title() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![term_row(Value::from(3), Value::String(None))]]);

        let lookup = repository(db).find_by_term("ангина").await.unwrap();
        assert!(matches!(lookup, TermLookup::Malformed(_)));
    }

    #[tokio::test]
    async fn test_find_by_term_row_without_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![term_row(Value::Int(None), Value::from("Ангина"))]]);

        let lookup = repository(db).find_by_term("ангина").await.unwrap();
        assert!(matches!(lookup, TermLookup::Malformed(_)));
    }

    #[tokio::test]
    async fn test_find_by_term_row_with_mistyped_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            term_row(Value::from("seven"), Value::from("Ангина")),
        ]]);

        let lookup = repository(db).find_by_term("ангина").await.unwrap();
        assert!(matches!(lookup, TermLookup::Malformed(_)));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 10).unwrap(), 0);
        assert_eq!(page_offset(3, 25).unwrap(), 50);
        assert_eq!(page_offset(0, 10).unwrap(), 0);
    }

    #[test]
    fn test_page_offset_out_of_range() {
        let err = page_offset(u64::MAX, 100).unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));

        // Fits in u64 but not in a Postgres bigint
        assert!(page_offset(i64::MAX as u64 + 2, 1).is_err());
    }

    #[tokio::test]
    async fn test_list_articles_rejects_huge_page_before_querying() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let err = repository(db)
            .list_articles(&ArticleFilter::default(), u64::MAX, 100)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_leading_sections_defaults_missing_fields() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([vec![
            ArticleSection {
                id: 1,
                article_id: 7,
                section_title: Some("Общая информация".to_string()),
                html_content: Some("<p>Текст</p>".to_string()),
            },
            ArticleSection {
                id: 2,
                article_id: 7,
                section_title: None,
                html_content: None,
            },
        ]]);

        let sections = repository(db).leading_sections(7, 3).await.unwrap();

        assert_eq!(
            sections,
            vec![
                SectionText {
                    title: "Общая информация".to_string(),
                    html: "<p>Текст</p>".to_string()
                },
                SectionText {
                    title: String::new(),
                    html: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_where_clause_empty() {
        let clause = WhereClause::from_filter(&ArticleFilter::default());
        assert_eq!(clause.to_sql(), "");
        assert!(clause.values.is_empty());
    }

    #[test]
    fn test_where_clause_all_filters() {
        let filter = ArticleFilter {
            search: Some("гастр".to_string()),
            section_ids: vec![1, 4],
            versions: vec!["2024".to_string()],
            is_archived: Some(false),
        };

        let mut clause = WhereClause::from_filter(&filter);

        assert_eq!(
            clause.to_sql(),
            "WHERE ms.id IN ($1, $2) AND a.version IN ($3) \
             AND (a.title ILIKE $4 OR a.mkb ILIKE $4) AND a.is_archived = $5"
        );
        assert_eq!(clause.values[3], Value::from("%гастр%".to_string()));

        // Pagination placeholders continue the numbering
        assert_eq!(clause.bind(10i64), "$6");
    }

    #[test]
    fn test_where_clause_ignores_blank_search() {
        let filter = ArticleFilter {
            search: Some(String::new()),
            ..ArticleFilter::default()
        };
        assert_eq!(WhereClause::from_filter(&filter).to_sql(), "");
    }
}
