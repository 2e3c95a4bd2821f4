//! Article handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{non_blank, validation_error};
use crate::AppState;
use medarticles_common::{
    db::{
        models::{Article, ArticleSection},
        ArticleFilter, ArticleSummary, FullArticleUpdate, NewArticle, SectionInput,
    },
    errors::{AppError, Result},
};

/// Listing timestamps use the day-first format of the editorial UI
const LISTING_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    10
}

/// Query string of the article listing
#[derive(Debug, Deserialize, Validate)]
pub struct ListArticlesQuery {
    pub search: Option<String>,

    /// Comma-separated medical section ids
    pub section_ids: Option<String>,

    /// Comma-separated versions
    pub versions: Option<String>,

    pub is_archived: Option<bool>,

    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u64,

    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100))]
    pub per_page: u64,
}

impl ListArticlesQuery {
    fn to_filter(&self) -> Result<ArticleFilter> {
        let section_ids = split_list(self.section_ids.as_deref())
            .map(|id| {
                id.parse::<i32>().map_err(|_| AppError::InvalidFormat {
                    message: format!("section_ids: '{}' is not an integer", id),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ArticleFilter {
            search: non_blank(self.search.clone()),
            section_ids,
            versions: split_list(self.versions.as_deref()).map(str::to_string).collect(),
            is_archived: self.is_archived,
        })
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn format_listing_date(value: NaiveDateTime) -> String {
    value.format(LISTING_DATE_FORMAT).to_string()
}

#[derive(Debug, Serialize)]
pub struct ArticleListItem {
    pub id: i32,
    pub title: String,
    pub medical_section: Option<String>,
    pub version: Option<String>,
    pub mkb: Option<String>,
    pub is_archived: bool,
    pub updated_at: Option<String>,
}

impl From<ArticleSummary> for ArticleListItem {
    fn from(row: ArticleSummary) -> Self {
        Self {
            id: row.id,
            title: row.title,
            medical_section: row.medical_section,
            version: row.version,
            mkb: row.mkb,
            is_archived: row.is_archived,
            updated_at: row.updated_at.map(format_listing_date),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub items: Vec<ArticleListItem>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Distinct article versions
pub async fn list_versions(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let versions = state.repository().list_versions().await?;
    Ok(Json(versions))
}

/// Filtered, paginated article listing
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<ArticleListResponse>> {
    query.validate().map_err(validation_error)?;
    let filter = query.to_filter()?;

    let page = state
        .repository()
        .list_articles(&filter, query.page, query.per_page)
        .await?;

    Ok(Json(ArticleListResponse {
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: query.page,
        per_page: query.per_page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: Option<String>,
    pub medical_section: Option<String>,
    pub version: Option<String>,
    pub mkb: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: i32,
    pub title: String,
    pub version: Option<String>,
    pub medical_section: Option<String>,
    pub mkb: Option<String>,
    pub is_archived: bool,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            version: article.version,
            medical_section: article.medical_section,
            mkb: article.mkb,
            is_archived: article.is_archived,
            updated_at: article.updated_at,
        }
    }
}

/// Create an article without sections
pub async fn create_article(
    State(state): State<AppState>,
    Json(request): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>)> {
    let title = non_blank(request.title).ok_or_else(|| AppError::MissingField {
        field: "title".to_string(),
    })?;
    let medical_section =
        non_blank(request.medical_section).ok_or_else(|| AppError::MissingField {
            field: "medical_section".to_string(),
        })?;

    let article = state
        .repository()
        .create_article(NewArticle {
            title,
            medical_section,
            version: request.version,
            mkb: request.mkb,
            is_archived: request.is_archived,
        })
        .await?;

    tracing::info!(article_id = article.id, "Article created");

    Ok((StatusCode::CREATED, Json(article.into())))
}

#[derive(Debug, Serialize)]
pub struct SectionContent {
    pub section_id: i32,
    pub html_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleContentResponse {
    pub title: String,
    pub mkb: Option<String>,
    pub version: Option<String>,
    pub medical_section: Option<String>,
    pub is_archived: bool,
    /// Sections that carry content
    pub contents: Vec<SectionContent>,
}

/// Article metadata with the content of its non-empty sections
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ArticleContentResponse>> {
    let (article, sections) = state.repository().get_article_with_sections(id).await?;

    let contents = sections
        .into_iter()
        .filter(|s| s.html_content.as_deref().is_some_and(|html| !html.is_empty()))
        .map(|s| SectionContent {
            section_id: s.id,
            html_content: s.html_content,
        })
        .collect();

    Ok(Json(ArticleContentResponse {
        title: article.title,
        mkb: article.mkb,
        version: article.version,
        medical_section: article.medical_section,
        is_archived: article.is_archived,
        contents,
    }))
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    pub id: i32,
    pub section_title: Option<String>,
    pub html_content: Option<String>,
}

impl From<ArticleSection> for SectionView {
    fn from(section: ArticleSection) -> Self {
        Self {
            id: section.id,
            section_title: section.section_title,
            html_content: section.html_content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FullArticleResponse {
    pub id: i32,
    pub title: String,
    pub mkb: Option<String>,
    pub version: Option<String>,
    pub medical_section: Option<String>,
    pub is_archived: bool,
    pub sections: Vec<SectionView>,
}

/// Article metadata with every section in order
pub async fn get_full_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FullArticleResponse>> {
    let (article, sections) = state.repository().get_article_with_sections(id).await?;

    Ok(Json(FullArticleResponse {
        id: article.id,
        title: article.title,
        mkb: article.mkb,
        version: article.version,
        medical_section: article.medical_section,
        is_archived: article.is_archived,
        sections: sections.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SectionPayload {
    #[serde(alias = "title")]
    pub section_title: Option<String>,
    pub html_content: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FullArticleRequest {
    #[validate(length(min = 1))]
    pub title: String,
    pub mkb: Option<String>,
    pub version: Option<String>,
    pub medical_section: Option<String>,
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub sections: Vec<SectionPayload>,
}

impl From<FullArticleRequest> for FullArticleUpdate {
    fn from(request: FullArticleRequest) -> Self {
        Self {
            title: request.title,
            mkb: request.mkb,
            version: request.version,
            medical_section: request.medical_section,
            is_archived: request.is_archived,
            sections: request
                .sections
                .into_iter()
                .map(|s| SectionInput {
                    section_title: s.section_title,
                    html_content: s.html_content,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub status: &'static str,
    pub article_id: i32,
}

/// Replace article metadata and all of its sections
pub async fn update_full_article(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<FullArticleRequest>,
) -> Result<Json<UpdateStatusResponse>> {
    request.validate().map_err(validation_error)?;

    let section_count = request.sections.len();
    state
        .repository()
        .update_full_article(id, request.into())
        .await?;

    tracing::info!(article_id = id, sections = section_count, "Article replaced");

    Ok(Json(UpdateStatusResponse {
        status: "success",
        article_id: id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use crate::testing::{get_request, json_request, send, state, state_with};
    use chrono::NaiveDate;
    use medarticles_common::config::RateLimitConfig;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn query(section_ids: Option<&str>, versions: Option<&str>) -> ListArticlesQuery {
        ListArticlesQuery {
            search: Some("  ".to_string()),
            section_ids: section_ids.map(str::to_string),
            versions: versions.map(str::to_string),
            is_archived: Some(true),
            page: 1,
            per_page: 10,
        }
    }

    fn article(id: i32) -> Article {
        Article {
            id,
            title: "Мигрень".to_string(),
            url: None,
            medical_section: Some("Неврология".to_string()),
            version: Some("2024".to_string()),
            mkb: Some("G43".to_string()),
            is_archived: false,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_filter_parsing() {
        let filter = query(Some("1, 4,,7"), Some("2023 ,2024,")).to_filter().unwrap();

        assert_eq!(filter.section_ids, vec![1, 4, 7]);
        assert_eq!(filter.versions, vec!["2023", "2024"]);
        assert_eq!(filter.search, None);
        assert_eq!(filter.is_archived, Some(true));
    }

    #[test]
    fn test_invalid_section_id() {
        let err = query(Some("1,abc"), None).to_filter().unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));
    }

    #[test]
    fn test_pagination_bounds() {
        let mut q = query(None, None);
        assert!(q.validate().is_ok());

        q.per_page = 101;
        assert!(q.validate().is_err());

        q.per_page = 10;
        q.page = 0;
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_listing_date_format() {
        let value = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(7, 8, 9))
            .unwrap();
        assert_eq!(format_listing_date(value), "05.03.2024 07:08:09");
    }

    #[test]
    fn test_section_payload_accepts_title_alias() {
        let request: FullArticleRequest = serde_json::from_value(json!({
            "title": "Мигрень",
            "sections": [
                { "title": "Лечение", "html_content": "<p>Покой</p>" },
                { "section_title": "Профилактика" }
            ]
        }))
        .unwrap();

        let update = FullArticleUpdate::from(request);
        assert_eq!(update.sections[0].section_title.as_deref(), Some("Лечение"));
        assert_eq!(update.sections[1].section_title.as_deref(), Some("Профилактика"));
        assert_eq!(update.sections[1].html_content, None);
        assert_eq!(update.is_archived, None);
    }

    #[tokio::test]
    async fn test_unaddressable_page_is_400() {
        let (response, json) =
            send(create_router(state()), get_request("/articles?page=18446744073709551615")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_missing_article_is_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Article>::new()]);
        let app = create_router(state_with(db, RateLimitConfig::default()));

        let (response, json) = send(app, get_request("/articles/42/full")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "ARTICLE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_get_article_skips_empty_sections() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![article(9)]])
            .append_query_results([vec![
                ArticleSection {
                    id: 1,
                    article_id: 9,
                    section_title: Some("Общая информация".to_string()),
                    html_content: Some("<p>Текст</p>".to_string()),
                },
                ArticleSection {
                    id: 2,
                    article_id: 9,
                    section_title: Some("Пусто".to_string()),
                    html_content: Some(String::new()),
                },
            ]]);
        let app = create_router(state_with(db, RateLimitConfig::default()));

        let (response, json) = send(app, get_request("/articles/9")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json["title"], "Мигрень");
        assert_eq!(
            json["contents"],
            json!([{ "section_id": 1, "html_content": "<p>Текст</p>" }])
        );
    }

    #[tokio::test]
    async fn test_create_requires_medical_section() {
        let app = create_router(state_with(
            MockDatabase::new(DatabaseBackend::Postgres),
            RateLimitConfig::default(),
        ));
        let request = json_request("POST", "/articles", json!({ "title": "Мигрень" }));

        let (response, json) = send(app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["field"], "medical_section");
    }
}
