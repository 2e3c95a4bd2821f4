//! Section editing handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::non_blank;
use crate::AppState;
use medarticles_common::errors::{AppError, Result};

/// Section body; `title` and `section_title` are interchangeable
#[derive(Debug, Default, Deserialize)]
pub struct SectionRequest {
    pub title: Option<String>,
    pub section_title: Option<String>,
    pub html_content: Option<String>,
}

impl SectionRequest {
    fn resolved_title(&mut self) -> Result<String> {
        non_blank(self.title.take())
            .or_else(|| non_blank(self.section_title.take()))
            .ok_or_else(|| AppError::MissingField {
                field: "title".to_string(),
            })
    }
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub id: i32,
    pub section_title: Option<String>,
    pub html_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedSectionResponse {
    pub id: i32,
    pub section_title: Option<String>,
    pub html_content: Option<String>,
    /// Refreshed modification time of the owning article
    pub updated_at: NaiveDateTime,
}

/// Append a section to an article
pub async fn create_section(
    State(state): State<AppState>,
    Path(article_id): Path<i32>,
    Json(mut request): Json<SectionRequest>,
) -> Result<(StatusCode, Json<SectionResponse>)> {
    let title = request.resolved_title()?;
    let html_content = request.html_content.unwrap_or_default();

    let section = state
        .repository()
        .create_section(article_id, title, html_content)
        .await?;

    tracing::info!(article_id, section_id = section.id, "Section created");

    Ok((
        StatusCode::CREATED,
        Json(SectionResponse {
            id: section.id,
            section_title: section.section_title,
            html_content: section.html_content,
        }),
    ))
}

/// Rewrite one section of an article
pub async fn update_section(
    State(state): State<AppState>,
    Path((article_id, section_id)): Path<(i32, i32)>,
    Json(mut request): Json<SectionRequest>,
) -> Result<Json<UpdatedSectionResponse>> {
    let title = request.resolved_title()?;
    let html_content =
        non_blank(request.html_content.take()).ok_or_else(|| AppError::MissingField {
            field: "html_content".to_string(),
        })?;

    let (section, updated_at) = state
        .repository()
        .update_section(article_id, section_id, title, html_content)
        .await?;

    tracing::info!(article_id, section_id, "Section updated");

    Ok(Json(UpdatedSectionResponse {
        id: section.id,
        section_title: section.section_title,
        html_content: section.html_content,
        updated_at,
    }))
}
