//! Medical section catalogue

use axum::{extract::State, Json};

use crate::AppState;
use medarticles_common::{db::models::MedicalSection, errors::Result};

/// All catalogue entries ordered by name
pub async fn list_sections(State(state): State<AppState>) -> Result<Json<Vec<MedicalSection>>> {
    let sections = state.repository().list_medical_sections().await?;
    Ok(Json(sections))
}
