//! Question answering handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::AppState;
use medarticles_common::errors::Result;

#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Answer a free-text question from the article store.
///
/// Pipeline failures are rendered into the answer text, so a valid request
/// always gets a 200.
pub async fn ask_ai(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    request.validate().map_err(validation_error)?;

    tracing::info!(question_chars = request.question.chars().count(), "Question received");

    let repo = state.repository();
    let answer = state.assistant.answer(&request.question, &repo).await;

    Ok(Json(AskResponse { answer }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use crate::testing::{json_request, send, state, state_with};
    use axum::http::StatusCode;
    use medarticles_common::config::RateLimitConfig;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use serde_json::json;

    #[test]
    fn test_question_length_bounds() {
        assert!(AskRequest { question: String::new() }.validate().is_err());
        assert!(AskRequest { question: "г".repeat(2000) }.validate().is_ok());
        assert!(AskRequest { question: "г".repeat(2001) }.validate().is_err());
    }

    #[tokio::test]
    async fn test_stop_word_question_gets_no_match_message() {
        let request = json_request("POST", "/ask-ai", json!({ "question": "Как? Что на русском?" }));
        let (response, json) = send(create_router(state()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json["answer"],
            "К сожалению, не удалось найти подходящую статью по вашему вопросу."
        );
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let request = json_request("POST", "/ask-ai", json!({ "question": "" }));
        let (response, json) = send(create_router(state()), request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["field"], "question");
    }

    #[tokio::test]
    async fn test_store_failure_is_rendered_not_raised() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection reset".to_string())]);
        let request = json_request("POST", "/ask-ai", json!({ "question": "гастрит" }));

        let (response, json) =
            send(create_router(state_with(db, RateLimitConfig::default())), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let answer = json["answer"].as_str().unwrap();
        assert!(answer.starts_with("Произошла ошибка при обработке запроса: "));
        assert!(answer.contains("connection reset"));
    }
}
