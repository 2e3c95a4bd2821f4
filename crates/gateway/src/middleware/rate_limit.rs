//! Rate limiting middleware using token bucket algorithm

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use medarticles_common::errors::AppError;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::AppState;

/// Rate limiter using governor crate
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Create a new rate limiter; zero settings are raised to one
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<GlobalRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    Arc::new(RateLimiter::direct(quota))
}

/// Rate limiting middleware
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.rate_limit.enabled {
        return next.run(request).await;
    }

    match state.rate_limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            AppError::RateLimitExceeded.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use crate::testing::{json_request, send, state_with};
    use axum::http::StatusCode;
    use medarticles_common::config::RateLimitConfig;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(100, 200);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_burst_is_enforced() {
        let limiter = create_rate_limiter(1, 2);
        tokio_test::assert_ok!(limiter.check());
        tokio_test::assert_ok!(limiter.check());
        tokio_test::assert_err!(limiter.check());
    }

    #[test]
    fn test_zero_settings_do_not_panic() {
        let limiter = create_rate_limiter(0, 0);
        assert!(limiter.check().is_ok());
    }

    #[tokio::test]
    async fn test_question_endpoint_is_limited() {
        let state = state_with(
            MockDatabase::new(DatabaseBackend::Postgres),
            RateLimitConfig {
                requests_per_second: 1,
                burst: 1,
                enabled: true,
            },
        );
        let app = create_router(state);
        let body = json!({ "question": "Как? Что?" });

        let (first, _) = send(app.clone(), json_request("POST", "/ask-ai", body.clone())).await;
        assert_eq!(first.status(), StatusCode::OK);

        let (second, json) = send(app, json_request("POST", "/ask-ai", body)).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn test_disabled_limit_lets_requests_through() {
        let state = state_with(
            MockDatabase::new(DatabaseBackend::Postgres),
            RateLimitConfig {
                requests_per_second: 1,
                burst: 1,
                enabled: false,
            },
        );
        let app = create_router(state);

        for _ in 0..3 {
            let request = json_request("POST", "/ask-ai", json!({ "question": "Как?" }));
            let (response, _) = send(app.clone(), request).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
