//! MedArticles API Gateway
//!
//! The HTTP entry point for the article service.
//! Handles:
//! - Question answering over the article store
//! - Article and section editing
//! - Rate limiting of the question endpoint
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    BoxError, Router,
};
use medarticles_common::{
    assistant::{create_summarizer, AssistantOptions},
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    metrics::{self, LATENCY_BUCKETS, METRICS_PREFIX, SUMMARIZATION_BUCKETS},
    Assistant,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use middleware::rate_limit::{create_rate_limiter, GlobalRateLimiter};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub assistant: Arc<Assistant>,
    pub rate_limiter: Arc<GlobalRateLimiter>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        db: DbPool,
        assistant: Assistant,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let rate_limiter = create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );

        Self {
            config,
            db,
            assistant: Arc::new(assistant),
            rate_limiter,
            metrics,
        }
    }

    pub fn repository(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);

    info!(
        version = medarticles_common::VERSION,
        service = %config.observability.service_name,
        "Starting MedArticles API Gateway"
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        Some(install_metrics()?)
    } else {
        warn!("Metrics disabled");
        None
    };

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;

    // Summarization backend, shared by every question
    let summarizer = create_summarizer(&config.summarizer)?;
    info!(model = summarizer.model_name(), "Summarizer ready");

    let assistant = Assistant::new(
        summarizer,
        AssistantOptions::from_config(&config.summarizer, &config.assistant),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let shutdown_timeout = config.shutdown_timeout();

    let state = AppState::new(Arc::new(config), db, assistant, metrics_handle);
    let app = create_router(state);

    // Start the server
    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = drain_deadline(shutdown_timeout) => {
            warn!(timeout_secs = shutdown_timeout.as_secs(), "Shutdown timed out, dropping open connections");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_question_duration_seconds", METRICS_PREFIX)),
            SUMMARIZATION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_summarization_duration_seconds", METRICS_PREFIX)),
            SUMMARIZATION_BUCKETS,
        )?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    metrics::register_metrics();
    Ok(handle)
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Question endpoint (rate limited)
    let assistant_routes = Router::new()
        .route("/ask-ai", post(handlers::assistant::ask_ai))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ));

    Router::new()
        // Health endpoints
        .route("/ping", get(handlers::health::ping))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Article endpoints
        .route("/articles/versions", get(handlers::articles::list_versions))
        .route(
            "/articles",
            get(handlers::articles::list_articles).post(handlers::articles::create_article),
        )
        .route("/articles/{id}", get(handlers::articles::get_article))
        .route(
            "/articles/{id}/full",
            get(handlers::articles::get_full_article).put(handlers::articles::update_full_article),
        )

        // Section endpoints
        .route("/articles/{id}/sections", post(handlers::sections::create_section))
        .route(
            "/articles/{id}/sections/{section_id}",
            put(handlers::sections::update_section),
        )

        // Medical section catalogue
        .route("/sections", get(handlers::medical_sections::list_sections))

        .merge(assistant_routes)
        .layer(from_fn(middleware::metrics::track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(state.config.request_timeout()))
                .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Unhandled internal error: {}", err))
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

/// Resolves once a shutdown signal has arrived and the drain window has passed
async fn drain_deadline(timeout: std::time::Duration) {
    shutdown_signal().await;
    tokio::time::sleep(timeout).await;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use medarticles_common::assistant::MockSummarizer;
    use medarticles_common::config::RateLimitConfig;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    /// State over an empty mock database and the mock summarizer
    pub fn state_with(db: MockDatabase, rate_limit: RateLimitConfig) -> AppState {
        let config = AppConfig {
            rate_limit,
            ..AppConfig::default()
        };
        let assistant = Assistant::new(Arc::new(MockSummarizer), AssistantOptions::default());

        AppState::new(
            Arc::new(config),
            DbPool::from_connection(db.into_connection()),
            assistant,
            None,
        )
    }

    pub fn state() -> AppState {
        state_with(
            MockDatabase::new(DatabaseBackend::Postgres),
            RateLimitConfig::default(),
        )
    }

    pub async fn send(app: Router, request: Request<Body>) -> (Response<Body>, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (Response::from_parts(parts, Body::empty()), json)
    }

    pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
