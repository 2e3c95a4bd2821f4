//! MedArticles Common Library
//!
//! Shared code for the MedArticles services including:
//! - Database models and repository patterns
//! - The question answering pipeline (assistant)
//! - Summarization backend abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod assistant;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use assistant::{ArticleStore, Assistant, Summarizer};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default summarization model
pub const DEFAULT_SUMMARIZER_MODEL: &str = "gpt-4o-mini";
