//! Summarization backend abstraction
//!
//! Provides a unified interface for turning a grounded prompt into an answer:
//! - OpenAI-compatible chat completions
//! - A deterministic mock for development and tests

use crate::config::SummarizerConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One summarization call
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    /// Single user-role prompt
    pub prompt: String,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

/// Trait for summarization backends
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate text for the prompt
    async fn summarize(&self, request: &SummaryRequest) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completions client
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl OpenAiSummarizer {
    /// Create a client with the call timeout baked in
    pub fn new(api_key: String, config: &SummarizerConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn make_request(&self, request: &SummaryRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SummarizationError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AppError::SummarizationError {
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::SummarizationError {
                message: "Empty response from model".to_string(),
            })
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::SummarizationTimeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            AppError::SummarizationError {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let start = Instant::now();
        let result = self.make_request(request).await;

        metrics::record_summarization(
            start.elapsed().as_secs_f64(),
            &self.model,
            result.is_ok(),
        );

        if let Err(ref e) = result {
            tracing::warn!(model = %self.model, error = %e, "Summarization request failed");
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock summarizer for development and testing
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let question = request
            .prompt
            .rsplit_once("Вопрос:")
            .and_then(|(_, rest)| rest.lines().next())
            .map(str::trim)
            .unwrap_or_default();

        Ok(format!(
            "Краткий ответ на вопрос «{}» по материалам статьи. [Mock response - summarizer API key not configured]",
            question
        ))
    }

    fn model_name(&self) -> &str {
        "mock-summarizer"
    }
}

/// Create the process-wide summarizer based on configuration
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "summarizer.api_key (or OPENAI_API_KEY) is required for the openai provider".to_string(),
                })?;
            Ok(Arc::new(OpenAiSummarizer::new(key, config)?))
        }
        "mock" => Ok(Arc::new(MockSummarizer)),
        other => {
            tracing::warn!(provider = other, "Unknown summarizer provider, using mock");
            Ok(Arc::new(MockSummarizer))
        }
    }
}
