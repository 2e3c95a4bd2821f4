//! Grounded answers with a citation link

use super::{
    locate_article, ArticleMatch, ArticleStore, ContentAssembler, SearchTerms, SummaryRequest,
    Summarizer,
};
use crate::config::{AssistantConfig, SummarizerConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};

pub const NO_MATCH_MESSAGE: &str =
    "К сожалению, не удалось найти подходящую статью по вашему вопросу.";

const FAILURE_PREFIX: &str = "Произошла ошибка при обработке запроса: ";

/// Terminal state of one question
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// The summarizer produced an answer grounded in the article
    Answered {
        answer: String,
        article: ArticleMatch,
        link: String,
    },
    /// No term matched any article
    NoMatch,
    /// An article matched but has no sections
    NoContent { article: ArticleMatch, link: String },
    /// Store or summarizer failure
    Failed { detail: String },
}

impl AnswerOutcome {
    /// Short label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Answered { .. } => "answered",
            Self::NoMatch => "no_match",
            Self::NoContent { .. } => "no_content",
            Self::Failed { .. } => "failed",
        }
    }

    /// User-facing text
    pub fn render(&self) -> String {
        match self {
            Self::Answered {
                answer,
                article,
                link,
            } => format!("{}\n\n[Подробнее: {}]({})", answer, article.title, link),
            Self::NoMatch => NO_MATCH_MESSAGE.to_string(),
            Self::NoContent { article, link } => format!(
                "Найдена статья '{}', но её содержимое недоступно.\nСсылка: {}",
                article.title, link
            ),
            Self::Failed { detail } => format!("{}{}", FAILURE_PREFIX, detail),
        }
    }
}

/// Knobs for a single answer
#[derive(Debug, Clone)]
pub struct AssistantOptions {
    /// Base for direct article links
    pub public_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on one summarizer call
    pub timeout: Duration,
    pub assembler: ContentAssembler,
}

impl AssistantOptions {
    pub fn from_config(summarizer: &SummarizerConfig, assistant: &AssistantConfig) -> Self {
        Self {
            public_base_url: assistant.public_base_url.trim_end_matches('/').to_string(),
            max_tokens: summarizer.max_tokens,
            temperature: summarizer.temperature,
            timeout: summarizer.timeout(),
            assembler: ContentAssembler::from_config(assistant),
        }
    }
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self::from_config(&SummarizerConfig::default(), &AssistantConfig::default())
    }
}

/// Answers free-text questions from the article store.
///
/// Holds the process-wide summarizer; the store is passed per call so one
/// assistant can serve any number of concurrent questions.
#[derive(Clone)]
pub struct Assistant {
    summarizer: Arc<dyn Summarizer>,
    options: AssistantOptions,
}

impl Assistant {
    pub fn new(summarizer: Arc<dyn Summarizer>, options: AssistantOptions) -> Self {
        Self {
            summarizer,
            options,
        }
    }

    pub fn options(&self) -> &AssistantOptions {
        &self.options
    }

    pub fn model_name(&self) -> &str {
        self.summarizer.model_name()
    }

    /// Answer a question. Never fails; every error becomes a message.
    pub async fn answer(&self, question: &str, store: &dyn ArticleStore) -> String {
        self.ask(question, store).await.render()
    }

    /// Run the pipeline and report which terminal state it reached
    pub async fn ask(&self, question: &str, store: &dyn ArticleStore) -> AnswerOutcome {
        let start = Instant::now();

        let outcome = match self.run(question, store).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, code = ?e.code(), "Failed to answer question");
                AnswerOutcome::Failed {
                    detail: e.to_string(),
                }
            }
        };

        let elapsed = start.elapsed();
        metrics::record_question(outcome.label(), elapsed.as_secs_f64());
        info!(
            outcome = outcome.label(),
            latency_ms = elapsed.as_millis() as u64,
            "Question processed"
        );

        outcome
    }

    #[instrument(skip_all, fields(question_chars = question.chars().count()))]
    async fn run(&self, question: &str, store: &dyn ArticleStore) -> Result<AnswerOutcome> {
        let terms = SearchTerms::extract(question);
        debug!(terms = ?terms.to_vec(), "Extracted search terms");

        let Some(article) = locate_article(&terms, store).await? else {
            return Ok(AnswerOutcome::NoMatch);
        };
        let link = self.article_link(article.id);

        let Some(content) = self.options.assembler.assemble(&article, store).await? else {
            return Ok(AnswerOutcome::NoContent { article, link });
        };

        let request = SummaryRequest {
            prompt: build_prompt(&content, question),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        let answer = self.summarize(&request).await?;

        Ok(AnswerOutcome::Answered {
            answer,
            article,
            link,
        })
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let start = Instant::now();

        match tokio::time::timeout(self.options.timeout, self.summarizer.summarize(request)).await {
            Ok(result) => result,
            Err(_) => {
                metrics::record_summarization(
                    start.elapsed().as_secs_f64(),
                    self.summarizer.model_name(),
                    false,
                );
                Err(AppError::SummarizationTimeout {
                    timeout_secs: self.options.timeout.as_secs(),
                })
            }
        }
    }

    pub fn article_link(&self, article_id: i32) -> String {
        format!("{}/articles/{}/full", self.options.public_base_url, article_id)
    }
}

fn build_prompt(content: &str, question: &str) -> String {
    format!(
        "Ответь кратко на русском языке на основе статьи:\n\n{}\n\nВопрос: {}\n\nОтвет:",
        content, question
    )
}
