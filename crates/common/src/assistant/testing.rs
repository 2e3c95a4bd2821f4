//! In-memory fakes for pipeline tests

use super::{ArticleMatch, ArticleStore, SectionText, SummaryRequest, Summarizer, TermLookup};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

struct StoredArticle {
    id: i32,
    title: String,
    mkb: Option<String>,
}

/// Article store that records every query it receives
#[derive(Default)]
pub struct InMemoryStore {
    articles: Vec<StoredArticle>,
    sections: HashMap<i32, Vec<(i32, SectionText)>>,
    malformed_terms: Vec<String>,
    failing: bool,
    queried_terms: Mutex<Vec<String>>,
    section_fetches: Mutex<Vec<(i32, u64)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, id: i32, title: &str, mkb: Option<&str>) -> Self {
        self.articles.push(StoredArticle {
            id,
            title: title.to_string(),
            mkb: mkb.map(str::to_string),
        });
        self
    }

    /// Add a section; `section_id` decides the read order
    pub fn with_section(mut self, article_id: i32, section_id: i32, title: &str, html: &str) -> Self {
        self.sections.entry(article_id).or_default().push((
            section_id,
            SectionText {
                title: title.to_string(),
                html: html.to_string(),
            },
        ));
        self
    }

    pub fn with_malformed_term(mut self, term: &str) -> Self {
        self.malformed_terms.push(term.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn queried_terms(&self) -> Vec<String> {
        self.queried_terms.lock().unwrap().clone()
    }

    pub fn section_fetches(&self) -> Vec<(i32, u64)> {
        self.section_fetches.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing {
            return Err(AppError::DatabaseConnection {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn find_by_term(&self, term: &str) -> Result<TermLookup> {
        self.queried_terms.lock().unwrap().push(term.to_string());
        self.check_available()?;

        if self.malformed_terms.iter().any(|t| t == term) {
            return Ok(TermLookup::Malformed("title is NULL".to_string()));
        }

        let hit = self.articles.iter().find(|a| {
            a.title.to_lowercase().contains(term)
                || a.mkb.as_deref().is_some_and(|m| m.to_lowercase().contains(term))
        });

        Ok(match hit {
            Some(a) => TermLookup::Hit(ArticleMatch {
                id: a.id,
                title: a.title.clone(),
            }),
            None => TermLookup::Miss,
        })
    }

    async fn leading_sections(&self, article_id: i32, limit: u64) -> Result<Vec<SectionText>> {
        self.section_fetches.lock().unwrap().push((article_id, limit));
        self.check_available()?;

        let mut sections = self.sections.get(&article_id).cloned().unwrap_or_default();
        sections.sort_by_key(|(id, _)| *id);

        Ok(sections
            .into_iter()
            .take(limit as usize)
            .map(|(_, section)| section)
            .collect())
    }
}

enum Script {
    Reply(String),
    Fail(String),
    Stall(Duration),
}

/// Summarizer with a canned behaviour that records every prompt
pub struct ScriptedSummarizer {
    script: Script,
    requests: Mutex<Vec<SummaryRequest>>,
}

impl ScriptedSummarizer {
    pub fn replying(text: &str) -> Self {
        Self::with_script(Script::Reply(text.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_script(Script::Fail(message.to_string()))
    }

    pub fn stalling(delay: Duration) -> Self {
        Self::with_script(Script::Stall(delay))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SummaryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());

        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail(message) => Err(AppError::SummarizationError {
                message: message.clone(),
            }),
            Script::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok("too late".to_string())
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
