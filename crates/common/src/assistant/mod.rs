//! Question answering over the article store
//!
//! A question flows through four stages:
//! - term extraction ([`SearchTerms`])
//! - article lookup ([`locate_article`])
//! - content assembly ([`ContentAssembler`])
//! - grounded summarization ([`Assistant`])
//!
//! The store is only reached through [`ArticleStore`] and the language model
//! only through [`Summarizer`], so every stage can run against in-memory fakes.

mod assembler;
mod composer;
mod locator;
mod markup;
mod summarizer;
mod terms;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::ContentAssembler;
pub use composer::{AnswerOutcome, Assistant, AssistantOptions};
pub use locator::locate_article;
pub use markup::strip_markup;
pub use summarizer::{
    create_summarizer, MockSummarizer, OpenAiSummarizer, SummaryRequest, Summarizer,
};
pub use terms::{SearchTerms, STOP_WORDS};

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An article picked for a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMatch {
    pub id: i32,
    pub title: String,
}

/// Raw section content as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionText {
    pub title: String,
    pub html: String,
}

/// Outcome of probing the store with one search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermLookup {
    /// A row with both an id and a title
    Hit(ArticleMatch),
    /// No row matched the term
    Miss,
    /// A row matched but could not be read as (id, title)
    Malformed(String),
}

/// Read-only view of the article store used by the pipeline
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Find one article whose title or classification code contains `term`
    /// (case-insensitive). Which row wins among several is store-defined.
    async fn find_by_term(&self, term: &str) -> Result<TermLookup>;

    /// Leading sections of an article in ascending id order
    async fn leading_sections(&self, article_id: i32, limit: u64) -> Result<Vec<SectionText>>;
}
