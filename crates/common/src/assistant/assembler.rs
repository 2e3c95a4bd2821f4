//! Bounded plain-text view of an article for the summarizer

use super::markup::strip_markup;
use super::{ArticleMatch, ArticleStore, SectionText};
use crate::config::AssistantConfig;
use crate::errors::Result;
use tracing::debug;

/// Appended to section text cut at the per-section limit
pub const ELLIPSIS: &str = "...";

/// Turns the leading sections of an article into one bounded text blob.
///
/// Each section is stripped to plain text and cut to `section_char_limit`
/// characters. Formatted section blocks are accepted in order while their
/// combined length stays within `content_char_budget`; the first block that
/// would overflow ends assembly. The title line is not charged to the budget.
/// All lengths are counted in characters.
#[derive(Debug, Clone)]
pub struct ContentAssembler {
    max_sections: u64,
    section_char_limit: usize,
    content_char_budget: usize,
}

impl ContentAssembler {
    pub fn new(max_sections: u64, section_char_limit: usize, content_char_budget: usize) -> Self {
        Self {
            max_sections,
            section_char_limit,
            content_char_budget,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            config.max_sections,
            config.section_char_limit,
            config.content_char_budget,
        )
    }

    /// Fetch and assemble the article; `None` when it has no sections
    pub async fn assemble(
        &self,
        article: &ArticleMatch,
        store: &dyn ArticleStore,
    ) -> Result<Option<String>> {
        let sections = store
            .leading_sections(article.id, self.max_sections)
            .await?;

        if sections.is_empty() {
            debug!(article_id = article.id, "Article has no sections");
            return Ok(None);
        }

        Ok(Some(self.compose(&article.title, &sections)))
    }

    pub fn compose(&self, title: &str, sections: &[SectionText]) -> String {
        let mut content = format!("Статья: {}\n\n", title);
        let mut used = 0;

        for (index, section) in sections.iter().take(self.max_sections as usize).enumerate() {
            let text = strip_markup(&section.html);
            let block = format!(
                "Раздел: {}\n{}\n\n",
                section.title,
                truncate_chars(&text, self.section_char_limit)
            );
            let block_len = block.chars().count();

            if used + block_len > self.content_char_budget {
                debug!(
                    section = index,
                    used,
                    block_len,
                    budget = self.content_char_budget,
                    "Content budget reached"
                );
                break;
            }

            content.push_str(&block);
            used += block_len;
        }

        content
    }
}

impl Default for ContentAssembler {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
