//! Search term extraction from free-text questions

use std::iter::Filter;
use std::str::SplitWhitespace;

/// Interrogatives and filler words that never identify an article
pub const STOP_WORDS: &[&str] = &[
    "как", "что", "где", "когда", "почему", "зачем",
    "ответь", "на", "русском", "языке", "по", "вылечить",
];

/// Terms must be longer than this many characters
const MIN_TERM_EXCLUSIVE: usize = 2;

/// Lazy iterator over the terms of a question
pub type Terms<'a> = Filter<SplitWhitespace<'a>, fn(&&'a str) -> bool>;

/// Candidate search terms of one question, in order of appearance.
///
/// Holds the normalized question and filters it on every iteration, so the
/// sequence can be walked any number of times. Repeated words are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    normalized: String,
}

impl SearchTerms {
    /// Lowercase the question and blank out everything that is not a letter,
    /// digit or whitespace.
    pub fn extract(question: &str) -> Self {
        let normalized = question
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .collect();

        Self { normalized }
    }

    pub fn iter(&self) -> Terms<'_> {
        self.normalized
            .split_whitespace()
            .filter(is_search_term as fn(&&str) -> bool)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}

impl<'a> IntoIterator for &'a SearchTerms {
    type Item = &'a str;
    type IntoIter = Terms<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn is_search_term(token: &&str) -> bool {
    token.chars().count() > MIN_TERM_EXCLUSIVE && !STOP_WORDS.contains(token)
}
