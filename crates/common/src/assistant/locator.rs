//! Term-by-term article lookup

use super::{ArticleMatch, ArticleStore, SearchTerms, TermLookup};
use crate::errors::Result;
use tracing::{debug, warn};

/// Probe the store with each term in order and return the first article hit.
///
/// Later terms are never queried once one matches. Rows that cannot be read
/// as (id, title) are skipped and the next term is tried.
pub async fn locate_article(
    terms: &SearchTerms,
    store: &dyn ArticleStore,
) -> Result<Option<ArticleMatch>> {
    for term in terms {
        debug!(term, "Searching articles by term");

        match store.find_by_term(term).await? {
            TermLookup::Hit(article) => {
                debug!(term, article_id = article.id, title = %article.title, "Article matched");
                return Ok(Some(article));
            }
            TermLookup::Miss => {}
            TermLookup::Malformed(reason) => {
                warn!(term, reason = %reason, "Skipping unreadable article row");
            }
        }
    }

    Ok(None)
}
