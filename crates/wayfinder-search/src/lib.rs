//! Endpoint search and ranking.
//!
//! Two interchangeable strategies behind one trait: lexical (token-set
//! fuzzy ratio) and semantic (cosine similarity over cached embeddings).
//! Both score into `[0, 1]` and flag results under the confidence
//! threshold instead of discarding them.

pub mod error;
pub mod lexical;
pub mod semantic;
pub mod text;

use serde::{Deserialize, Serialize};

use wayfinder_resolver::Endpoint;

pub use error::SearchError;
pub use lexical::LexicalMatcher;
pub use semantic::{Embedder, HashEmbedder, SemanticMatcher};

/// Results scoring below this are flagged low-confidence by default.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// One ranked hit. Borrows the full endpoint record from the searched
/// slice so downstream consumers keep parameters and schemas intact.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<'a> {
    pub endpoint: &'a Endpoint,
    /// Similarity in `[0, 1]`.
    pub similarity_score: f64,
    /// True when the score fell below the confidence threshold.
    pub low_confidence: bool,
}

/// A search strategy: one query, one endpoint set, one complete ranked
/// answer. Implementations are pure functions of their inputs apart from
/// internal caching.
pub trait Matcher: Send + Sync {
    fn search<'a>(
        &self,
        query: &str,
        endpoints: &'a [Endpoint],
        limit: usize,
    ) -> Result<Vec<SearchResult<'a>>, SearchError>;
}

/// Which strategy a catalog consumer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Lexical,
    Semantic,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexical" => Ok(Strategy::Lexical),
            "semantic" => Ok(Strategy::Semantic),
            other => Err(format!(
                "unknown search strategy '{other}' (expected 'lexical' or 'semantic')"
            )),
        }
    }
}

/// Construct the matcher for a configured strategy.
pub fn matcher_for(strategy: Strategy, confidence_threshold: f64) -> Box<dyn Matcher> {
    match strategy {
        Strategy::Lexical => Box::new(LexicalMatcher::new(confidence_threshold)),
        Strategy::Semantic => Box::new(SemanticMatcher::new(confidence_threshold)),
    }
}

/// Sort hits by score descending; `sort_by` is stable, so equal scores
/// keep their original catalog order.
pub(crate) fn rank(results: &mut Vec<SearchResult<'_>>, limit: usize) {
    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);
}
