//! Token-set fuzzy matching.

use std::collections::BTreeSet;

use wayfinder_resolver::Endpoint;

use crate::text::searchable_text;
use crate::{Matcher, SearchError, SearchResult, DEFAULT_CONFIDENCE_THRESHOLD};

/// Scores endpoints with a token-set fuzzy ratio, which tolerates word
/// reordering and extra words on either side.
#[derive(Debug, Clone)]
pub struct LexicalMatcher {
    confidence_threshold: f64,
}

impl LexicalMatcher {
    pub fn new(confidence_threshold: f64) -> Self {
        LexicalMatcher {
            confidence_threshold,
        }
    }
}

impl Default for LexicalMatcher {
    fn default() -> Self {
        LexicalMatcher::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl Matcher for LexicalMatcher {
    fn search<'a>(
        &self,
        query: &str,
        endpoints: &'a [Endpoint],
        limit: usize,
    ) -> Result<Vec<SearchResult<'a>>, SearchError> {
        let mut results: Vec<SearchResult<'a>> = endpoints
            .iter()
            .map(|endpoint| {
                // Native ratio is 0-100; rescale to 0-1.
                let score = token_set_ratio(query, &searchable_text(endpoint)) / 100.0;
                SearchResult {
                    endpoint,
                    similarity_score: score,
                    low_confidence: score < self.confidence_threshold,
                }
            })
            .collect();

        crate::rank(&mut results, limit);
        Ok(results)
    }
}

/// Lowercase and split on any non-alphanumeric rune.
fn tokenize(input: &str) -> BTreeSet<String> {
    input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

fn joined(tokens: impl IntoIterator<Item = String>) -> String {
    tokens.into_iter().collect::<Vec<_>>().join(" ")
}

/// Normalized edit-distance ratio on the conventional 0-100 scale.
fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Token-set ratio in `[0, 100]`.
///
/// Both sides are reduced to sorted token sets; the score is the best of
/// three comparisons built from the shared tokens and each side's
/// remainder. A query whose tokens are a subset of the text's scores 100.
pub fn token_set_ratio(query: &str, text: &str) -> f64 {
    let query_tokens = tokenize(query);
    let text_tokens = tokenize(text);

    if query_tokens.is_empty() || text_tokens.is_empty() {
        return 0.0;
    }

    let shared = joined(query_tokens.intersection(&text_tokens).cloned());
    let query_rest = joined(query_tokens.difference(&text_tokens).cloned());
    let text_rest = joined(text_tokens.difference(&query_tokens).cloned());

    let shared_plus_query = joined([shared.clone(), query_rest].into_iter().filter(|s| !s.is_empty()));
    let shared_plus_text = joined([shared.clone(), text_rest].into_iter().filter(|s| !s.is_empty()));

    [
        ratio(&shared, &shared_plus_query),
        ratio(&shared, &shared_plus_text),
        ratio(&shared_plus_query, &shared_plus_text),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}
