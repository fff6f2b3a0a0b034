//! Embedding-based semantic matching.
//!
//! Endpoint texts are embedded once and cached per matcher instance;
//! queries are embedded per call and compared by cosine similarity,
//! remapped from `[-1, 1]` to `[0, 1]`. The model is loaded on first
//! search, never at construction.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use wayfinder_resolver::Endpoint;

use crate::text::searchable_text;
use crate::{Matcher, SearchError, SearchResult, DEFAULT_CONFIDENCE_THRESHOLD};

/// The built-in embedding model name.
pub const HASH_MODEL: &str = "hash";

/// Dimensionality of the built-in hashed embedding.
const EMBEDDING_DIM: usize = 256;

/// An embedding model. One call embeds a batch of texts; the output
/// vector order must match the input text order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError>;
}

/// Deterministic bag-of-tokens embedder: each token hashes into one of
/// `dim` buckets and the counts are L2-normalized. No external weights,
/// so it loads instantly and behaves identically across processes.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        HashEmbedder { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let index = (hasher.finish() as usize) % self.dim;
            vector[index] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Cosine similarity remapped to `[0, 1]`: identical vectors read 1.0,
/// orthogonal 0.5, opposite 0.0. A zero-magnitude vector on either side
/// is defined as 0.0 outright, bypassing the remap.
pub fn remapped_cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = f64::from(dot / (norm_a * norm_b));
    (cosine + 1.0) / 2.0
}

/// Two-state model lifecycle: nothing is instantiated until the first
/// search needs it.
enum ModelState {
    Uninitialized,
    Loaded(Arc<dyn Embedder>),
}

struct CacheEntry {
    embedding: Vec<f32>,
    text: String,
}

/// Semantic strategy with a per-instance embedding cache keyed by
/// `METHOD:path`. Entries are never invalidated automatically; call
/// [`SemanticMatcher::clear_cache`] after replacing a spec.
pub struct SemanticMatcher {
    model_name: String,
    confidence_threshold: f64,
    model: Mutex<ModelState>,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for SemanticMatcher {
    fn default() -> Self {
        SemanticMatcher::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl SemanticMatcher {
    /// Matcher backed by the built-in model, loaded lazily.
    pub fn new(confidence_threshold: f64) -> Self {
        Self::with_model(HASH_MODEL, confidence_threshold)
    }

    /// Matcher backed by a named model, loaded lazily on first search.
    /// An unknown name surfaces as [`SearchError::ModelUnavailable`]
    /// there, not here.
    pub fn with_model(model_name: &str, confidence_threshold: f64) -> Self {
        SemanticMatcher {
            model_name: model_name.to_string(),
            confidence_threshold,
            model: Mutex::new(ModelState::Uninitialized),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Matcher backed by a caller-supplied model (already loaded).
    pub fn with_embedder(embedder: Arc<dyn Embedder>, confidence_threshold: f64) -> Self {
        SemanticMatcher {
            model_name: "external".to_string(),
            confidence_threshold,
            model: Mutex::new(ModelState::Loaded(embedder)),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached embedding. Needed after the underlying spec
    /// changes, since cache keys only carry method and path.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// The source text a cache entry was embedded from, if cached.
    /// Useful when debugging why a stale entry ranks oddly.
    pub fn cached_text(&self, key: &str) -> Option<String> {
        self.cache.read().get(key).map(|entry| entry.text.clone())
    }

    fn model(&self) -> Result<Arc<dyn Embedder>, SearchError> {
        let mut state = self.model.lock();
        if let ModelState::Loaded(model) = &*state {
            return Ok(model.clone());
        }
        let model = load_model(&self.model_name)?;
        tracing::info!(model = %self.model_name, "embedding model loaded");
        *state = ModelState::Loaded(model.clone());
        Ok(model)
    }

    /// Embed any endpoint in `endpoints` that has no cache entry yet,
    /// in one batched model call. Outputs re-associate to keys by input
    /// order.
    fn ensure_embeddings(&self, endpoints: &[Endpoint]) -> Result<(), SearchError> {
        let mut pending_keys: Vec<String> = Vec::new();
        let mut pending_texts: Vec<String> = Vec::new();
        {
            let cache = self.cache.read();
            for endpoint in endpoints {
                let key = endpoint.key();
                if !cache.contains_key(&key) && !pending_keys.contains(&key) {
                    pending_texts.push(searchable_text(endpoint));
                    pending_keys.push(key);
                }
            }
        }
        if pending_keys.is_empty() {
            return Ok(());
        }

        let model = self.model()?;
        tracing::debug!(count = pending_keys.len(), "embedding endpoint texts");
        let embeddings = model.embed(&pending_texts)?;
        if embeddings.len() != pending_keys.len() {
            return Err(SearchError::Embedding(format!(
                "model returned {} embeddings for {} inputs",
                embeddings.len(),
                pending_keys.len()
            )));
        }

        let mut cache = self.cache.write();
        for ((key, text), embedding) in pending_keys
            .into_iter()
            .zip(pending_texts)
            .zip(embeddings)
        {
            cache.insert(key, CacheEntry { embedding, text });
        }
        Ok(())
    }
}

fn load_model(name: &str) -> Result<Arc<dyn Embedder>, SearchError> {
    match name {
        HASH_MODEL => Ok(Arc::new(HashEmbedder::new(EMBEDDING_DIM))),
        other => Err(SearchError::ModelUnavailable(format!(
            "unknown embedding model '{other}'"
        ))),
    }
}

impl Matcher for SemanticMatcher {
    fn search<'a>(
        &self,
        query: &str,
        endpoints: &'a [Endpoint],
        limit: usize,
    ) -> Result<Vec<SearchResult<'a>>, SearchError> {
        if endpoints.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_embeddings(endpoints)?;

        let model = self.model()?;
        let query_embedding = model
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("model returned no query embedding".into()))?;

        let cache = self.cache.read();
        let mut results: Vec<SearchResult<'a>> = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let Some(entry) = cache.get(&endpoint.key()) else {
                continue;
            };
            let score = remapped_cosine(&query_embedding, &entry.embedding);
            results.push(SearchResult {
                endpoint,
                similarity_score: score,
                low_confidence: score < self.confidence_threshold,
            });
        }
        drop(cache);

        crate::rank(&mut results, limit);
        Ok(results)
    }
}
