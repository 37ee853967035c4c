//! Embedding cache and cached embedding lookups.
//!
//! Vectors are keyed by the SHA-256 of the trimmed text. The cache is
//! unbounded and lives as long as the process; concurrent writers racing on
//! the same key store identical vectors, so last-write-wins is harmless.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::debug;
use wellarch_models::providers::{EmbedRequest, ModelProvider};

use crate::caller::RateLimitedCaller;
use crate::error::ProviderError;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Content-hash keyed store of embedding vectors.
#[derive(Default)]
pub struct EmbeddingCache {
    entries: RwLock<HashMap<String, Arc<[f32]>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for `text`: hex SHA-256 of the text with outer whitespace trimmed.
    ///
    /// Case and inner whitespace are significant.
    pub fn key(text: &str) -> String {
        hex::encode(Sha256::digest(text.trim().as_bytes()))
    }

    pub fn get(&self, text: &str) -> Option<Arc<[f32]>> {
        let key = Self::key(text);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    pub fn insert(&self, text: &str, vector: Vec<f32>) -> Arc<[f32]> {
        let vector: Arc<[f32]> = vector.into();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(text), Arc::clone(&vector));
        vector
    }

    /// Return the cached vector or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs.
    pub async fn get_or_compute<F, Fut, E>(&self, text: &str, compute: F) -> Result<Arc<[f32]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<f32>, E>>,
    {
        if let Some(hit) = self.get(text) {
            return Ok(hit);
        }
        let vector = compute().await?;
        Ok(self.insert(text, vector))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Batched embedding lookups that only send cache misses to the provider.
pub struct CachedEmbedder {
    provider: Arc<dyn ModelProvider>,
    caller: Arc<RateLimitedCaller>,
    cache: Arc<EmbeddingCache>,
    model: String,
}

impl CachedEmbedder {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        caller: Arc<RateLimitedCaller>,
        cache: Arc<EmbeddingCache>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            caller,
            cache,
            model: model.into(),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Embed every text, in order.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Arc<[f32]>>, ProviderError> {
        let mut misses: Vec<String> = Vec::new();
        for text in texts {
            if self.cache.get(text).is_none() && !misses.contains(text) {
                misses.push(text.clone());
            }
        }

        debug!(
            total = texts.len(),
            misses = misses.len(),
            "embedding cache lookup"
        );

        if !misses.is_empty() {
            let provider = Arc::clone(&self.provider);
            let model = self.model.clone();
            let batch = misses.clone();
            let response = self
                .caller
                .call("embed", || {
                    let provider = Arc::clone(&provider);
                    let request = EmbedRequest::new(model.clone(), batch.clone());
                    async move { provider.embed(request).await.map_err(ProviderError::from) }
                })
                .await?;

            if response.embeddings.len() != misses.len() {
                return Err(ProviderError::Malformed(format!(
                    "expected {} embeddings, got {}",
                    misses.len(),
                    response.embeddings.len()
                )));
            }
            for (text, vector) in misses.iter().zip(response.embeddings) {
                self.cache.insert(text, vector);
            }
        }

        texts
            .iter()
            .map(|t| {
                self.cache
                    .get(t)
                    .ok_or_else(|| ProviderError::Malformed("embedding missing after fetch".into()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use std::sync::Mutex;
    use wellarch_models::providers::{ChatRequest, ChatResponse, EmbedResponse, Usage};

    // ============================================================
    // cosine_similarity
    // ============================================================

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    // ============================================================
    // EmbeddingCache
    // ============================================================

    #[test]
    fn key_is_sha256_of_trimmed_text() {
        assert_eq!(
            EmbeddingCache::key("  abc \n"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_is_case_sensitive() {
        assert_ne!(EmbeddingCache::key("Failover"), EmbeddingCache::key("failover"));
    }

    #[tokio::test]
    async fn get_or_compute_only_computes_once() {
        let cache = EmbeddingCache::new();
        let computed = Mutex::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_compute("zone redundancy", || async {
                    *computed.lock().unwrap() += 1;
                    Ok::<_, ProviderError>(vec![0.5, 0.5])
                })
                .await
                .unwrap();
            assert_eq!(&*v, &[0.5, 0.5]);
        }

        assert_eq!(*computed.lock().unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn get_or_compute_propagates_errors_without_caching() {
        let cache = EmbeddingCache::new();
        let result = cache
            .get_or_compute("x", || async {
                Err::<Vec<f32>, _>(ProviderError::Request("down".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    // ============================================================
    // CachedEmbedder
    // ============================================================

    struct CountingEmbedder {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ModelProvider for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        async fn chat(&self, _request: ChatRequest) -> wellarch_models::Result<ChatResponse> {
            Ok(ChatResponse::text("{}"))
        }

        async fn embed(&self, request: EmbedRequest) -> wellarch_models::Result<EmbedResponse> {
            let embeddings = request
                .texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect();
            self.batches.lock().unwrap().push(request.texts);
            Ok(EmbedResponse {
                embeddings,
                usage: Usage::default(),
            })
        }

        fn supports_embeddings(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn partial_hits_fetch_only_misses() {
        let provider = Arc::new(CountingEmbedder {
            batches: Mutex::new(Vec::new()),
        });
        let caller = Arc::new(RateLimitedCaller::new(&LimitsConfig::default()));
        let cache = Arc::new(EmbeddingCache::new());
        cache.insert("cached", vec![9.0, 9.0]);

        let embedder = CachedEmbedder::new(provider.clone(), caller, cache, "embed-model");
        let texts = vec!["cached".to_string(), "new".to_string(), "new".to_string()];
        let vectors = embedder.embed_all(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(&*vectors[0], &[9.0, 9.0]);
        assert_eq!(&*vectors[1], &[3.0, 1.0]);
        assert_eq!(provider.batches.lock().unwrap().as_slice(), &[vec!["new".to_string()]]);

        embedder.embed_all(&texts).await.unwrap();
        assert_eq!(provider.batches.lock().unwrap().len(), 1, "second pass is all hits");
    }
}
