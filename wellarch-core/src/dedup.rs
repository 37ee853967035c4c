//! Cross-pillar recommendation deduplication.
//!
//! Each recommendation is compared against the ones already kept; anything
//! more similar than the threshold folds into the first-seen instance.
//! Similarity uses embeddings when available and falls back to
//! bag-of-words term frequencies.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::embedding::{CachedEmbedder, cosine_similarity};
use crate::pillar::Pillar;
use crate::types::Recommendation;

/// Collapses near-identical recommendations raised by different pillars.
pub struct RecommendationDeduplicator {
    embedder: Option<CachedEmbedder>,
    threshold: f32,
}

impl RecommendationDeduplicator {
    pub fn new(embedder: Option<CachedEmbedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
        }
    }

    /// Bag-of-words similarity only.
    pub fn bag_of_words(threshold: f32) -> Self {
        Self::new(None, threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Deduplicate, keeping first-seen order.
    pub async fn dedupe(&self, recs: Vec<Recommendation>) -> Vec<Recommendation> {
        if recs.len() < 2 {
            return recs;
        }
        let texts: Vec<String> = recs.iter().map(Recommendation::match_text).collect();
        let vectors = self.vectors(&texts).await;
        let before = recs.len();

        let mut kept: Vec<(Recommendation, Arc<[f32]>)> = Vec::new();
        for (rec, vector) in recs.into_iter().zip(vectors) {
            match kept
                .iter_mut()
                .find(|(_, v)| cosine_similarity(&vector, v) > self.threshold)
            {
                Some((canonical, _)) => merge(canonical, rec),
                None => kept.push((rec, vector)),
            }
        }

        let result: Vec<Recommendation> = kept
            .into_iter()
            .map(|(mut rec, _)| {
                if !rec.also_raised_by.is_empty() {
                    rec.notes.push(raised_by_note(&rec.also_raised_by));
                }
                rec
            })
            .collect();

        debug!(before, after = result.len(), "recommendations deduplicated");
        result
    }

    async fn vectors(&self, texts: &[String]) -> Vec<Arc<[f32]>> {
        if let Some(embedder) = &self.embedder {
            match embedder.embed_all(texts).await {
                Ok(vectors) => return vectors,
                Err(e) => warn!(error = %e, "embedding failed, using bag-of-words similarity"),
            }
        }
        bag_of_words_vectors(texts)
    }
}

fn merge(canonical: &mut Recommendation, duplicate: Recommendation) {
    canonical.priority = canonical.priority.max(duplicate.priority);
    if duplicate.pillar != canonical.pillar && !canonical.also_raised_by.contains(&duplicate.pillar)
    {
        canonical.also_raised_by.push(duplicate.pillar);
    }
    for pillar in duplicate.also_raised_by {
        if pillar != canonical.pillar && !canonical.also_raised_by.contains(&pillar) {
            canonical.also_raised_by.push(pillar);
        }
    }
    for note in duplicate.notes {
        if !canonical.notes.contains(&note) {
            canonical.notes.push(note);
        }
    }
}

fn raised_by_note(pillars: &[Pillar]) -> String {
    let names: Vec<&str> = pillars.iter().map(|p| p.display_name()).collect();
    format!("Also raised independently by: {}", names.join(", "))
}

/// Term-frequency vectors over a shared vocabulary of lowercase alphabetic tokens.
pub fn bag_of_words_vectors(texts: &[String]) -> Vec<Arc<[f32]>> {
    let tokenized: Vec<Vec<String>> = texts
        .iter()
        .map(|t| {
            t.to_lowercase()
                .split_whitespace()
                .filter(|tok| tok.chars().all(char::is_alphabetic))
                .map(str::to_string)
                .collect()
        })
        .collect();

    let mut vocab: HashMap<&str, usize> = HashMap::new();
    for tok in tokenized.iter().flatten() {
        let next = vocab.len();
        vocab.entry(tok.as_str()).or_insert(next);
    }

    tokenized
        .iter()
        .map(|toks| {
            let mut v = vec![0.0f32; vocab.len()];
            for tok in toks {
                if let Some(&i) = vocab.get(tok.as_str()) {
                    v[i] += 1.0;
                }
            }
            v.into()
        })
        .collect()
}
