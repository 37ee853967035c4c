//! Per-pillar evaluation.
//!
//! ```text
//! PillarEvaluator::evaluate(corpus)
//!     │
//!     ├─ CatalogSource::get_concepts ──► MultiSectionScorer ──► EvidenceScore
//!     │
//!     ├─ LLM review through RateLimitedCaller ──► ReviewResponse
//!     │       └─ on ProviderError ──► fallback(evidence)
//!     │
//!     ├─ zero-evidence floor, gap penalty, justification
//!     │
//!     └─ SubcategoryNormalizer ──► PillarResult
//! ```
//!
//! `evaluate` never fails: a provider failure resolves to the deterministic
//! fallback result.

mod prompt;
mod response;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use wellarch_models::providers::{ChatRequest, ModelProvider};

use crate::caller::RateLimitedCaller;
use crate::catalog::{CatalogSource, ConceptCatalog};
use crate::config::AssessmentConfig;
use crate::corpus::Corpus;
use crate::error::{AssessmentError, ProviderError};
use crate::normalizer::SubcategoryNormalizer;
use crate::pillar::Pillar;
use crate::scoring::{EvidenceScore, MultiSectionScorer, PracticeCoverage};
use crate::types::{
    Confidence, PillarResult, Priority, Recommendation, RecommendationKind, SubcategoryScore,
};

pub use prompt::{max_points, review_messages};
pub use response::{ReviewResponse, SubcategoryAssessment, parse_review, priority_from_impact};

/// Name of the single subcategory carried by a fallback result.
pub const FALLBACK_SUBCATEGORY: &str = "Deterministic evidence baseline";

/// Missing concepts listed in a fallback recommendation.
const FALLBACK_MISSING_LISTED: usize = 5;

/// Scores one pillar.
pub struct PillarEvaluator {
    pillar: Pillar,
    provider: Arc<dyn ModelProvider>,
    caller: Arc<RateLimitedCaller>,
    catalogs: Arc<dyn CatalogSource>,
    config: Arc<AssessmentConfig>,
}

impl PillarEvaluator {
    pub fn new(
        pillar: Pillar,
        provider: Arc<dyn ModelProvider>,
        caller: Arc<RateLimitedCaller>,
        catalogs: Arc<dyn CatalogSource>,
        config: Arc<AssessmentConfig>,
    ) -> Self {
        Self {
            pillar,
            provider,
            caller,
            catalogs,
            config,
        }
    }

    pub fn pillar(&self) -> Pillar {
        self.pillar
    }

    /// Load the catalog, or `None` when the evidence path is unavailable.
    pub fn catalog(&self) -> Option<Arc<ConceptCatalog>> {
        match self.catalogs.get_concepts(self.pillar) {
            Ok(catalog) => Some(catalog),
            Err(e @ AssessmentError::CatalogMissing { .. }) => {
                warn!(pillar = %self.pillar, error = %e, "skipping evidence scan");
                None
            }
            Err(e) => {
                warn!(pillar = %self.pillar, error = %e, "failed to load concept catalog");
                None
            }
        }
    }

    /// Deterministic evidence for `corpus`; all-zero without a catalog.
    pub fn evidence(&self, catalog: Option<&ConceptCatalog>, corpus: &Corpus) -> EvidenceScore {
        catalog
            .map(|c| MultiSectionScorer::new(c).score(corpus))
            .unwrap_or_default()
    }

    #[instrument(name = "pillar::evaluate", skip_all, fields(pillar = %self.pillar))]
    pub async fn evaluate(&self, corpus: &Corpus) -> PillarResult {
        let catalog = self.catalog();
        let evidence = self.evidence(catalog.as_deref(), corpus);
        debug!(
            pillar = %self.pillar,
            score = evidence.score,
            coverage = evidence.coverage_pct,
            multi_section = evidence.multi_section,
            "evidence baseline"
        );

        if !self.config.llm.enabled {
            let reason = ProviderError::Disabled("language model disabled in config".into());
            return fallback(self.pillar, evidence, reason.to_string());
        }

        let review = match self.review(catalog.as_deref(), &evidence, corpus).await {
            Ok(review) => review,
            Err(e) => {
                warn!(
                    pillar = %self.pillar,
                    error = %e,
                    "review failed, using evidence baseline"
                );
                return fallback(self.pillar, evidence, e.to_string());
            }
        };

        let recommendations = match review.recommendations(self.pillar) {
            Ok(recs) => recs,
            Err(e) => return fallback(self.pillar, evidence, e.to_string()),
        };

        let result = self.assemble(catalog.as_deref(), evidence, &review, recommendations);
        info!(
            pillar = %self.pillar,
            score = result.overall_score,
            raw_sum = result.raw_subcategory_sum,
            normalized = result.normalization_applied,
            "pillar evaluated"
        );
        result
    }

    async fn review(
        &self,
        catalog: Option<&ConceptCatalog>,
        evidence: &EvidenceScore,
        corpus: &Corpus,
    ) -> Result<ReviewResponse, ProviderError> {
        let llm = &self.config.llm;
        let messages = review_messages(self.pillar, catalog, evidence, corpus.text());
        let prompt_chars: usize = messages.iter().map(|m| m.content.len()).sum();
        let request = ChatRequest::new(llm.model_for(prompt_chars), messages)
            .temperature(llm.temperature)
            .max_tokens(llm.max_tokens)
            .json_output();

        let expected: Option<Vec<String>> = catalog
            .filter(|c| !c.subcategories.is_empty())
            .map(|c| c.subcategories.iter().map(|s| s.name.clone()).collect());

        let operation = format!("review:{}", self.pillar.code());
        self.caller
            .call(&operation, || {
                let provider = Arc::clone(&self.provider);
                let request = request.clone();
                let expected = expected.clone();
                async move {
                    let response = provider.chat(request).await?;
                    parse_review(&response.content, expected.as_deref())
                }
            })
            .await
    }

    fn assemble(
        &self,
        catalog: Option<&ConceptCatalog>,
        evidence: EvidenceScore,
        review: &ReviewResponse,
        mut recommendations: Vec<Recommendation>,
    ) -> PillarResult {
        let floor = self.config.scoring.no_evidence_subcategory_floor;

        // Catalog order when available, otherwise the reviewer's own names.
        let definitions: Vec<(String, Vec<String>)> = match catalog {
            Some(c) if !c.subcategories.is_empty() => c
                .subcategories
                .iter()
                .map(|s| (s.name.clone(), s.concepts.clone()))
                .collect(),
            _ => review
                .subcategories
                .keys()
                .map(|name| (name.clone(), Vec::new()))
                .collect(),
        };
        let max = max_points(definitions.len());

        let mut subcategories: Vec<SubcategoryScore> = definitions
            .into_iter()
            .map(|(name, expected)| {
                let assessed = review.subcategory(&name);
                score_subcategory(
                    name.clone(),
                    expected,
                    assessed,
                    evidence.practice(&name),
                    floor,
                    max,
                )
            })
            .collect();

        for sub in subcategories.iter().filter(|s| !s.substantiated) {
            recommendations.push(missing_evidence_recommendation(self.pillar, sub, max));
        }

        let raw: Vec<(String, u32)> = subcategories
            .iter()
            .map(|s| (s.name.clone(), s.final_score))
            .collect();
        let normalization = SubcategoryNormalizer::new(self.pillar).normalize(&raw);
        for (sub, (_, normalized)) in subcategories.iter_mut().zip(&normalization.scores) {
            sub.normalized_score = *normalized;
        }

        let confidence = if catalog.is_some() {
            evidence.confidence
        } else {
            Confidence::Low
        };

        PillarResult {
            pillar: self.pillar,
            subcategories,
            raw_subcategory_sum: normalization.raw_sum,
            normalization_applied: normalization.applied,
            normalization_factor: normalization.factor,
            overall_score: normalization.total,
            confidence,
            recommendations,
            gap_recommendations: normalization.gap_recommendation.into_iter().collect(),
            evidence,
            fallback_used: false,
            fallback_reason: None,
            degenerate_input: normalization.degenerate_input,
        }
    }
}

/// Apply the zero-evidence floor and gap penalty, and write the justification.
fn score_subcategory(
    name: String,
    expected: Vec<String>,
    assessed: Option<&SubcategoryAssessment>,
    practice: Option<&PracticeCoverage>,
    floor: u32,
    max: u32,
) -> SubcategoryScore {
    let base = assessed.map_or(0, |a| a.score);
    let llm_evidence: Vec<String> = assessed
        .map(|a| {
            a.evidence
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let concepts_found: Vec<String> = practice.map(|p| p.found.clone()).unwrap_or_default();
    let missing_concepts: Vec<String> = practice.map(|p| p.missing.clone()).unwrap_or_default();

    let substantiated = !concepts_found.is_empty() || !llm_evidence.is_empty();

    let (coverage_penalty, gap_penalty) = if substantiated {
        let gap = (missing_concepts.len() as u32).min(base / 4);
        (0, gap)
    } else {
        (base.saturating_sub(floor), 0)
    };
    let final_score = base - coverage_penalty - gap_penalty;

    let confidence = match practice {
        Some(p) if p.score >= 70.0 && !llm_evidence.is_empty() => Confidence::High,
        _ if substantiated => Confidence::Medium,
        _ => Confidence::Low,
    };

    let human_summary = if substantiated {
        let found = concepts_found.len();
        let total = found + missing_concepts.len();
        if total > 0 {
            format!(
                "{name}: {final_score}/{max} points, {found} of {total} expected concepts evidenced"
            )
        } else {
            format!("{name}: {final_score}/{max} points from reviewer evidence")
        }
    } else {
        format!("{name}: no supporting evidence found, held at {final_score}/{max} points")
    };

    let mut evidence_found = concepts_found;
    for item in llm_evidence {
        if !evidence_found.contains(&item) {
            evidence_found.push(item);
        }
    }

    SubcategoryScore {
        name,
        base_score: base,
        coverage_penalty,
        gap_penalty,
        final_score,
        normalized_score: final_score,
        evidence_found,
        missing_concepts,
        expected_concepts: expected,
        substantiated,
        human_summary,
        confidence,
    }
}

fn missing_evidence_recommendation(
    pillar: Pillar,
    sub: &SubcategoryScore,
    max: u32,
) -> Recommendation {
    let description = if sub.expected_concepts.is_empty() {
        format!("The documents give no evidence for {}.", sub.name)
    } else {
        format!(
            "The documents give no evidence for {}. Describe how the workload handles: {}.",
            sub.name,
            sub.expected_concepts.join(", ")
        )
    };
    Recommendation::new(
        pillar,
        format!("Document {} practices", sub.name),
        description,
        Priority::Medium,
    )
    .with_kind(RecommendationKind::MissingEvidence)
    .with_subcategory(sub.name.clone())
    .with_points_recoverable(max.saturating_sub(sub.final_score))
}

/// The deterministic-only result for `pillar`.
///
/// Holds a single subcategory worth the evidence score, so every pillar-result
/// invariant still holds.
pub fn fallback(
    pillar: Pillar,
    evidence: EvidenceScore,
    reason: impl Into<String>,
) -> PillarResult {
    let score = evidence.score.min(100);
    let subcategory = SubcategoryScore {
        name: FALLBACK_SUBCATEGORY.to_string(),
        base_score: score,
        coverage_penalty: 0,
        gap_penalty: 0,
        final_score: score,
        normalized_score: score,
        evidence_found: evidence.concepts_found.clone(),
        missing_concepts: evidence.concepts_missing.clone(),
        expected_concepts: evidence
            .concepts_found
            .iter()
            .chain(&evidence.concepts_missing)
            .cloned()
            .collect(),
        substantiated: !evidence.concepts_found.is_empty(),
        human_summary: format!(
            "Deterministic evidence score {score}/100 from {:.0}% concept coverage",
            evidence.coverage_pct * 100.0
        ),
        confidence: Confidence::Low,
    };

    let mut recommendations = Vec::new();
    if !evidence.concepts_missing.is_empty() {
        let listed: Vec<&str> = evidence
            .concepts_missing
            .iter()
            .take(FALLBACK_MISSING_LISTED)
            .map(String::as_str)
            .collect();
        recommendations.push(
            Recommendation::new(
                pillar,
                format!("Document missing {pillar} concepts"),
                format!("No evidence was found for: {}.", listed.join(", ")),
                Priority::Medium,
            )
            .with_kind(RecommendationKind::MissingEvidence),
        );
    }

    PillarResult {
        pillar,
        subcategories: vec![subcategory],
        raw_subcategory_sum: score,
        normalization_applied: false,
        normalization_factor: 1.0,
        overall_score: score,
        confidence: Confidence::Low,
        recommendations,
        gap_recommendations: Vec::new(),
        evidence,
        fallback_used: true,
        fallback_reason: Some(reason.into()),
        degenerate_input: false,
    }
}
