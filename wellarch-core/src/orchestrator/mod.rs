//! Whole-assessment orchestration.
//!
//! ```text
//! corpus text
//!     │
//!     ├─ Corpus::new (legacy filter, section split)
//!     │
//!     ├─ 5 × PillarEvaluator::evaluate ── join_all ──┐   (one shared RateLimitedCaller)
//!     │        └─ cancelled / timed out ──► fallback │
//!     │                                              ▼
//!     ├─ CrossPillarConflictDetector::detect + annotate
//!     ├─ RecommendationDeduplicator::dedupe
//!     └─ Assessment
//! ```
//!
//! Pillars run as concurrent futures on the calling task, not spawned tasks;
//! they only suspend inside provider calls.

mod progress;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use wellarch_models::providers::ModelProvider;

use crate::caller::RateLimitedCaller;
use crate::catalog::CatalogSource;
use crate::config::AssessmentConfig;
use crate::conflicts::CrossPillarConflictDetector;
use crate::corpus::Corpus;
use crate::dedup::RecommendationDeduplicator;
use crate::embedding::{CachedEmbedder, EmbeddingCache};
use crate::error::AssessmentError;
use crate::evaluator::{PillarEvaluator, fallback};
use crate::pillar::Pillar;
use crate::types::{Assessment, AssessmentStatus, PillarResult, Recommendation};

pub use progress::{NoProgress, Phase, ProgressReporter, ProgressUpdate, phase_progress};

/// History source recorded for the scores a rescore replaces.
pub const RESCORE_SNAPSHOT_SOURCE: &str = "previous";

/// Runs and re-runs full assessments.
pub struct AssessmentOrchestrator {
    provider: Arc<dyn ModelProvider>,
    caller: Arc<RateLimitedCaller>,
    cache: Arc<EmbeddingCache>,
    catalogs: Arc<dyn CatalogSource>,
    config: Arc<AssessmentConfig>,
}

impl AssessmentOrchestrator {
    /// `caller` and `cache` are process-scoped and may be shared with other orchestrators.
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        caller: Arc<RateLimitedCaller>,
        cache: Arc<EmbeddingCache>,
        catalogs: Arc<dyn CatalogSource>,
        config: AssessmentConfig,
    ) -> Self {
        Self {
            provider,
            caller,
            cache,
            catalogs,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// Assess `corpus_text`, reporting phases to `progress`.
    pub async fn run(&self, corpus_text: &str, progress: &dyn ProgressReporter) -> Assessment {
        self.run_with_cancellation(corpus_text, progress, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run); pillars still pending when `cancel` fires or
    /// the run timeout elapses resolve to their deterministic fallback.
    #[instrument(name = "assessment::run", skip_all, fields(chars = corpus_text.len()))]
    pub async fn run_with_cancellation(
        &self,
        corpus_text: &str,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Assessment {
        let deadline = self.config.run.timeout().map(|t| Instant::now() + t);
        progress.report(ProgressUpdate::new(
            Phase::Initialization,
            1.0,
            format!("Assessing {} pillars", Pillar::ALL.len()),
        ));

        // Documents arrive already extracted into the corpus text.
        progress.report(ProgressUpdate::new(
            Phase::DocumentProcessing,
            1.0,
            "Document text received",
        ));

        let corpus = Corpus::new(corpus_text, self.config.scoring.enable_legacy_sections);
        progress.report(ProgressUpdate::new(
            Phase::CorpusAssembly,
            1.0,
            format!(
                "Corpus assembled: {} characters in {} sections",
                corpus.char_len(),
                corpus.sections().len()
            ),
        ));

        let evaluators: Vec<PillarEvaluator> = Pillar::ALL
            .into_iter()
            .map(|pillar| {
                PillarEvaluator::new(
                    pillar,
                    Arc::clone(&self.provider),
                    Arc::clone(&self.caller),
                    Arc::clone(&self.catalogs),
                    Arc::clone(&self.config),
                )
            })
            .collect();

        progress.report(ProgressUpdate::new(
            Phase::PillarEvaluation,
            0.0,
            "Evaluating pillars",
        ));
        let completed = AtomicUsize::new(0);
        let pillars: Vec<PillarResult> = join_all(evaluators.iter().map(|evaluator| {
            self.evaluate_pillar(evaluator, &corpus, deadline, cancel, progress, &completed)
        }))
        .await;

        progress.report(ProgressUpdate::new(
            Phase::CrossPillarAlignment,
            0.0,
            "Checking cross-pillar conflicts",
        ));
        let detector = CrossPillarConflictDetector::new();
        let conflicts = detector.detect(&pillars);
        let mut recommendations: Vec<Recommendation> = pillars
            .iter()
            .flat_map(|p| {
                p.recommendations
                    .iter()
                    .chain(&p.gap_recommendations)
                    .cloned()
            })
            .collect();
        detector.annotate(&conflicts, &mut recommendations);
        progress.report(ProgressUpdate::new(
            Phase::CrossPillarAlignment,
            1.0,
            format!("{} cross-pillar considerations", conflicts.len()),
        ));

        progress.report(ProgressUpdate::new(
            Phase::Synthesis,
            0.0,
            "Deduplicating recommendations",
        ));
        let recommendations = self.deduplicator().dedupe(recommendations).await;
        progress.report(ProgressUpdate::new(
            Phase::Synthesis,
            1.0,
            format!("{} recommendations", recommendations.len()),
        ));

        let status = self.status(&pillars);
        let overall_score = mean_score(&pillars);
        let now = Utc::now();
        let assessment = Assessment {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            status,
            overall_score,
            pillars,
            conflicts,
            recommendations,
            corpus: corpus_text.to_string(),
            score_history: Vec::new(),
        };

        info!(
            id = %assessment.id,
            status = ?assessment.status,
            overall = assessment.overall_score,
            recommendations = assessment.recommendations.len(),
            "assessment complete"
        );
        progress.report(ProgressUpdate::new(
            Phase::Finalization,
            1.0,
            "Assessment complete",
        ));
        assessment
    }

    /// Re-run scoring on the corpus stored in `existing`.
    ///
    /// Keeps the id and creation time and appends the replaced scores to the history.
    #[instrument(name = "assessment::rescore", skip_all, fields(id = %existing.id))]
    pub async fn rescore(&self, existing: &Assessment) -> Assessment {
        let mut rescored = self.run(&existing.corpus, &NoProgress).await;

        let mut history = existing.score_history.clone();
        history.push(existing.snapshot(RESCORE_SNAPSHOT_SOURCE));

        rescored.id = existing.id;
        rescored.created_at = existing.created_at;
        rescored.score_history = history;
        info!(
            previous = existing.overall_score,
            current = rescored.overall_score,
            "assessment rescored"
        );
        rescored
    }

    async fn evaluate_pillar(
        &self,
        evaluator: &PillarEvaluator,
        corpus: &Corpus,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
        completed: &AtomicUsize,
    ) -> PillarResult {
        let pillar = evaluator.pillar();
        let result = tokio::select! {
            result = evaluator.evaluate(corpus) => result,
            reason = interrupted(deadline, cancel) => {
                warn!(%pillar, %reason, "pillar abandoned, using evidence baseline");
                let catalog = evaluator.catalog();
                let evidence = evaluator.evidence(catalog.as_deref(), corpus);
                fallback(pillar, evidence, reason)
            }
        };

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        progress.report(
            ProgressUpdate::new(
                Phase::PillarEvaluation,
                done as f64 / Pillar::ALL.len() as f64,
                format!("{pillar} scored {}/100", result.overall_score),
            )
            .for_pillar(pillar),
        );
        result
    }

    fn deduplicator(&self) -> RecommendationDeduplicator {
        let llm = &self.config.llm;
        let threshold = self.config.scoring.dedup_similarity_threshold;
        if llm.enabled && llm.embeddings_enabled && self.provider.supports_embeddings() {
            let embedder = CachedEmbedder::new(
                Arc::clone(&self.provider),
                Arc::clone(&self.caller),
                Arc::clone(&self.cache),
                llm.embedding_model.clone(),
            );
            RecommendationDeduplicator::new(Some(embedder), threshold)
        } else {
            RecommendationDeduplicator::bag_of_words(threshold)
        }
    }

    /// `Failed` needs every pillar to have fallen back while the model was enabled.
    fn status(&self, pillars: &[PillarResult]) -> AssessmentStatus {
        let fell_back = pillars.iter().filter(|p| p.fallback_used).count();
        if fell_back == pillars.len() && self.config.llm.enabled {
            AssessmentStatus::Failed
        } else if fell_back > 0 {
            AssessmentStatus::Degraded
        } else {
            AssessmentStatus::Completed
        }
    }
}

/// Resolves with a reason once the run is cancelled or past its deadline.
async fn interrupted(deadline: Option<Instant>, cancel: &CancellationToken) -> String {
    let timed_out = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => AssessmentError::Cancelled.to_string(),
        _ = timed_out => "assessment run timed out".to_string(),
    }
}

fn mean_score(pillars: &[PillarResult]) -> f64 {
    if pillars.is_empty() {
        return 0.0;
    }
    let total: u32 = pillars.iter().map(|p| p.overall_score).sum();
    f64::from(total) / pillars.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    use async_trait::async_trait;
    use wellarch_models::providers::{ChatRequest, ChatResponse};

    use crate::catalog::{ConceptCatalog, InMemoryCatalog};
    use crate::config::{LimitsConfig, RunConfig};

    // ============================================================
    // Test providers
    // ============================================================

    /// Scores every built-in subcategory of every pillar with evidence.
    fn universal_review(score: u32) -> String {
        let entries: Vec<String> = Pillar::ALL
            .into_iter()
            .flat_map(|p| ConceptCatalog::builtin(p).unwrap().subcategories)
            .map(|s| format!(r#""{}": {{"score": {score}, "evidence": ["documented"]}}"#, s.name))
            .collect();
        format!(
            r#"{{"subcategories": {{{}}}, "recommendations": [{{"title": "Add health probes", "description": "Probe every backend", "priority": "High"}}]}}"#,
            entries.join(", ")
        )
    }

    struct FixedProvider {
        reply: String,
        calls: AtomicU32,
    }

    impl FixedProvider {
        fn new(reply: String) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn chat(&self, _request: ChatRequest) -> wellarch_models::Result<ChatResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse::text(self.reply.clone()))
        }
    }

    /// Never answers.
    struct HangingProvider;

    #[async_trait]
    impl ModelProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn chat(&self, _request: ChatRequest) -> wellarch_models::Result<ChatResponse> {
            std::future::pending().await
        }
    }

    fn fast_config() -> AssessmentConfig {
        AssessmentConfig {
            limits: LimitsConfig {
                requests_per_second: 1000,
                retry_attempts: 1,
                retry_backoff_ms: 1,
                ..LimitsConfig::default()
            },
            ..AssessmentConfig::default()
        }
    }

    fn orchestrator(
        provider: Arc<dyn ModelProvider>,
        config: AssessmentConfig,
    ) -> AssessmentOrchestrator {
        AssessmentOrchestrator::new(
            provider,
            Arc::new(RateLimitedCaller::new(&config.limits)),
            Arc::new(EmbeddingCache::new()),
            Arc::new(InMemoryCatalog::builtin().unwrap()),
            config,
        )
    }

    const CORPUS: &str = "The web tier runs on Azure App Service with autoscale. \
        Backups are taken nightly and restore drills run quarterly.";

    // ============================================================
    // Run
    // ============================================================

    #[tokio::test]
    async fn run_scores_all_five_pillars() {
        let provider = FixedProvider::new(universal_review(10));
        let orchestrator = orchestrator(provider.clone(), fast_config());
        let assessment = orchestrator.run(CORPUS, &NoProgress).await;

        assert_eq!(assessment.status, AssessmentStatus::Completed);
        assert_eq!(assessment.pillars.len(), 5);
        let order: Vec<Pillar> = assessment.pillars.iter().map(|p| p.pillar).collect();
        assert_eq!(order, Pillar::ALL.to_vec());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 5);

        let mean = assessment
            .pillars
            .iter()
            .map(|p| f64::from(p.overall_score))
            .sum::<f64>()
            / 5.0;
        assert!((assessment.overall_score - mean).abs() < 1e-9);
        assert_eq!(assessment.corpus, CORPUS);
    }

    #[tokio::test]
    async fn identical_recommendations_collapse_across_pillars() {
        let orchestrator = orchestrator(FixedProvider::new(universal_review(10)), fast_config());
        let assessment = orchestrator.run(CORPUS, &NoProgress).await;

        let probes: Vec<&Recommendation> = assessment
            .recommendations
            .iter()
            .filter(|r| r.title == "Add health probes")
            .collect();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].pillar, Pillar::Reliability);
        assert_eq!(probes[0].also_raised_by.len(), 4);
    }

    #[tokio::test]
    async fn progress_is_reported_in_phase_order() {
        let updates = Mutex::new(Vec::new());
        let reporter = |u: ProgressUpdate| updates.lock().unwrap().push(u);
        let orchestrator = orchestrator(FixedProvider::new(universal_review(5)), fast_config());
        orchestrator.run(CORPUS, &reporter).await;

        let updates = updates.into_inner().unwrap();
        assert!(updates.windows(2).all(|w| w[0].phase <= w[1].phase));
        assert!(updates.windows(2).all(|w| w[0].percent <= w[1].percent));
        assert_eq!(updates.first().unwrap().phase, Phase::Initialization);
        assert_eq!(updates.last().unwrap().percent, 100);
        let per_pillar = updates.iter().filter(|u| u.pillar.is_some()).count();
        assert_eq!(per_pillar, 5);
    }

    #[tokio::test]
    async fn disabled_model_degrades_without_failing() {
        let mut config = fast_config();
        config.llm.enabled = false;
        let provider = FixedProvider::new(universal_review(10));
        let assessment = orchestrator(provider.clone(), config)
            .run(CORPUS, &NoProgress)
            .await;

        assert_eq!(assessment.status, AssessmentStatus::Degraded);
        assert!(assessment.pillars.iter().all(|p| p.fallback_used));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    // ============================================================
    // Cancellation and timeout
    // ============================================================

    #[tokio::test]
    async fn cancelled_run_resolves_every_pillar_to_fallback() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let assessment = orchestrator(Arc::new(HangingProvider), fast_config())
            .run_with_cancellation(CORPUS, &NoProgress, &cancel)
            .await;

        assert_eq!(assessment.status, AssessmentStatus::Failed);
        for pillar in &assessment.pillars {
            assert!(pillar.fallback_used);
            assert_eq!(pillar.fallback_reason.as_deref(), Some("assessment cancelled"));
            assert_eq!(pillar.overall_score, pillar.evidence.score);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_timeout_resolves_pending_pillars() {
        let mut config = fast_config();
        config.run = RunConfig { timeout_secs: 5 };
        let assessment = orchestrator(Arc::new(HangingProvider), config)
            .run(CORPUS, &NoProgress)
            .await;

        assert_eq!(assessment.pillars.len(), 5);
        assert!(
            assessment
                .pillars
                .iter()
                .all(|p| p.fallback_reason.as_deref() == Some("assessment run timed out"))
        );
    }

    // ============================================================
    // Rescore
    // ============================================================

    #[tokio::test]
    async fn rescore_keeps_identity_and_records_history() {
        let orchestrator = orchestrator(FixedProvider::new(universal_review(12)), fast_config());
        let first = orchestrator.run(CORPUS, &NoProgress).await;
        let second = orchestrator.rescore(&first).await;
        let third = orchestrator.rescore(&second).await;

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.score_history.len(), 1);
        assert_eq!(second.score_history[0].source, RESCORE_SNAPSHOT_SOURCE);
        assert_eq!(second.score_history[0].overall_score, first.overall_score);
        assert_eq!(third.score_history.len(), 2);

        for (a, b) in second.pillars.iter().zip(&third.pillars) {
            assert_eq!(
                serde_json::to_string(&a.subcategories).unwrap(),
                serde_json::to_string(&b.subcategories).unwrap()
            );
        }
    }
}
