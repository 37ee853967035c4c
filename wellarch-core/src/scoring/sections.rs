//! Per-section evidence scoring.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::coverage::PracticeCoverage;
use super::engine::{ConservativeScoringEngine, ScoreBreakdown, ScoreOutcome, confidence};
use crate::catalog::{ConceptCatalog, Tier};
use crate::corpus::{Corpus, SectionKind};
use crate::types::Confidence;

/// Engine output for one scored span of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    /// `None` for a whole-corpus single pass.
    pub kind: Option<SectionKind>,
    pub score: u32,
    pub confidence: Confidence,
    pub breakdown: ScoreBreakdown,
}

/// Deterministic evidence for one pillar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceScore {
    pub score: u32,
    pub confidence: Confidence,
    pub coverage_pct: f64,
    pub multi_section: bool,
    pub sections: Vec<SectionScore>,
    /// Concepts found in at least one section, in catalog order.
    pub concepts_found: Vec<String>,
    pub concepts_missing: Vec<String>,
    pub practices: Vec<PracticeCoverage>,
}

impl EvidenceScore {
    /// Subcategory evidence by name.
    pub fn practice(&self, name: &str) -> Option<&PracticeCoverage> {
        self.practices.iter().find(|p| p.name == name)
    }
}

/// Scores each present section independently and averages the results.
///
/// Falls back to one whole-corpus pass when fewer than two sections are
/// recognized.
pub struct MultiSectionScorer {
    engine: ConservativeScoringEngine,
    concepts: Vec<String>,
}

impl MultiSectionScorer {
    pub fn new(catalog: &ConceptCatalog) -> Self {
        let concepts = Tier::ALL
            .into_iter()
            .flat_map(|t| catalog.concepts.tier(t).iter().cloned())
            .collect();
        Self {
            engine: ConservativeScoringEngine::new(catalog),
            concepts,
        }
    }

    pub fn score(&self, corpus: &Corpus) -> EvidenceScore {
        match corpus.require_sections() {
            Ok(sections) if sections.len() >= 2 => {
                let outcomes: Vec<_> = sections
                    .iter()
                    .map(|s| (Some(s.kind), self.engine.evaluate(&s.text)))
                    .collect();
                self.combine(outcomes, corpus.char_len())
            }
            Ok(_) => self.single_pass(corpus.text()),
            Err(e) => {
                debug!(error = %e, "scoring whole corpus in one pass");
                self.single_pass(corpus.text())
            }
        }
    }

    pub fn single_pass(&self, text: &str) -> EvidenceScore {
        let outcome = self.engine.evaluate(text);
        let found: HashSet<&str> = outcome.coverage.found_concepts().collect();
        let (concepts_found, concepts_missing) = self.partition(&found);
        EvidenceScore {
            score: outcome.score,
            confidence: outcome.confidence,
            coverage_pct: outcome.coverage.coverage_pct,
            multi_section: false,
            concepts_found,
            concepts_missing,
            practices: outcome.coverage.practices.clone(),
            sections: vec![SectionScore {
                kind: None,
                score: outcome.score,
                confidence: outcome.confidence,
                breakdown: outcome.breakdown,
            }],
        }
    }

    fn combine(
        &self,
        outcomes: Vec<(Option<SectionKind>, ScoreOutcome)>,
        chars: usize,
    ) -> EvidenceScore {
        let n = outcomes.len() as f64;
        let mean = outcomes.iter().map(|(_, o)| o.score as f64).sum::<f64>() / n;

        let found: HashSet<&str> = outcomes
            .iter()
            .flat_map(|(_, o)| o.coverage.found_concepts())
            .collect();
        let (concepts_found, concepts_missing) = self.partition(&found);
        let coverage_pct = if self.concepts.is_empty() {
            0.0
        } else {
            concepts_found.len() as f64 / self.concepts.len() as f64
        };

        let practices = merge_practices(&outcomes);

        EvidenceScore {
            score: mean.round() as u32,
            confidence: confidence(coverage_pct, chars),
            coverage_pct,
            multi_section: true,
            concepts_found,
            concepts_missing,
            practices,
            sections: outcomes
                .into_iter()
                .map(|(kind, o)| SectionScore {
                    kind,
                    score: o.score,
                    confidence: o.confidence,
                    breakdown: o.breakdown,
                })
                .collect(),
        }
    }

    fn partition(&self, found: &HashSet<&str>) -> (Vec<String>, Vec<String>) {
        self.concepts
            .iter()
            .cloned()
            .partition(|c| found.contains(c.as_str()))
    }
}

/// Union found concepts per subcategory; average scores over the sections
/// where the subcategory had any evidence.
fn merge_practices(outcomes: &[(Option<SectionKind>, ScoreOutcome)]) -> Vec<PracticeCoverage> {
    let Some((_, first)) = outcomes.first() else {
        return Vec::new();
    };

    first
        .coverage
        .practices
        .iter()
        .map(|template| {
            let per_section: Vec<&PracticeCoverage> = outcomes
                .iter()
                .filter_map(|(_, o)| {
                    o.coverage
                        .practices
                        .iter()
                        .find(|p| p.name == template.name)
                })
                .collect();

            let expected: Vec<&String> = template.found.iter().chain(&template.missing).collect();
            let mut found = Vec::new();
            let mut missing = Vec::new();
            for concept in expected {
                if per_section.iter().any(|p| p.found.contains(concept)) {
                    found.push(concept.clone());
                } else {
                    missing.push(concept.clone());
                }
            }

            let appearing: Vec<f64> = per_section
                .iter()
                .filter(|p| !p.found.is_empty())
                .map(|p| p.score)
                .collect();
            let score = if appearing.is_empty() {
                0.0
            } else {
                appearing.iter().sum::<f64>() / appearing.len() as f64
            };

            PracticeCoverage {
                name: template.name.clone(),
                found,
                missing,
                score,
            }
        })
        .collect()
}
