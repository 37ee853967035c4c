//! Tiered concept coverage.

use serde::{Deserialize, Serialize};

use super::terms::{TermPattern, compile_phrases};
use crate::catalog::{ConceptCatalog, Tier};

/// Found and missing concepts of one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCoverage {
    pub tier: Tier,
    /// `(concept, mentions)` for every concept present, in catalog order.
    pub found: Vec<(String, usize)>,
    pub missing: Vec<String>,
}

impl TierCoverage {
    pub fn total(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    /// Fraction of the tier's concepts present; 0 for an empty tier.
    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.found.len() as f64 / total as f64,
        }
    }
}

/// Concept evidence for one subcategory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeCoverage {
    pub name: String,
    pub found: Vec<String>,
    pub missing: Vec<String>,
    /// Percentage of expected concepts present.
    pub score: f64,
}

/// Raw coverage signals for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Critical, important, nice-to-have.
    pub tiers: Vec<TierCoverage>,
    /// Found over total across the whole catalog, in `[0, 1]`.
    pub coverage_pct: f64,
    pub practices: Vec<PracticeCoverage>,
}

impl CoverageReport {
    pub fn tier(&self, tier: Tier) -> Option<&TierCoverage> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn found_concepts(&self) -> impl Iterator<Item = &str> {
        self.tiers
            .iter()
            .flat_map(|t| t.found.iter().map(|(c, _)| c.as_str()))
    }

    pub fn missing_concepts(&self) -> impl Iterator<Item = &str> {
        self.tiers
            .iter()
            .flat_map(|t| t.missing.iter().map(String::as_str))
    }

    pub fn missing_critical(&self) -> usize {
        self.tier(Tier::Critical).map_or(0, |t| t.missing.len())
    }
}

/// Case-insensitive, word-bounded matcher over a pillar's catalog.
pub struct ConceptCoverageScorer {
    tiers: Vec<(Tier, Vec<TermPattern>)>,
    practices: Vec<(String, Vec<TermPattern>)>,
}

impl ConceptCoverageScorer {
    pub fn new(catalog: &ConceptCatalog) -> Self {
        let tiers = Tier::ALL
            .into_iter()
            .map(|tier| (tier, compile_phrases(catalog.concepts.tier(tier))))
            .collect();
        let practices = catalog
            .subcategories
            .iter()
            .map(|s| (s.name.clone(), compile_phrases(&s.concepts)))
            .collect();
        Self { tiers, practices }
    }

    pub fn scan(&self, text: &str) -> CoverageReport {
        let mut found_total = 0;
        let mut concept_total = 0;

        let tiers: Vec<TierCoverage> = self
            .tiers
            .iter()
            .map(|(tier, patterns)| {
                let mut found = Vec::new();
                let mut missing = Vec::new();
                for pattern in patterns {
                    let mentions = pattern.count(text);
                    if mentions > 0 {
                        found.push((pattern.term().to_string(), mentions));
                    } else {
                        missing.push(pattern.term().to_string());
                    }
                }
                found_total += found.len();
                concept_total += patterns.len();
                TierCoverage {
                    tier: *tier,
                    found,
                    missing,
                }
            })
            .collect();

        let coverage_pct = if concept_total == 0 {
            0.0
        } else {
            found_total as f64 / concept_total as f64
        };

        let practices = self
            .practices
            .iter()
            .map(|(name, patterns)| {
                let (found, missing): (Vec<_>, Vec<_>) =
                    patterns.iter().partition(|p| p.is_match(text));
                let score = if patterns.is_empty() {
                    0.0
                } else {
                    found.len() as f64 / patterns.len() as f64 * 100.0
                };
                PracticeCoverage {
                    name: name.clone(),
                    found: found.iter().map(|p| p.term().to_string()).collect(),
                    missing: missing.iter().map(|p| p.term().to_string()).collect(),
                    score,
                }
            })
            .collect();

        CoverageReport {
            tiers,
            coverage_pct,
            practices,
        }
    }
}
