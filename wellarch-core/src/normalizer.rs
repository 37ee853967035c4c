//! Bottom-up subcategory normalization.
//!
//! Subcategory scores are point contributions to a pillar's 100. When they
//! overflow, every score is scaled by `100 / raw_sum` and a single gap
//! recommendation records the points that could not be counted.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AssessmentError, Result};
use crate::pillar::Pillar;
use crate::types::{Priority, Recommendation, RecommendationKind};

/// Largest contributors named in the gap recommendation.
const TOP_CONTRIBUTORS: usize = 3;

/// Output of [`SubcategoryNormalizer::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    /// `(name, normalized score)` in input order.
    pub scores: Vec<(String, u32)>,
    pub raw_sum: u32,
    pub applied: bool,
    /// `100 / raw_sum` when applied, otherwise 1.
    pub factor: f64,
    /// Sum of `scores`.
    pub total: u32,
    pub degenerate_input: bool,
    pub gap_recommendation: Option<Recommendation>,
}

/// Rescales subcategory point contributions so they never exceed 100.
#[derive(Debug, Clone, Copy)]
pub struct SubcategoryNormalizer {
    pillar: Pillar,
}

impl SubcategoryNormalizer {
    pub fn new(pillar: Pillar) -> Self {
        Self { pillar }
    }

    /// Sum of `raw`, or [`AssessmentError::Normalization`] when it is not positive.
    pub fn raw_sum(raw: &[(String, u32)]) -> Result<u32> {
        match raw.iter().map(|(_, s)| *s).sum::<u32>() {
            0 => Err(AssessmentError::Normalization(format!(
                "raw subcategory sum is 0 across {} subcategories",
                raw.len()
            ))),
            sum => Ok(sum),
        }
    }

    pub fn normalize(&self, raw: &[(String, u32)]) -> Normalization {
        let raw_sum = match Self::raw_sum(raw) {
            Ok(sum) => sum,
            Err(e) => {
                warn!(pillar = %self.pillar, error = %e, "degenerate subcategory input");
                return Normalization {
                    scores: raw.iter().map(|(n, _)| (n.clone(), 0)).collect(),
                    raw_sum: 0,
                    applied: false,
                    factor: 1.0,
                    total: 0,
                    degenerate_input: true,
                    gap_recommendation: None,
                };
            }
        };

        if raw_sum <= 100 {
            return Normalization {
                scores: raw.to_vec(),
                raw_sum,
                applied: false,
                factor: 1.0,
                total: raw_sum,
                degenerate_input: false,
                gap_recommendation: None,
            };
        }

        let factor = 100.0 / raw_sum as f64;
        let mut scores: Vec<(String, u32)> = raw
            .iter()
            .map(|(name, score)| (name.clone(), (*score as f64 * factor).round() as u32))
            .collect();
        correct_rounding(&mut scores, 100);

        let points = raw_sum - 100;
        debug!(
            pillar = %self.pillar,
            raw_sum,
            factor,
            points_recoverable = points,
            "subcategory scores normalized"
        );

        Normalization {
            scores,
            raw_sum,
            applied: true,
            factor,
            total: 100,
            degenerate_input: false,
            gap_recommendation: Some(self.gap_recommendation(raw, raw_sum, points)),
        }
    }

    fn gap_recommendation(
        &self,
        raw: &[(String, u32)],
        raw_sum: u32,
        points: u32,
    ) -> Recommendation {
        let names: Vec<&str> = top_contributors(raw, TOP_CONTRIBUTORS)
            .into_iter()
            .map(|(name, _)| name.as_str())
            .collect();

        Recommendation::new(
            self.pillar,
            format!("Recover {points} points lost to {} overflow", self.pillar),
            format!(
                "Subcategory scores summed to {raw_sum} and were scaled down to 100. \
                 Largest contributors: {}. Tightening evidence for the remaining \
                 subcategories recovers up to {points} points.",
                names.join(", ")
            ),
            Priority::High,
        )
        .with_kind(RecommendationKind::Gap)
        .with_points_recoverable(points)
    }
}

/// Adjust the last entry (spilling backwards) so the total equals `target`.
fn correct_rounding(scores: &mut [(String, u32)], target: u32) {
    let total: i64 = scores.iter().map(|(_, s)| i64::from(*s)).sum();
    let mut diff = i64::from(target) - total;
    for (_, score) in scores.iter_mut().rev() {
        if diff == 0 {
            break;
        }
        let adjusted = (i64::from(*score) + diff).max(0);
        diff -= adjusted - i64::from(*score);
        *score = adjusted as u32;
    }
}

/// Highest raw scores, ties broken by input order.
fn top_contributors(raw: &[(String, u32)], n: usize) -> Vec<&(String, u32)> {
    let mut ranked: Vec<&(String, u32)> = raw.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(entries: &[(&str, u32)]) -> Vec<(String, u32)> {
        entries.iter().map(|(n, s)| (n.to_string(), *s)).collect()
    }

    #[test]
    fn scenario_b_overflow_is_normalized_with_one_gap() {
        let normalizer = SubcategoryNormalizer::new(Pillar::Reliability);
        let result =
            normalizer.normalize(&raw(&[("A", 22), ("B", 24), ("C", 31), ("D", 27), ("E", 27)]));

        assert_eq!(result.raw_sum, 131);
        assert!(result.applied);
        assert_eq!(result.scores.iter().map(|(_, s)| s).sum::<u32>(), 100);
        assert_eq!(result.total, 100);
        assert!((result.factor - 100.0 / 131.0).abs() < 1e-12);

        let gap = result.gap_recommendation.unwrap();
        assert_eq!(gap.points_recoverable, Some(31));
        assert_eq!(gap.priority, Priority::High);
        assert_eq!(gap.kind, RecommendationKind::Gap);
        assert!(gap.description.contains("C, D, E"), "{}", gap.description);
    }

    #[test]
    fn sums_at_or_below_100_are_untouched() {
        let normalizer = SubcategoryNormalizer::new(Pillar::Security);
        let input = raw(&[("A", 40), ("B", 60)]);
        let result = normalizer.normalize(&input);

        assert!(!result.applied);
        assert_eq!(result.scores, input);
        assert_eq!(result.raw_sum, 100);
        assert_eq!(result.factor, 1.0);
        assert!(result.gap_recommendation.is_none());
    }

    #[test]
    fn zero_sum_is_degenerate() {
        let normalizer = SubcategoryNormalizer::new(Pillar::CostOptimization);
        let result = normalizer.normalize(&raw(&[("A", 0), ("B", 0)]));

        assert!(result.degenerate_input);
        assert!(!result.applied);
        assert!(result.scores.iter().all(|(_, s)| *s == 0));
        assert!(result.gap_recommendation.is_none());

        assert!(normalizer.normalize(&[]).degenerate_input);
        assert!(matches!(
            SubcategoryNormalizer::raw_sum(&[]),
            Err(AssessmentError::Normalization(_))
        ));
    }

    #[test]
    fn rounding_correction_never_goes_negative() {
        // 7 x 15 = 105: every entry rounds down to 14
        let input: Vec<(String, u32)> = (0..7).map(|i| (format!("S{i}"), 15)).collect();
        let result = SubcategoryNormalizer::new(Pillar::PerformanceEfficiency).normalize(&input);
        assert_eq!(result.scores.iter().map(|(_, s)| s).sum::<u32>(), 100);

        let mut tiny = raw(&[("A", 0), ("B", 0)]);
        correct_rounding(&mut tiny, 0);
        assert_eq!(tiny, raw(&[("A", 0), ("B", 0)]));

        let mut over = raw(&[("A", 60), ("B", 1), ("C", 1)]);
        correct_rounding(&mut over, 58);
        assert_eq!(over, raw(&[("A", 58), ("B", 0), ("C", 0)]));
    }

    #[test]
    fn gap_names_at_most_three_contributors_first_seen_on_ties() {
        let input = raw(&[("A", 50), ("B", 50), ("C", 50), ("D", 50)]);
        let top: Vec<&str> = top_contributors(&input, 3)
            .into_iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(top, vec!["A", "B", "C"]);
    }
}
