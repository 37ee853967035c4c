//! Strict parsing of pillar review responses.
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "subcategories": { "<name>": { "score": 0, "evidence": ["..."] } },
//!   "recommendations": [
//!     { "title": "...", "description": "...", "priority": "High", "subcategory": "<name>" }
//!   ]
//! }
//! ```
//!
//! Anything that does not fit is a [`ProviderError::Malformed`], which the
//! caller retries and the evaluator eventually turns into a fallback.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::pillar::Pillar;
use crate::types::{Level, Priority, Recommendation};

/// One subcategory as scored by the reviewer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubcategoryAssessment {
    pub score: u32,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Priority given either by name or as a 0-10 impact number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriorityValue {
    Name(String),
    Score(f64),
}

impl PriorityValue {
    fn resolve(&self) -> Result<Priority, ProviderError> {
        match self {
            PriorityValue::Name(name) => parse_priority_name(name),
            PriorityValue::Score(score) => Ok(priority_from_impact(*score)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecommendation {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Option<PriorityValue>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub affected_services: Vec<String>,
    #[serde(default)]
    pub effort: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub impact_score: Option<f64>,
}

/// A validated review.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewResponse {
    pub subcategories: BTreeMap<String, SubcategoryAssessment>,
    #[serde(default)]
    pub recommendations: Vec<RawRecommendation>,
}

impl ReviewResponse {
    /// Case-insensitive subcategory lookup.
    pub fn subcategory(&self, name: &str) -> Option<&SubcategoryAssessment> {
        self.subcategories.get(name).or_else(|| {
            self.subcategories
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(name.trim()))
                .map(|(_, v)| v)
        })
    }

    /// Convert into recommendations owned by `pillar`.
    pub fn recommendations(&self, pillar: Pillar) -> Result<Vec<Recommendation>, ProviderError> {
        self.recommendations
            .iter()
            .map(|raw| {
                let priority = match (&raw.priority, raw.impact_score) {
                    (Some(p), _) => p.resolve()?,
                    (None, Some(score)) => priority_from_impact(score),
                    (None, None) => Priority::Medium,
                };
                let mut rec =
                    Recommendation::new(pillar, raw.title.trim(), raw.description.trim(), priority);
                rec.source_subcategory = raw.subcategory.clone();
                rec.affected_services = raw.affected_services.clone();
                rec.effort = raw.effort.as_deref().and_then(parse_level);
                rec.impact = raw.impact.as_deref().and_then(parse_level);
                Ok(rec)
            })
            .collect()
    }
}

/// Parse and validate a review.
///
/// `expected` lists the catalog's subcategory names; when given, at least one
/// of them must be scored.
pub fn parse_review(
    text: &str,
    expected: Option<&[String]>,
) -> Result<ReviewResponse, ProviderError> {
    let json = extract_json_object(text)
        .ok_or_else(|| ProviderError::Malformed("no JSON object in response".to_string()))?;
    let review: ReviewResponse =
        serde_json::from_str(json).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    if review.subcategories.is_empty() {
        return Err(ProviderError::Malformed("no subcategories scored".to_string()));
    }
    if let Some((name, a)) = review.subcategories.iter().find(|(_, a)| a.score > 100) {
        return Err(ProviderError::Malformed(format!(
            "subcategory '{name}' scored {} (max 100)",
            a.score
        )));
    }
    if review.recommendations.iter().any(|r| r.title.trim().is_empty()) {
        return Err(ProviderError::Malformed("recommendation without title".to_string()));
    }
    if let Some(expected) = expected
        && !expected.is_empty()
        && !expected.iter().any(|name| review.subcategory(name).is_some())
    {
        return Err(ProviderError::Malformed(
            "none of the expected subcategories were scored".to_string(),
        ));
    }
    // unknown priority names
    for raw in &review.recommendations {
        if let Some(p) = &raw.priority {
            p.resolve()?;
        }
    }

    Ok(review)
}

/// Slice from the first `{` to the last `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_priority_name(name: &str) -> Result<Priority, ProviderError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "critical" => Ok(Priority::Critical),
        "high" => Ok(Priority::High),
        "medium" | "moderate" => Ok(Priority::Medium),
        "low" => Ok(Priority::Low),
        other => Err(ProviderError::Malformed(format!("unknown priority '{other}'"))),
    }
}

/// Map a 0-10 impact score onto a priority.
pub fn priority_from_impact(score: f64) -> Priority {
    if score >= 9.0 {
        Priority::Critical
    } else if score >= 7.0 {
        Priority::High
    } else if score >= 5.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "low" => Some(Level::Low),
        "medium" => Some(Level::Medium),
        "high" => Some(Level::High),
        _ => None,
    }
}
