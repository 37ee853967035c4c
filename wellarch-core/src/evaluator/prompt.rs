//! Review prompt construction.

use wellarch_models::providers::Message;

use crate::catalog::ConceptCatalog;
use crate::pillar::Pillar;
use crate::scoring::EvidenceScore;

const SYSTEM_PROMPT: &str = "You are a cloud architecture reviewer. Score only what the \
documents demonstrate. Unsupported claims earn nothing. Respond with a single JSON object \
and no other text.";

const RESPONSE_FORMAT: &str = r#"{"subcategories": {"<name>": {"score": <int>, "evidence": ["<quote or fact>"]}}, "recommendations": [{"title": "", "description": "", "priority": "Critical|High|Medium|Low", "subcategory": "<name>", "affected_services": [], "effort": "low|medium|high", "impact": "low|medium|high"}]}"#;

/// Points available to each of `n` subcategories.
pub fn max_points(n: usize) -> u32 {
    match n {
        0 => 100,
        n => 100 / n as u32,
    }
}

/// System and user messages for one pillar review.
pub fn review_messages(
    pillar: Pillar,
    catalog: Option<&ConceptCatalog>,
    evidence: &EvidenceScore,
    corpus: &str,
) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(user_prompt(pillar, catalog, evidence, corpus)),
    ]
}

fn user_prompt(
    pillar: Pillar,
    catalog: Option<&ConceptCatalog>,
    evidence: &EvidenceScore,
    corpus: &str,
) -> String {
    let mut lines = vec![format!("# {} review ({})", pillar, pillar.prefix()), String::new()];

    match catalog.filter(|c| !c.subcategories.is_empty()) {
        Some(catalog) => {
            let max = max_points(catalog.subcategories.len());
            lines.push(format!(
                "Score each subcategory from 0 to {max} points. The points of all subcategories \
                 together make up the pillar's score out of 100."
            ));
            lines.push(String::new());
            for sub in &catalog.subcategories {
                if sub.practices.is_empty() {
                    lines.push(format!("- {}", sub.name));
                } else {
                    lines.push(format!("- {} [{}]", sub.name, sub.practices.join(", ")));
                }
                if !sub.concepts.is_empty() {
                    lines.push(format!("  expected evidence: {}", sub.concepts.join(", ")));
                }
            }
        }
        None => lines.push(
            "Choose 3 to 6 subcategories for this pillar and score each one. The points \
             of all subcategories together make up the pillar's score out of 100."
                .to_string(),
        ),
    }

    lines.push(String::new());
    lines.push("## Deterministic evidence scan".to_string());
    lines.push(format!("baseline score: {}/100", evidence.score));
    lines.push(format!("concept coverage: {:.0}%", evidence.coverage_pct * 100.0));
    if !evidence.concepts_found.is_empty() {
        lines.push(format!("found: {}", evidence.concepts_found.join(", ")));
    }
    if !evidence.concepts_missing.is_empty() {
        lines.push(format!("missing: {}", evidence.concepts_missing.join(", ")));
    }

    lines.push(String::new());
    lines.push("## Response format".to_string());
    lines.push(RESPONSE_FORMAT.to_string());
    lines.push(
        "Leave evidence empty when the documents say nothing about a subcategory.".to_string(),
    );

    lines.push(String::new());
    lines.push("## Documents".to_string());
    lines.push(corpus.to_string());
    lines.join("\n")
}
