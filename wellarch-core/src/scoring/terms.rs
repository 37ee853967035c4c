//! Compiled term matchers and the fixed signal vocabularies.

use std::sync::LazyLock;

use regex::Regex;

/// Stems counted as implementation language ("implemented", "deploys", ...).
const IMPLEMENTATION_STEMS: &[&str] = &[
    "implement",
    "deploy",
    "configur",
    "enabl",
    "enforc",
    "automat",
    "provision",
    "replicat",
    "integrat",
    "monitor",
    "rotat",
    "schedul",
    "validat",
];

/// Phrases that admit something is absent or unfinished.
const NEGATIVE_PATTERNS: &[&str] = &[
    r"(?i)\bnot\s+(?:yet\s+)?(?:implemented|configured|enabled|defined|documented|tested|in\s+place)\b",
    r"(?i)\b(?:lacks?|lacking|missing|absent)\b",
    r"(?i)\bwithout\s+(?:any\s+)?(?:backups?|redundancy|monitoring|encryption|testing|automation)\b",
    r"(?i)\bno\s+(?:formal|defined|documented|automated|dedicated)\b",
    r"(?i)\b(?:tbd|todo|to\s+be\s+determined)\b",
    r"(?i)\bmanual(?:ly)?\b",
];

/// A quantity with a unit: "99.95%", "15 minutes", "p95 < 200 ms", "1500 rps".
static METRIC_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s?(?:%|(?:ms|milliseconds?|s|secs?|seconds?|mins?|minutes?|h|hrs?|hours?|days?|rps|tps|qps|requests?|users|gb|tb|mb|nines)\b)",
    )
    .expect("metric pattern is valid")
});

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("sentence pattern is valid"));

static IMPLEMENTATION_VERBS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    IMPLEMENTATION_STEMS
        .iter()
        .map(|stem| TermPattern::stem(stem))
        .collect()
});

static NEGATIVE_MENTIONS: LazyLock<Vec<TermPattern>> = LazyLock::new(|| {
    NEGATIVE_PATTERNS
        .iter()
        .map(|p| TermPattern::raw(p))
        .collect()
});

/// A compiled regex with its source term.
#[derive(Debug, Clone)]
pub struct TermPattern {
    term: String,
    regex: Regex,
}

impl TermPattern {
    /// Case-insensitive, word-bounded phrase; inner whitespace matches any run.
    pub fn phrase(term: &str) -> Option<Self> {
        let tokens: Vec<String> = term.split_whitespace().map(regex::escape).collect();
        if tokens.is_empty() {
            return None;
        }
        let pattern = format!(r"(?i)\b{}\b", tokens.join(r"\s+"));
        Regex::new(&pattern).ok().map(|regex| Self {
            term: term.trim().to_string(),
            regex,
        })
    }

    /// Case-insensitive word prefix over a built-in stem.
    fn stem(stem: &str) -> Self {
        Self {
            term: stem.to_string(),
            regex: Regex::new(&format!(r"(?i)\b{}\w*", regex::escape(stem)))
                .expect("escaped stem is a valid pattern"),
        }
    }

    /// A built-in pattern.
    fn raw(pattern: &str) -> Self {
        Self {
            term: pattern.to_string(),
            regex: Regex::new(pattern).expect("built-in pattern is valid"),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// Compile phrases, skipping blanks.
pub fn compile_phrases(terms: &[String]) -> Vec<TermPattern> {
    terms.iter().filter_map(|t| TermPattern::phrase(t)).collect()
}

/// Weight for repeated mentions: 1 → 1×, 2–3 → 1.5×, ≥4 → 2×.
pub fn density_weight(mentions: usize) -> f64 {
    match mentions {
        0 => 0.0,
        1 => 1.0,
        2..=3 => 1.5,
        _ => 2.0,
    }
}

/// Density-weighted hits over distinct patterns.
pub fn weighted_hits(patterns: &[TermPattern], text: &str) -> f64 {
    patterns.iter().map(|p| density_weight(p.count(text))).sum()
}

pub fn implementation_hits(text: &str) -> f64 {
    weighted_hits(&IMPLEMENTATION_VERBS, text)
}

pub fn negative_mentions(text: &str) -> usize {
    NEGATIVE_MENTIONS.iter().map(|p| p.count(text)).sum()
}

pub fn metric_pairs(text: &str) -> usize {
    METRIC_PAIR.find_iter(text).count()
}

/// Mean sentence length in characters.
pub fn average_sentence_length(text: &str) -> f64 {
    let sentences: Vec<usize> = SENTENCE_END
        .split(text)
        .map(|s| s.trim().chars().count())
        .filter(|&n| n > 0)
        .collect();
    if sentences.is_empty() {
        0.0
    } else {
        sentences.iter().sum::<usize>() as f64 / sentences.len() as f64
    }
}
