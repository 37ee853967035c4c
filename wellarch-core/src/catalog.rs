//! Tiered concept catalogs.
//!
//! A catalog lists the terms treated as evidence for one pillar, split into
//! critical / important / nice-to-have tiers, plus the pillar's subcategories
//! and the phrases that indicate advanced practice or a known gap.
//!
//! Built-in catalogs are TOML files compiled into the crate; a
//! [`DirectoryCatalog`] reads the same format from disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssessmentError, Result};
use crate::pillar::Pillar;

const BUILTIN: [(Pillar, &str); 5] = [
    (Pillar::Reliability, include_str!("../catalogs/reliability.toml")),
    (Pillar::Security, include_str!("../catalogs/security.toml")),
    (Pillar::CostOptimization, include_str!("../catalogs/cost.toml")),
    (
        Pillar::OperationalExcellence,
        include_str!("../catalogs/operational.toml"),
    ),
    (
        Pillar::PerformanceEfficiency,
        include_str!("../catalogs/performance.toml"),
    ),
];

/// Concept tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical,
    Important,
    NiceToHave,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Critical, Tier::Important, Tier::NiceToHave];

    /// Share of the raw score carried by this tier (50/30/20).
    pub fn weight(&self) -> f64 {
        match self {
            Tier::Critical => 0.50,
            Tier::Important => 0.30,
            Tier::NiceToHave => 0.20,
        }
    }
}

/// Concept terms grouped by tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredConcepts {
    #[serde(default)]
    pub critical: Vec<String>,
    #[serde(default)]
    pub important: Vec<String>,
    #[serde(default)]
    pub nice_to_have: Vec<String>,
}

impl TieredConcepts {
    pub fn tier(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Critical => &self.critical,
            Tier::Important => &self.important,
            Tier::NiceToHave => &self.nice_to_have,
        }
    }

    pub fn total(&self) -> usize {
        self.critical.len() + self.important.len() + self.nice_to_have.len()
    }
}

/// A named, individually scored sub-criterion of a pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryDef {
    pub name: String,
    /// Framework practice codes covered (RE01, SE05, ...).
    #[serde(default)]
    pub practices: Vec<String>,
    /// Concepts expected in a document that substantiates this subcategory.
    #[serde(default)]
    pub concepts: Vec<String>,
}

/// Everything the scorers need to know about one pillar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCatalog {
    pub pillar: Pillar,
    pub concepts: TieredConcepts,
    #[serde(default)]
    pub advanced_practices: Vec<String>,
    #[serde(default)]
    pub gap_patterns: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryDef>,
}

impl ConceptCatalog {
    /// A catalog with only tiered concepts.
    pub fn new(pillar: Pillar, concepts: TieredConcepts) -> Self {
        Self {
            pillar,
            concepts,
            advanced_practices: Vec::new(),
            gap_patterns: Vec::new(),
            subcategories: Vec::new(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut catalog: Self = toml::from_str(s)?;
        catalog.dedupe_terms();
        Ok(catalog)
    }

    /// The compiled-in catalog for `pillar`.
    pub fn builtin(pillar: Pillar) -> Result<Self> {
        let (_, source) = BUILTIN
            .iter()
            .find(|(p, _)| *p == pillar)
            .ok_or(AssessmentError::CatalogMissing { pillar })?;
        Self::from_toml_str(source)
    }

    /// Trim terms and drop blanks and repeats, keeping first-seen order.
    fn dedupe_terms(&mut self) {
        fn clean(terms: &mut Vec<String>) {
            let mut seen = std::collections::HashSet::new();
            terms.retain_mut(|t| {
                *t = t.trim().to_string();
                !t.is_empty() && seen.insert(t.to_lowercase())
            });
        }
        clean(&mut self.concepts.critical);
        clean(&mut self.concepts.important);
        clean(&mut self.concepts.nice_to_have);
        clean(&mut self.advanced_practices);
        clean(&mut self.gap_patterns);
        for sub in &mut self.subcategories {
            clean(&mut sub.concepts);
        }
    }
}

/// Source of concept catalogs.
pub trait CatalogSource: Send + Sync {
    /// Fails with [`AssessmentError::CatalogMissing`] when the pillar has no catalog.
    fn get_concepts(&self, pillar: Pillar) -> Result<Arc<ConceptCatalog>>;
}

/// Catalogs held in memory, keyed by pillar.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    catalogs: HashMap<Pillar, Arc<ConceptCatalog>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five compiled-in catalogs.
    pub fn builtin() -> Result<Self> {
        let mut source = Self::new();
        for pillar in Pillar::ALL {
            source.insert(ConceptCatalog::builtin(pillar)?);
        }
        Ok(source)
    }

    pub fn insert(&mut self, catalog: ConceptCatalog) {
        self.catalogs.insert(catalog.pillar, Arc::new(catalog));
    }

    #[must_use]
    pub fn with(mut self, catalog: ConceptCatalog) -> Self {
        self.insert(catalog);
        self
    }

    /// Drop the catalog for `pillar`.
    #[must_use]
    pub fn without(mut self, pillar: Pillar) -> Self {
        self.catalogs.remove(&pillar);
        self
    }
}

impl CatalogSource for InMemoryCatalog {
    fn get_concepts(&self, pillar: Pillar) -> Result<Arc<ConceptCatalog>> {
        self.catalogs
            .get(&pillar)
            .cloned()
            .ok_or(AssessmentError::CatalogMissing { pillar })
    }
}

/// Reads `<pillar-code>.toml` catalogs from a directory on each request.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, pillar: Pillar) -> PathBuf {
        self.dir.join(format!("{}.toml", pillar.code()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CatalogSource for DirectoryCatalog {
    fn get_concepts(&self, pillar: Pillar) -> Result<Arc<ConceptCatalog>> {
        let path = self.path_for(pillar);
        if !path.exists() {
            debug!(path = %path.display(), %pillar, "catalog file not found");
            return Err(AssessmentError::CatalogMissing { pillar });
        }
        let contents = std::fs::read_to_string(&path)?;
        let catalog = ConceptCatalog::from_toml_str(&contents)?;
        if catalog.pillar != pillar {
            return Err(AssessmentError::Config(format!(
                "{} declares pillar {} but was loaded for {}",
                path.display(),
                catalog.pillar,
                pillar
            )));
        }
        Ok(Arc::new(catalog))
    }
}
