//! The five assessed quality dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A pillar of the Well-Architected framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Reliability,
    Security,
    CostOptimization,
    OperationalExcellence,
    PerformanceEfficiency,
}

impl Pillar {
    /// All pillars in canonical reporting order.
    pub const ALL: [Pillar; 5] = [
        Pillar::Reliability,
        Pillar::Security,
        Pillar::CostOptimization,
        Pillar::OperationalExcellence,
        Pillar::PerformanceEfficiency,
    ];

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Pillar::Reliability => "Reliability",
            Pillar::Security => "Security",
            Pillar::CostOptimization => "Cost Optimization",
            Pillar::OperationalExcellence => "Operational Excellence",
            Pillar::PerformanceEfficiency => "Performance Efficiency",
        }
    }

    /// Short machine code, also the catalog file stem.
    pub fn code(&self) -> &'static str {
        match self {
            Pillar::Reliability => "reliability",
            Pillar::Security => "security",
            Pillar::CostOptimization => "cost",
            Pillar::OperationalExcellence => "operational",
            Pillar::PerformanceEfficiency => "performance",
        }
    }

    /// Two-letter practice prefix (RE01, SE03, ...).
    pub fn prefix(&self) -> &'static str {
        match self {
            Pillar::Reliability => "RE",
            Pillar::Security => "SE",
            Pillar::CostOptimization => "CO",
            Pillar::OperationalExcellence => "OE",
            Pillar::PerformanceEfficiency => "PE",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a string names no pillar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pillar: {0}")]
pub struct UnknownPillar(pub String);

impl FromStr for Pillar {
    type Err = UnknownPillar;

    /// Accepts codes, prefixes, snake_case names and display names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace([' ', '-'], "_");
        Pillar::ALL
            .into_iter()
            .find(|p| {
                needle == p.code()
                    || needle == p.prefix().to_lowercase()
                    || needle == p.display_name().to_lowercase().replace(' ', "_")
            })
            .ok_or_else(|| UnknownPillar(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pillars_have_distinct_codes() {
        let codes: std::collections::HashSet<_> = Pillar::ALL.iter().map(|p| p.code()).collect();
        assert_eq!(codes.len(), 5);
    }

    #[test]
    fn parse_accepts_several_spellings() {
        assert_eq!("cost".parse::<Pillar>().unwrap(), Pillar::CostOptimization);
        assert_eq!("CO".parse::<Pillar>().unwrap(), Pillar::CostOptimization);
        assert_eq!(
            "Operational Excellence".parse::<Pillar>().unwrap(),
            Pillar::OperationalExcellence
        );
        assert_eq!(
            "performance-efficiency".parse::<Pillar>().unwrap(),
            Pillar::PerformanceEfficiency
        );
        assert!("availability".parse::<Pillar>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Pillar::OperationalExcellence).unwrap();
        assert_eq!(json, "\"operational_excellence\"");
    }
}
