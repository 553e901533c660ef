//! Distribution area calculator
//!
//! Maps a free-text address onto the delivery/marketing zones used for
//! targeted mailings. Zones can overlap, so one address may land in several.

mod zones;

pub use zones::default_zone_rules;

use serde::{Deserialize, Serialize};

/// One row of the zone table: an address substring and the zone it implies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRule {
    pub pattern: String,
    pub label: String,
}

impl ZoneRule {
    pub fn new(pattern: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistributionAreaCalculator {
    rules: Vec<ZoneRule>,
}

impl DistributionAreaCalculator {
    /// Rules with an empty pattern would match every address and are dropped
    pub fn new(rules: Vec<ZoneRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| !rule.pattern.is_empty())
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[ZoneRule] {
        &self.rules
    }

    /// Every zone whose pattern occurs in `address`, in table order
    ///
    /// Matching is case-sensitive substring containment. A label shared by
    /// several matching patterns appears once, at its first match.
    pub fn calculate(&self, address: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for rule in &self.rules {
            if address.contains(rule.pattern.as_str()) && !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }
        labels
    }
}

impl Default for DistributionAreaCalculator {
    fn default() -> Self {
        Self::new(default_zone_rules())
    }
}
