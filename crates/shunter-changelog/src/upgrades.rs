//! Dependency-upgrade consolidation
//!
//! Automated dependency bumps arrive as one raw entry per pull request.
//! Multiple bumps of the same unit collapse into a single record spanning
//! the observed version range. The range endpoints are folded by *lexical*
//! string comparison, not semantic version order; this misbehaves on
//! multi-digit segments ("9" sorts above "10") and is a known limitation of
//! the observed format that is reproduced as-is.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::debug;

use crate::types::{Changelog, Section};

/// A consolidated dependency upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpgrade {
    /// Library coordinate being bumped
    pub unit: String,
    /// Lexically smallest "from" version seen
    pub lowest_version: String,
    /// Lexically largest "to" version seen
    pub highest_version: String,
    /// Pull request reference from the first occurrence
    pub pr_reference: String,
    /// Pull request URL from the first occurrence
    pub url: String,
}

impl DependencyUpgrade {
    /// Render the consolidated changelog entry
    pub fn to_entry(&self) -> String {
        format!(
            "- Bump {} from {} to {} [{}]({})",
            self.unit, self.lowest_version, self.highest_version, self.pr_reference, self.url
        )
    }
}

/// Folds raw bump entries into one record per unit
pub struct UpgradeConsolidator {
    pattern: Regex,
    excluded: BTreeSet<String>,
}

impl UpgradeConsolidator {
    /// Create a consolidator skipping the given excluded units
    ///
    /// The excluded set comes from the dependency resolver: coordinates that
    /// appear only in test/optional/build-tooling scopes.
    pub fn new(excluded: BTreeSet<String>) -> Self {
        let pattern = Regex::new(r"^- Bump (\S+) from (\S+) to (\S+) \[([^\]]+)\]\(([^)]+)\)$")
            .expect("bump pattern is valid");
        Self { pattern, excluded }
    }

    /// Consolidate raw entries, one record per unit, sorted by unit name
    pub fn consolidate<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a String>,
    ) -> Vec<DependencyUpgrade> {
        let mut by_unit: BTreeMap<String, DependencyUpgrade> = BTreeMap::new();

        for entry in entries {
            let Some(captures) = self.pattern.captures(entry) else {
                debug!(entry = %entry, "dropping entry that is not a dependency bump");
                continue;
            };
            let unit = &captures[1];
            if self.excluded.contains(unit) {
                debug!(unit, "skipping excluded-scope dependency");
                continue;
            }
            let from = captures[2].to_string();
            let to = captures[3].to_string();

            match by_unit.get_mut(unit) {
                Some(upgrade) => {
                    // Lexical, not semantic, comparison on both endpoints.
                    if from < upgrade.lowest_version {
                        upgrade.lowest_version = from;
                    }
                    if to > upgrade.highest_version {
                        upgrade.highest_version = to;
                    }
                }
                None => {
                    by_unit.insert(
                        unit.to_string(),
                        DependencyUpgrade {
                            unit: unit.to_string(),
                            lowest_version: from,
                            highest_version: to,
                            pr_reference: captures[4].to_string(),
                            url: captures[5].to_string(),
                        },
                    );
                }
            }
        }

        by_unit.into_values().collect()
    }
}

impl Changelog {
    /// Replace the Dependency Upgrades section with its consolidated form
    pub fn consolidate_dependency_upgrades(&mut self, excluded: &BTreeSet<String>) {
        let Some(section) = self.section(Section::DependencyUpgrades) else {
            return;
        };
        let consolidator = UpgradeConsolidator::new(excluded.clone());
        let consolidated: BTreeSet<String> = consolidator
            .consolidate(section.entries.iter())
            .iter()
            .map(DependencyUpgrade::to_entry)
            .collect();
        self.replace_entries(Section::DependencyUpgrades, consolidated);
    }
}
