//! Shunter Changelog - release-notes consolidation
//!
//! This crate models the changelog documents the release train publishes:
//! parsing, merging against previously published notes, dependency-upgrade
//! consolidation, and serialization, plus the bridge to the external
//! generator tool.

pub mod generator;
pub mod merge;
pub mod parser;
pub mod types;
pub mod upgrades;

pub use generator::{ChangelogGenerator, GeneratorConfig, DEFAULT_GENERATOR_TOOL};
pub use merge::CONTRIBUTORS_BOILERPLATE;
pub use parser::parse;
pub use types::{Changelog, ChangelogSection, Section};
pub use upgrades::{DependencyUpgrade, UpgradeConsolidator};
