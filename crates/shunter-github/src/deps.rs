//! Dependency scope resolution
//!
//! Parses a dependency-tree-style text report to work out which coordinates
//! appear only in test/optional/build-tooling scopes. Those are excluded
//! from changelog dependency-upgrade reporting.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use regex::Regex;
use shunter_core::command::CommandRunner;
use shunter_core::error::Result;
use shunter_core::types::Dependency;
use tracing::debug;

/// A scope is excluded when its header line contains any of these
pub const EXCLUDED_SCOPE_KEYWORDS: [&str; 7] = [
    "test-compile",
    "test-implementation",
    "style-checking",
    "runtime-only",
    "doc-lint",
    "test-runtime",
    "optional",
];

/// Resolves dependency coordinates and their scopes from a report command
///
/// The listing is memoized within one orchestration run; callers that
/// mutate the project in between must [`DependencyResolver::invalidate`].
pub struct DependencyResolver<R> {
    runner: R,
    report_command: Vec<String>,
    cache: Mutex<Option<Vec<Dependency>>>,
}

impl<R: CommandRunner> DependencyResolver<R> {
    /// Create a resolver running `report_command` for the report
    pub fn new(runner: R, report_command: Vec<String>) -> Self {
        Self {
            runner,
            report_command,
            cache: Mutex::new(None),
        }
    }

    /// The full dependency listing, scope classification included
    pub async fn listing(&self) -> Result<Vec<Dependency>> {
        if let Some(cached) = self.cache.lock().unwrap().as_ref() {
            debug!("dependency listing served from cache");
            return Ok(cached.clone());
        }
        let args: Vec<&str> = self.report_command.iter().map(String::as_str).collect();
        let lines = self.runner.run(&args).await?;
        let listing = parse_report(&lines);
        debug!(count = listing.len(), "parsed dependency report");
        *self.cache.lock().unwrap() = Some(listing.clone());
        Ok(listing)
    }

    /// Drop the memoized listing
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// Coordinates that appear only in excluded scopes
    pub async fn excluded_coordinates(&self) -> Result<BTreeSet<String>> {
        let listing = self.listing().await?;
        let mut all_ignored: BTreeMap<String, bool> = BTreeMap::new();
        for dep in &listing {
            *all_ignored.entry(dep.coordinate()).or_insert(true) &= dep.to_ignore;
        }
        Ok(all_ignored
            .into_iter()
            .filter(|(_, ignored)| *ignored)
            .map(|(coordinate, _)| coordinate)
            .collect())
    }
}

/// Parse a dependency-tree report into classified coordinates
///
/// A line containing any excluded-scope keyword opens an excluded scope; a
/// blank line resets it. Dependency lines are `group:artifact:version`
/// under the usual tree markers, with `-> resolved` overriding the declared
/// version.
pub fn parse_report(lines: &[String]) -> Vec<Dependency> {
    let dependency = Regex::new(
        r"([A-Za-z0-9_.\-]+):([A-Za-z0-9_.\-]+):([A-Za-z0-9_.\-]+)(?:\s+->\s+([A-Za-z0-9_.\-]+))?",
    )
    .expect("dependency pattern is valid");

    let mut excluded_scope = false;
    let mut listing = Vec::new();

    for line in lines {
        if line.trim().is_empty() {
            excluded_scope = false;
            continue;
        }
        if EXCLUDED_SCOPE_KEYWORDS
            .iter()
            .any(|keyword| line.contains(keyword))
        {
            excluded_scope = true;
            continue;
        }
        if let Some(captures) = dependency.captures(line) {
            let version = captures
                .get(4)
                .or_else(|| captures.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            listing.push(Dependency {
                group: captures[1].to_string(),
                artifact: captures[2].to_string(),
                version,
                to_ignore: excluded_scope,
            });
        }
    }

    listing
}
