//! Changelog merging
//!
//! Used when combining a freshly generated changelog against the previously
//! published notes for the same release line. Ordinary sections merge by set
//! union; Contributors collapses both sides into one synthesized credit
//! entry.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::warn;

use crate::types::{Changelog, ChangelogSection, Section};

/// The fixed first line of the Contributors section
pub const CONTRIBUTORS_BOILERPLATE: &str =
    "We'd like to thank all the contributors who worked on this release!";

impl ChangelogSection {
    /// Merge another section's entries into this one
    ///
    /// Sections of different kinds do not merge; that is a warned no-op.
    pub fn merge(&mut self, other: &ChangelogSection) {
        if self.section != other.section {
            warn!(
                ours = %self.section,
                theirs = %other.section,
                "refusing to merge sections of different kinds"
            );
            return;
        }
        match self.section {
            Section::Contributors => {
                let handles = extract_handles(self.entries.iter().chain(other.entries.iter()));
                self.entries = synthesize_contributors(&handles);
            }
            _ => {
                self.entries.extend(other.entries.iter().cloned());
            }
        }
    }
}

impl Changelog {
    /// Merge another changelog into this one, section by section
    ///
    /// The header of `incoming` is discarded; this changelog's header wins.
    pub fn merge(&mut self, incoming: &Changelog) {
        for section in incoming.sections() {
            self.section_mut(section.section).merge(section);
        }
    }
}

/// Extract every `@handle` token from the given entries
///
/// A handle is a leading `@` followed by alphanumerics with internal single
/// hyphens. The fixed boilerplate line is skipped.
fn extract_handles<'a>(entries: impl Iterator<Item = &'a String>) -> BTreeSet<String> {
    let pattern = Regex::new(r"@[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*").expect("handle pattern is valid");
    let mut handles = BTreeSet::new();
    for entry in entries {
        for line in entry.lines() {
            if line.trim() == CONTRIBUTORS_BOILERPLATE {
                continue;
            }
            for found in pattern.find_iter(line) {
                handles.insert(found.as_str().to_string());
            }
        }
    }
    handles
}

/// Build the single synthesized Contributors entry
fn synthesize_contributors(handles: &BTreeSet<String>) -> BTreeSet<String> {
    let joined = join_handles(handles);
    let entry = if joined.is_empty() {
        CONTRIBUTORS_BOILERPLATE.to_string()
    } else {
        format!("{CONTRIBUTORS_BOILERPLATE}\n\n{joined}")
    };
    BTreeSet::from([entry])
}

/// Join handles with "a, b, and c" grammar
fn join_handles(handles: &BTreeSet<String>) -> String {
    let handles: Vec<&str> = handles.iter().map(String::as_str).collect();
    match handles.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
