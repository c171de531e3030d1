//! Changelog document parsing
//!
//! The document is line-oriented: a `##` heading matching one of the five
//! known titles opens a section, subsequent non-blank lines are appended
//! verbatim as entries, and everything before the first recognized heading
//! is the opaque header.

use shunter_core::error::ChangelogError;
use tracing::debug;

use crate::types::{Changelog, Section};

/// The marker that opens a section heading
const SECTION_MARKER: &str = "## ";

/// Parse a changelog document
///
/// Fails with [`ChangelogError::UnsupportedSection`] when a heading names a
/// title outside the known set.
pub fn parse(document: &str) -> Result<Changelog, ChangelogError> {
    let mut changelog = Changelog::new();
    let mut current: Option<Section> = None;

    for line in document.lines() {
        if let Some(title) = line.strip_prefix(SECTION_MARKER) {
            let section = Section::from_title(title)
                .ok_or_else(|| ChangelogError::UnsupportedSection(title.trim().to_string()))?;
            changelog.section_mut(section);
            current = Some(section);
            continue;
        }

        match current {
            Some(section) => {
                if !line.trim().is_empty() {
                    changelog.section_mut(section).add_entry(line);
                }
            }
            None => changelog.header.push(line.to_string()),
        }
    }

    debug!(
        sections = changelog.sections().count(),
        header_lines = changelog.header.len(),
        "parsed changelog"
    );
    Ok(changelog)
}
