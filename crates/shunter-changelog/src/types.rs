//! Changelog model
//!
//! A changelog is an ordered map from [`Section`] to [`ChangelogSection`],
//! plus an opaque header of everything preceding the first recognized
//! section marker. Section order in output always follows the enumeration,
//! not encounter order.

use std::collections::{BTreeMap, BTreeSet};

/// The fixed set of changelog sections, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// New features
    Features,
    /// Bug fixes
    Bugs,
    /// Documentation changes
    Documentation,
    /// Automated dependency bumps
    DependencyUpgrades,
    /// Contributor credits
    Contributors,
}

impl Section {
    /// All sections in output order
    pub const ALL: [Section; 5] = [
        Section::Features,
        Section::Bugs,
        Section::Documentation,
        Section::DependencyUpgrades,
        Section::Contributors,
    ];

    /// The fixed textual title of this section
    pub fn title(&self) -> &'static str {
        match self {
            Self::Features => "Features",
            Self::Bugs => "Bugs",
            Self::Documentation => "Documentation",
            Self::DependencyUpgrades => "Dependency Upgrades",
            Self::Contributors => "Contributors",
        }
    }

    /// Match a title case-insensitively against the fixed set
    pub fn from_title(title: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.title().eq_ignore_ascii_case(title.trim()))
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// One changelog section: a deduplicated set of entries
///
/// Insertion order is irrelevant; entries serialize in lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSection {
    /// Which section this is
    pub section: Section,
    /// Unique entries
    pub entries: BTreeSet<String>,
}

impl ChangelogSection {
    /// Create an empty section
    pub fn new(section: Section) -> Self {
        Self {
            section,
            entries: BTreeSet::new(),
        }
    }

    /// Add an entry; duplicates are dropped structurally
    pub fn add_entry(&mut self, entry: impl Into<String>) {
        self.entries.insert(entry.into());
    }

    /// Check if the section has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed changelog document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    /// Lines preceding the first recognized section marker, preserved
    /// verbatim and not otherwise interpreted
    pub header: Vec<String>,
    sections: BTreeMap<Section, ChangelogSection>,
}

impl Changelog {
    /// Create an empty changelog
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a section
    pub fn section(&self, section: Section) -> Option<&ChangelogSection> {
        self.sections.get(&section)
    }

    /// Get or create a section
    pub fn section_mut(&mut self, section: Section) -> &mut ChangelogSection {
        self.sections
            .entry(section)
            .or_insert_with(|| ChangelogSection::new(section))
    }

    /// Iterate non-empty sections in enumeration order
    pub fn sections(&self) -> impl Iterator<Item = &ChangelogSection> {
        self.sections.values().filter(|s| !s.is_empty())
    }

    /// Replace the entries of a section wholesale
    pub fn replace_entries(&mut self, section: Section, entries: BTreeSet<String>) {
        self.section_mut(section).entries = entries;
    }

    /// Serialize: header, blank line, then each non-empty section as a
    /// `##` heading, blank line, sorted entries, trailing blank line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        if !self.header.is_empty() {
            out.push('\n');
        }
        for section in self.sections() {
            out.push_str(&format!("## {}\n\n", section.section.title()));
            for entry in &section.entries {
                out.push_str(entry);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for Changelog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_titles_round_trip() {
        for section in Section::ALL {
            assert_eq!(Section::from_title(section.title()), Some(section));
        }
    }

    #[test]
    fn test_from_title_is_case_insensitive() {
        assert_eq!(Section::from_title("features"), Some(Section::Features));
        assert_eq!(
            Section::from_title("DEPENDENCY UPGRADES"),
            Some(Section::DependencyUpgrades)
        );
        assert_eq!(Section::from_title("Unknown"), None);
    }

    #[test]
    fn test_entries_deduplicate() {
        let mut section = ChangelogSection::new(Section::Bugs);
        section.add_entry("- Fix the thing");
        section.add_entry("- Fix the thing");
        assert_eq!(section.entries.len(), 1);
    }

    #[test]
    fn test_render_orders_sections_by_enumeration() {
        let mut changelog = Changelog::new();
        changelog.header.push("# 1.0.1".to_string());
        changelog
            .section_mut(Section::Contributors)
            .add_entry("@someone");
        changelog
            .section_mut(Section::Features)
            .add_entry("- Add widgets");

        let rendered = changelog.render();
        let features = rendered.find("## Features").unwrap();
        let contributors = rendered.find("## Contributors").unwrap();
        assert!(features < contributors);
        assert!(rendered.starts_with("# 1.0.1\n\n"));
    }

    #[test]
    fn test_render_sorts_entries_and_omits_empty_sections() {
        let mut changelog = Changelog::new();
        changelog.section_mut(Section::Bugs).add_entry("- b fix");
        changelog.section_mut(Section::Bugs).add_entry("- a fix");
        changelog.section_mut(Section::Features);

        let rendered = changelog.render();
        assert_eq!(rendered, "## Bugs\n\n- a fix\n- b fix\n\n");
    }
}
