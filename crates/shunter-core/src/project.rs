//! Declarative graph of coupled release units
//!
//! A release family ships several units together (a core library, its
//! extension modules, a docs generator), each at an explicit version and
//! with dependency edges onto other units' versions. The graph is used to
//! compute expected-dependency assertions during train verification.

use crate::types::Dependency;

/// The kind of a release unit within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// The core library
    Core,
    /// Extension modules released with the core
    Extensions,
    /// The documentation generator released alongside
    Docs,
}

impl ProjectKind {
    /// The artifact name of this unit within `family`
    pub fn artifact(&self, family: &str) -> String {
        match self {
            Self::Core => family.to_string(),
            Self::Extensions => format!("{family}-extensions"),
            Self::Docs => format!("{family}-docs"),
        }
    }
}

/// A release unit at an explicit version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unit kind
    pub kind: ProjectKind,
    /// Version being released
    pub version: String,
}

impl Project {
    /// Create a project
    pub fn new(kind: ProjectKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            version: version.into(),
        }
    }
}

/// A release unit together with its dependency edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectWithDependencies {
    /// The unit itself
    pub project: Project,
    /// Other units (at their versions) this unit must depend on
    pub dependencies: Vec<Project>,
}

/// An expected dependency assertion derived from the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDependency {
    /// Artifact name
    pub artifact: String,
    /// Expected version
    pub version: String,
}

/// A violated expected-dependency assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMismatch {
    /// Artifact name
    pub artifact: String,
    /// Version the graph expects
    pub expected: String,
    /// Version actually resolved
    pub actual: String,
}

impl std::fmt::Display for DependencyMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} resolves to {} but the train expects {}",
            self.artifact, self.actual, self.expected
        )
    }
}

/// The declarative graph for one release family
#[derive(Debug, Clone)]
pub struct ProjectSetup {
    family: String,
    projects: Vec<ProjectWithDependencies>,
}

impl ProjectSetup {
    /// Create an empty setup for `family`
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            projects: Vec::new(),
        }
    }

    /// Add a unit with no dependency edges
    pub fn with_project(self, project: Project) -> Self {
        self.with_dependent(project, Vec::new())
    }

    /// Add a unit with dependency edges onto other units' versions
    pub fn with_dependent(mut self, project: Project, dependencies: Vec<Project>) -> Self {
        self.projects.push(ProjectWithDependencies {
            project,
            dependencies,
        });
        self
    }

    /// The family name
    pub fn family(&self) -> &str {
        &self.family
    }

    /// All declared units
    pub fn projects(&self) -> &[ProjectWithDependencies] {
        &self.projects
    }

    /// Expected-dependency assertions for the unit of kind `kind`
    pub fn expected_dependencies(&self, kind: ProjectKind) -> Vec<ExpectedDependency> {
        self.projects
            .iter()
            .filter(|p| p.project.kind == kind)
            .flat_map(|p| p.dependencies.iter())
            .map(|dep| ExpectedDependency {
                artifact: dep.kind.artifact(&self.family),
                version: dep.version.clone(),
            })
            .collect()
    }

    /// Check a resolved dependency listing against the assertions for `kind`
    ///
    /// An artifact absent from the listing is not a mismatch (not every
    /// module declares every edge); a present artifact at the wrong version
    /// is.
    pub fn verify(&self, kind: ProjectKind, listing: &[Dependency]) -> Vec<DependencyMismatch> {
        let mut mismatches = Vec::new();
        for expected in self.expected_dependencies(kind) {
            for dep in listing.iter().filter(|d| d.artifact == expected.artifact) {
                if dep.version != expected.version {
                    mismatches.push(DependencyMismatch {
                        artifact: expected.artifact.clone(),
                        expected: expected.version.clone(),
                        actual: dep.version.clone(),
                    });
                }
            }
        }
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(&str, &str)]) -> Vec<Dependency> {
        entries
            .iter()
            .map(|(artifact, version)| Dependency {
                group: "io.acme".to_string(),
                artifact: artifact.to_string(),
                version: version.to_string(),
                to_ignore: false,
            })
            .collect()
    }

    fn setup() -> ProjectSetup {
        ProjectSetup::new("gauge")
            .with_project(Project::new(ProjectKind::Core, "1.2.0"))
            .with_dependent(
                Project::new(ProjectKind::Extensions, "2.0.0"),
                vec![Project::new(ProjectKind::Core, "1.2.0")],
            )
    }

    #[test]
    fn test_artifact_names_follow_family() {
        assert_eq!(ProjectKind::Core.artifact("gauge"), "gauge");
        assert_eq!(ProjectKind::Extensions.artifact("gauge"), "gauge-extensions");
        assert_eq!(ProjectKind::Docs.artifact("gauge"), "gauge-docs");
    }

    #[test]
    fn test_expected_dependencies_follow_edges() {
        let expected = setup().expected_dependencies(ProjectKind::Extensions);
        assert_eq!(
            expected,
            vec![ExpectedDependency {
                artifact: "gauge".to_string(),
                version: "1.2.0".to_string(),
            }]
        );
        assert!(setup().expected_dependencies(ProjectKind::Core).is_empty());
    }

    #[test]
    fn test_verify_flags_wrong_version() {
        let mismatches = setup().verify(
            ProjectKind::Extensions,
            &listing(&[("gauge", "1.1.9"), ("unrelated", "3.0.0")]),
        );
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].artifact, "gauge");
        assert_eq!(mismatches[0].expected, "1.2.0");
        assert_eq!(mismatches[0].actual, "1.1.9");
    }

    #[test]
    fn test_verify_accepts_matching_or_absent() {
        assert!(setup()
            .verify(ProjectKind::Extensions, &listing(&[("gauge", "1.2.0")]))
            .is_empty());
        assert!(setup()
            .verify(ProjectKind::Extensions, &listing(&[("unrelated", "3.0.0")]))
            .is_empty());
    }
}
