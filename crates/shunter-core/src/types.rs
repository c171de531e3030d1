//! Shared types for release coordination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InputError, VersionError};

/// A repository coordinate in `owner/name` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoordinate {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoCoordinate {
    /// Parse an `owner/name` coordinate
    pub fn parse(s: &str) -> Result<Self, InputError> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(InputError::InvalidRepository(s.to_string())),
        }
    }
}

impl std::fmt::Display for RepoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A tag-shaped release ref (`v<version>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    tag: String,
}

impl ReleaseRef {
    /// Parse a release ref, requiring the leading `v` tag marker
    pub fn parse(s: &str) -> Result<Self, InputError> {
        match s.strip_prefix('v') {
            Some(version) if !version.is_empty() => Ok(Self { tag: s.to_string() }),
            _ => Err(InputError::NotATag(s.to_string())),
        }
    }

    /// Build a release ref from a bare version
    pub fn from_version(version: &str) -> Self {
        Self {
            tag: format!("v{version}"),
        }
    }

    /// The full tag, including the `v` marker
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The version with the tag marker stripped
    pub fn version(&self) -> &str {
        &self.tag[1..]
    }

    /// The concrete milestone title for this release
    ///
    /// Milestones are titled by bare version, without the tag marker.
    pub fn milestone_title(&self) -> &str {
        self.version()
    }
}

impl std::fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag)
    }
}

/// An issue-tracking milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone id
    pub number: u64,
    /// Milestone title
    pub title: String,
}

/// Issue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Issue is open
    Open,
    /// Issue is closed
    Closed,
}

/// An issue owned by a milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: u64,
    /// Issue state
    pub state: IssueState,
}

/// The milestone created for the next version, with its computed deadline
///
/// An absent deadline is valid and suppresses the deadline line in
/// notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneWithDeadline {
    /// Milestone id
    pub id: u64,
    /// Milestone title
    pub title: String,
    /// Due date, if one was set
    pub deadline: Option<DateTime<Utc>>,
}

/// A resolved dependency coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Group id
    pub group: String,
    /// Artifact id
    pub artifact: String,
    /// Resolved version
    pub version: String,
    /// Whether this dependency is test/optional/build-tooling scoped and
    /// must be excluded from changelog dependency-upgrade reporting
    pub to_ignore: bool,
}

impl Dependency {
    /// The `group:artifact` coordinate
    pub fn coordinate(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

/// A release line (`major.minor`), the unit the generic milestone spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseLine {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
}

impl ReleaseLine {
    /// Derive the release line from a concrete version string
    pub fn from_version(version: &str) -> Result<Self, VersionError> {
        let parsed = semver::Version::parse(version)
            .map_err(|_| VersionError::InvalidFormat(version.to_string()))?;
        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
        })
    }

    /// The generic milestone title for this line (`major.minor.x`)
    pub fn generic_title(&self) -> String {
        format!("{}.{}.x", self.major, self.minor)
    }

    /// The maintenance branch name for this line
    ///
    /// Same shape as the generic milestone title.
    pub fn branch_name(&self) -> String {
        self.generic_title()
    }
}

impl std::fmt::Display for ReleaseLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
