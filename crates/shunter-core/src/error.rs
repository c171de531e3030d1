//! Error types for Shunter

use thiserror::Error;

/// Result type alias using ShunterError
pub type Result<T> = std::result::Result<T, ShunterError>;

/// Main error type for Shunter operations
#[derive(Debug, Error)]
pub enum ShunterError {
    /// Input validation errors
    #[error(transparent)]
    Input(#[from] InputError),

    /// Version lifecycle errors
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Milestone errors
    #[error(transparent)]
    Milestone(#[from] MilestoneError),

    /// Changelog errors
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// Dependency settlement errors
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// External command errors
    #[error(transparent)]
    Command(#[from] CommandError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl ShunterError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

/// Input validation errors
///
/// These fail fast, before any side effect is attempted.
#[derive(Debug, Error)]
pub enum InputError {
    /// Repository coordinate is not `owner/name`
    #[error("invalid repository coordinate '{0}': expected owner/name")]
    InvalidRepository(String),

    /// Ref is not tag-shaped
    #[error("ref '{0}' is not a tag: expected a leading 'v' marker")]
    NotATag(String),

    /// Required input is missing or blank
    #[error("missing required input: {0}")]
    Missing(&'static str),
}

/// Version lifecycle errors
#[derive(Debug, Error)]
pub enum VersionError {
    /// Release title does not match the lifecycle grammar
    #[error(
        "release title '{0}' does not match the version lifecycle: \
         expected X.Y.Z or X.Y.Z-<suffix> with suffix in {{M1, M2, M3, RC1}}"
    )]
    InvalidFormat(String),
}

/// Milestone errors
#[derive(Debug, Error)]
pub enum MilestoneError {
    /// Expected milestone is absent
    #[error("milestone '{title}' not found in {repo}")]
    NotFound { repo: String, title: String },
}

/// Changelog errors
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// A section header names a title outside the known set
    #[error("unsupported changelog section: '{0}'")]
    UnsupportedSection(String),

    /// The external generator produced no usable output
    #[error("changelog generation failed: {0}")]
    GenerationFailed(String),
}

/// Dependency settlement errors
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A dependency update pull request reports merge conflicts
    ///
    /// Raised immediately, even mid-poll; never retried.
    #[error("dependency update PR #{number} '{title}' reports merge conflicts")]
    Conflict { number: u64, title: String },

    /// Dependency updates did not settle within the bounded wait
    #[error("dependency updates for {repo} did not settle within {waited_secs}s")]
    Timeout { repo: String, waited_secs: u64 },
}

/// External command errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command exited non-zero
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The command could not be spawned
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A required executable is not on the path
    #[error("required tool not found: {0}")]
    ToolNotFound(String),
}
