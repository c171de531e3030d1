//! Train error types

use shunter_core::error::ShunterError;
use thiserror::Error;

/// Train-related errors
#[derive(Debug, Error)]
pub enum TrainError {
    /// Error from a core component
    #[error(transparent)]
    Core(#[from] ShunterError),

    /// A CI workflow reported an explicit failure status
    ///
    /// Hard failure; never retried.
    #[error("build for {tag} failed: workflow '{workflow}' reported failure")]
    BuildFailed { tag: String, workflow: String },

    /// The build did not reach success within the bounded wait
    #[error("build for {tag} was not successful within {waited_secs}s")]
    CiTimeout { tag: String, waited_secs: u64 },

    /// The artifact did not appear in the package index in time
    #[error("artifact for {version} did not sync to the package index within {waited_secs}s")]
    SyncTimeout { version: String, waited_secs: u64 },

    /// The resolved dependencies contradict the train's project graph
    #[error("expected-dependency check failed: {0}")]
    DependencyMismatch(String),

    /// API error from the CI provider or package index
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for train operations
pub type Result<T> = std::result::Result<T, TrainError>;
