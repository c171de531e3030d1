//! Shunter Core - Core library for the release train coordinator
//!
//! This crate provides the foundational types, error handling, the version
//! lifecycle, release scheduling, and external-command plumbing shared by
//! the Shunter crates.

pub mod command;
pub mod error;
pub mod project;
pub mod schedule;
pub mod types;
pub mod version;

pub use command::{CommandRunner, ProcessRunner};
pub use error::{Result, ShunterError};
pub use types::{
    Dependency, Issue, IssueState, Milestone, MilestoneWithDeadline, ReleaseLine, ReleaseRef,
    RepoCoordinate,
};
