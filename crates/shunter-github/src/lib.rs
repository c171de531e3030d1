//! Shunter GitHub - code-host collaborator surface
//!
//! The [`api::GitHubApi`] trait covers everything the release coordinator
//! needs from GitHub; the production implementation drives the `gh` CLI.
//! On top of it sit the milestone coordinator, the dependency-settlement
//! verifier, and the dependency-scope resolver.

pub mod api;
pub mod deps;
pub mod milestones;
pub mod settlement;
pub mod testing;

pub use api::{GhCli, GitHubApi, MilestoneState, PullRequestQuery, PullRequestStatus, PullRequestSummary};
pub use deps::{DependencyResolver, EXCLUDED_SCOPE_KEYWORDS};
pub use milestones::MilestoneCoordinator;
pub use settlement::{DependencySettlementVerifier, SettlementConfig};
