//! In-memory GitHub for tests
//!
//! Backs the [`GitHubApi`] trait with plain mutable state so the milestone,
//! settlement, and train state machines can be exercised without a network
//! or a `gh` binary. Shared across crates; not compiled out of non-test
//! builds because downstream crates use it from their own tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shunter_core::error::{Result, ShunterError};
use shunter_core::types::{Issue, Milestone, RepoCoordinate};

use crate::api::{
    GitHubApi, MilestoneState, PullRequestQuery, PullRequestStatus, PullRequestSummary,
};

/// Mutable world state behind [`InMemoryGitHub`]
#[derive(Debug, Default)]
pub struct GitHubState {
    /// Existing milestones
    pub milestones: Vec<Milestone>,
    /// Issues keyed by owning milestone number
    pub issues: BTreeMap<u64, Vec<Issue>>,
    /// Recorded `(issue, milestone)` reassignments, in order
    pub issue_moves: Vec<(u64, u64)>,
    /// Milestones created through the API
    pub created_milestones: Vec<Milestone>,
    /// Milestone numbers transitioned to closed
    pub closed_milestones: Vec<u64>,
    /// The remote clock
    pub now: Option<DateTime<Utc>>,
    /// Recorded dispatch event types
    pub dispatched_events: Vec<String>,
    /// Pull requests returned by listings
    pub update_prs: Vec<PullRequestSummary>,
    /// Status sequences per pull request; polls consume from the front and
    /// the last status repeats forever
    pub pr_statuses: BTreeMap<u64, VecDeque<PullRequestStatus>>,
    /// Recorded pull request queries
    pub pr_queries: Vec<PullRequestQuery>,
    /// Remote branches
    pub branches: BTreeSet<String>,
    /// Recorded `(tag, target branch)` release creations
    pub releases: Vec<(String, String)>,
    /// Published release notes keyed by tag
    pub release_notes: BTreeMap<String, String>,
    /// Tags whose published notes were fetched, in order
    pub notes_lookups: Vec<String>,
    /// Number handed to the next created milestone
    pub next_milestone_number: u64,
}

/// [`GitHubApi`] over in-memory state
#[derive(Debug, Default)]
pub struct InMemoryGitHub {
    /// World state; tests seed and inspect it directly
    pub state: Mutex<GitHubState>,
}

impl InMemoryGitHub {
    /// Create an empty instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a milestone with its issues
    pub fn add_milestone(&self, number: u64, title: &str, issues: Vec<Issue>) {
        let mut state = self.state.lock().unwrap();
        state.milestones.push(Milestone {
            number,
            title: title.to_string(),
        });
        state.issues.insert(number, issues);
    }
}

#[async_trait]
impl GitHubApi for InMemoryGitHub {
    async fn list_milestones(
        &self,
        _repo: &RepoCoordinate,
        state: MilestoneState,
    ) -> Result<Vec<Milestone>> {
        let world = self.state.lock().unwrap();
        let milestones = world
            .milestones
            .iter()
            .filter(|m| {
                state == MilestoneState::All || !world.closed_milestones.contains(&m.number)
            })
            .cloned()
            .collect();
        Ok(milestones)
    }

    async fn create_milestone(
        &self,
        _repo: &RepoCoordinate,
        title: &str,
        _due_on: Option<DateTime<Utc>>,
    ) -> Result<Milestone> {
        let mut world = self.state.lock().unwrap();
        if world.next_milestone_number == 0 {
            world.next_milestone_number = 100;
        }
        let milestone = Milestone {
            number: world.next_milestone_number,
            title: title.to_string(),
        };
        world.next_milestone_number += 1;
        world.milestones.push(milestone.clone());
        world.created_milestones.push(milestone.clone());
        Ok(milestone)
    }

    async fn close_milestone(&self, _repo: &RepoCoordinate, number: u64) -> Result<()> {
        self.state.lock().unwrap().closed_milestones.push(number);
        Ok(())
    }

    async fn list_issues(&self, _repo: &RepoCoordinate, milestone: u64) -> Result<Vec<Issue>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .issues
            .get(&milestone)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_issue_milestone(
        &self,
        _repo: &RepoCoordinate,
        issue: u64,
        milestone: u64,
    ) -> Result<()> {
        let mut world = self.state.lock().unwrap();
        let mut moved = None;
        for issues in world.issues.values_mut() {
            if let Some(position) = issues.iter().position(|i| i.number == issue) {
                moved = Some(issues.remove(position));
                break;
            }
        }
        if let Some(moved) = moved {
            world.issues.entry(milestone).or_default().push(moved);
        }
        world.issue_moves.push((issue, milestone));
        Ok(())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .now
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn dispatch_event(&self, _repo: &RepoCoordinate, event_type: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .dispatched_events
            .push(event_type.to_string());
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        _repo: &RepoCoordinate,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestSummary>> {
        let mut world = self.state.lock().unwrap();
        world.pr_queries.push(query.clone());
        Ok(world.update_prs.clone())
    }

    async fn pull_request_status(
        &self,
        _repo: &RepoCoordinate,
        number: u64,
    ) -> Result<PullRequestStatus> {
        let mut world = self.state.lock().unwrap();
        let statuses = world
            .pr_statuses
            .get_mut(&number)
            .ok_or_else(|| ShunterError::other(format!("no status seeded for PR #{number}")))?;
        if statuses.len() > 1 {
            Ok(statuses.pop_front().expect("len checked"))
        } else {
            statuses
                .front()
                .cloned()
                .ok_or_else(|| ShunterError::other(format!("no status seeded for PR #{number}")))
        }
    }

    async fn branch_exists(&self, _repo: &RepoCoordinate, branch: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().branches.contains(branch))
    }

    async fn create_release(
        &self,
        _repo: &RepoCoordinate,
        tag: &str,
        branch: &str,
    ) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .releases
            .push((tag.to_string(), branch.to_string()));
        Ok(())
    }

    async fn release_notes(&self, _repo: &RepoCoordinate, tag: &str) -> Result<Option<String>> {
        let mut world = self.state.lock().unwrap();
        world.notes_lookups.push(tag.to_string());
        Ok(world.release_notes.get(tag).cloned())
    }

    async fn publish_release_notes(
        &self,
        _repo: &RepoCoordinate,
        tag: &str,
        notes_file: &Path,
    ) -> Result<()> {
        let notes = tokio::fs::read_to_string(notes_file).await?;
        self.state
            .lock()
            .unwrap()
            .release_notes
            .insert(tag.to_string(), notes);
        Ok(())
    }
}
