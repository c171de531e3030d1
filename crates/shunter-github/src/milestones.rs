//! Milestone migration and closing
//!
//! Two milestone roles exist for one release line: the *concrete* milestone
//! (`1.2.3`, `1.2.3-M1`) created per version, and the long-lived *generic*
//! milestone (`1.2.x`) that accumulates issues filed against the line
//! before a concrete version is cut. After a release ships, closed issues
//! move retroactively onto the version that shipped them and unfinished
//! work rolls forward onto the next milestone.

use chrono::{NaiveDate, Utc};
use shunter_core::error::{MilestoneError, Result};
use shunter_core::types::{
    IssueState, Milestone, MilestoneWithDeadline, ReleaseLine, ReleaseRef, RepoCoordinate,
};
use shunter_core::{schedule, version};
use tracing::{info, warn};

use crate::api::{GitHubApi, MilestoneState};

/// Migrates issues between milestones around a release
pub struct MilestoneCoordinator<'a, G> {
    api: &'a G,
    repo: &'a RepoCoordinate,
    today: NaiveDate,
}

impl<'a, G: GitHubApi> MilestoneCoordinator<'a, G> {
    /// Create a coordinator for one repository
    pub fn new(api: &'a G, repo: &'a RepoCoordinate) -> Self {
        Self {
            api,
            repo,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin "today" for deadline computation
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run the migration for `release` and create the next milestone
    ///
    /// Both the concrete and the generic milestone must exist before any
    /// issue is reassigned; a missing counterpart fails the whole migration
    /// with no partial writes.
    pub async fn migrate(&self, release: &ReleaseRef) -> Result<MilestoneWithDeadline> {
        let concrete_title = release.milestone_title();
        let line = ReleaseLine::from_version(concrete_title)?;
        let generic_title = line.generic_title();

        let concrete = self.find_open_milestone(concrete_title).await?;
        let generic = self.find_open_milestone(&generic_title).await?;

        let closed_in_generic: Vec<u64> = self
            .api
            .list_issues(self.repo, generic.number)
            .await?
            .into_iter()
            .filter(|issue| issue.state == IssueState::Closed)
            .map(|issue| issue.number)
            .collect();
        let open_in_concrete: Vec<u64> = self
            .api
            .list_issues(self.repo, concrete.number)
            .await?
            .into_iter()
            .filter(|issue| issue.state == IssueState::Open)
            .map(|issue| issue.number)
            .collect();

        // Closed issues belong retroactively to the version that shipped
        // them.
        for issue in &closed_in_generic {
            self.api
                .set_issue_milestone(self.repo, *issue, concrete.number)
                .await?;
        }
        info!(
            milestone = concrete_title,
            count = closed_in_generic.len(),
            "reassigned closed issues from the generic milestone"
        );

        let next_title = version::next_version(concrete_title)?;
        let due_on = schedule::milestone_due_on(self.today);
        let next = self
            .api
            .create_milestone(self.repo, &next_title, Some(due_on))
            .await?;
        info!(milestone = %next.title, due_on = %due_on, "created next milestone");

        // Unfinished work rolls forward.
        for issue in &open_in_concrete {
            self.api
                .set_issue_milestone(self.repo, *issue, next.number)
                .await?;
        }
        info!(
            milestone = %next.title,
            count = open_in_concrete.len(),
            "rolled open issues forward"
        );

        Ok(MilestoneWithDeadline {
            id: next.number,
            title: next.title,
            deadline: Some(due_on),
        })
    }

    /// Close the concrete milestone for `release`
    ///
    /// Runs after the migration; a milestone that is already gone is a
    /// warning, not a failure.
    pub async fn close(&self, release: &ReleaseRef) -> Result<()> {
        let title = release.milestone_title();
        let milestones = self.api.list_milestones(self.repo, MilestoneState::All).await?;
        match milestones.into_iter().find(|m| m.title == title) {
            Some(milestone) => {
                self.api.close_milestone(self.repo, milestone.number).await?;
                info!(milestone = title, "closed milestone");
                Ok(())
            }
            None => {
                warn!(milestone = title, repo = %self.repo, "milestone absent at close time");
                Ok(())
            }
        }
    }

    async fn find_open_milestone(&self, title: &str) -> Result<Milestone> {
        self.api
            .list_milestones(self.repo, MilestoneState::Open)
            .await?
            .into_iter()
            .find(|m| m.title == title)
            .ok_or_else(|| {
                MilestoneError::NotFound {
                    repo: self.repo.to_string(),
                    title: title.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use shunter_core::types::Issue;

    use super::*;
    use crate::testing::InMemoryGitHub;

    fn repo() -> RepoCoordinate {
        RepoCoordinate::parse("acme/widgets").unwrap()
    }

    fn issue(number: u64, state: IssueState) -> Issue {
        Issue { number, state }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_migrate_moves_issues_and_creates_next_milestone() {
        let github = InMemoryGitHub::new();
        github.add_milestone(1, "1.0.0", vec![issue(10, IssueState::Open)]);
        github.add_milestone(2, "1.0.x", vec![issue(11, IssueState::Closed)]);

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo).with_today(today());
        let release = ReleaseRef::parse("v1.0.0").unwrap();
        let next = coordinator.migrate(&release).await.unwrap();

        assert_eq!(next.title, "1.0.1");
        assert_eq!(
            next.deadline.unwrap().to_rfc3339(),
            "2025-02-10T17:00:00+00:00"
        );

        let state = github.state.lock().unwrap();
        // Closed issue #11 retroactively onto 1.0.0, open issue #10 forward
        // onto the new milestone.
        assert_eq!(state.issue_moves, vec![(11, 1), (10, next.id)]);
        assert_eq!(state.created_milestones.len(), 1);
        assert_eq!(state.created_milestones[0].title, "1.0.1");
    }

    #[tokio::test]
    async fn test_migrate_through_the_prerelease_sequence() {
        let github = InMemoryGitHub::new();
        github.add_milestone(1, "2.0.0-M3", vec![]);
        github.add_milestone(2, "2.0.x", vec![]);

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo).with_today(today());
        let release = ReleaseRef::parse("v2.0.0-M3").unwrap();
        let next = coordinator.migrate(&release).await.unwrap();

        assert_eq!(next.title, "2.0.0-RC1");
    }

    #[tokio::test]
    async fn test_missing_generic_milestone_fails_before_any_mutation() {
        let github = InMemoryGitHub::new();
        github.add_milestone(1, "1.0.0", vec![issue(10, IssueState::Open)]);

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo).with_today(today());
        let release = ReleaseRef::parse("v1.0.0").unwrap();
        let err = coordinator.migrate(&release).await.unwrap_err();

        assert!(err.to_string().contains("1.0.x"));
        let state = github.state.lock().unwrap();
        assert!(state.issue_moves.is_empty());
        assert!(state.created_milestones.is_empty());
    }

    #[tokio::test]
    async fn test_missing_concrete_milestone_fails() {
        let github = InMemoryGitHub::new();
        github.add_milestone(2, "1.0.x", vec![]);

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo).with_today(today());
        let release = ReleaseRef::parse("v1.0.0").unwrap();
        assert!(coordinator.migrate(&release).await.is_err());
    }

    #[tokio::test]
    async fn test_close_transitions_the_concrete_milestone() {
        let github = InMemoryGitHub::new();
        github.add_milestone(1, "1.0.0", vec![]);

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo);
        let release = ReleaseRef::parse("v1.0.0").unwrap();
        coordinator.close(&release).await.unwrap();

        assert_eq!(github.state.lock().unwrap().closed_milestones, vec![1]);
    }

    #[tokio::test]
    async fn test_close_tolerates_an_absent_milestone() {
        let github = InMemoryGitHub::new();

        let repo = repo();
        let coordinator = MilestoneCoordinator::new(&github, &repo);
        let release = ReleaseRef::parse("v9.9.9").unwrap();
        coordinator.close(&release).await.unwrap();

        assert!(github.state.lock().unwrap().closed_milestones.is_empty());
    }
}
