//! GitHub API surface
//!
//! Everything the coordinator needs from the code host, expressed as a
//! trait so the state machines can be exercised against an in-memory
//! implementation. The production implementation shells out to the `gh`
//! CLI through the command runner; wire formats are `gh`'s concern.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shunter_core::command::CommandRunner;
use shunter_core::error::{CommandError, Result, ShunterError};
use shunter_core::types::{Issue, Milestone, RepoCoordinate};
use tracing::debug;

/// Milestone state filter for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneState {
    /// Only open milestones
    Open,
    /// Open and closed milestones
    All,
}

impl MilestoneState {
    fn query_value(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::All => "all",
        }
    }
}

/// A pull request as returned by listings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestSummary {
    /// Pull request number
    pub number: u64,
    /// Pull request title
    pub title: String,
}

/// Merge/close state of a single pull request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestStatus {
    /// Lifecycle state (`OPEN`, `CLOSED`, `MERGED`)
    pub state: String,
    /// Mergeability (`CLEAN`, `DIRTY`, `BLOCKED`, ...)
    #[serde(rename = "mergeStateStatus")]
    pub merge_state: String,
}

impl PullRequestStatus {
    /// Whether the pull request reports merge conflicts
    pub fn is_conflicting(&self) -> bool {
        self.merge_state.eq_ignore_ascii_case("DIRTY")
    }

    /// Whether the pull request has been closed or merged
    pub fn is_settled(&self) -> bool {
        self.state.eq_ignore_ascii_case("CLOSED") || self.state.eq_ignore_ascii_case("MERGED")
    }
}

/// Search parameters for dependency-update pull requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestQuery {
    /// Automation actor that opens update pull requests
    pub author: String,
    /// Only pull requests created at/after this instant
    pub created_after: DateTime<Utc>,
    /// Library namespace the updates must mention
    pub namespace: String,
}

/// The GitHub capabilities the release coordinator consumes
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// List milestones, optionally restricted to open ones
    async fn list_milestones(
        &self,
        repo: &RepoCoordinate,
        state: MilestoneState,
    ) -> Result<Vec<Milestone>>;

    /// Create a milestone with an optional due date
    async fn create_milestone(
        &self,
        repo: &RepoCoordinate,
        title: &str,
        due_on: Option<DateTime<Utc>>,
    ) -> Result<Milestone>;

    /// Transition a milestone to the closed state
    async fn close_milestone(&self, repo: &RepoCoordinate, number: u64) -> Result<()>;

    /// List all issues (any state) belonging to a milestone
    async fn list_issues(&self, repo: &RepoCoordinate, milestone: u64) -> Result<Vec<Issue>>;

    /// Move an issue onto another milestone
    ///
    /// This is a write to the issue's milestone field, not a copy.
    async fn set_issue_milestone(
        &self,
        repo: &RepoCoordinate,
        issue: u64,
        milestone: u64,
    ) -> Result<()>;

    /// Read the remote clock
    ///
    /// The remote's own time, not the caller's, to avoid clock skew against
    /// the remote's activity log.
    async fn server_time(&self) -> Result<DateTime<Utc>>;

    /// Trigger a repository dispatch event
    async fn dispatch_event(&self, repo: &RepoCoordinate, event_type: &str) -> Result<()>;

    /// List dependency-update pull requests matching a query
    async fn list_pull_requests(
        &self,
        repo: &RepoCoordinate,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestSummary>>;

    /// Inspect one pull request's merge/close state
    async fn pull_request_status(
        &self,
        repo: &RepoCoordinate,
        number: u64,
    ) -> Result<PullRequestStatus>;

    /// Probe whether a branch exists remotely
    async fn branch_exists(&self, repo: &RepoCoordinate, branch: &str) -> Result<bool>;

    /// Create a tagged release from a branch
    async fn create_release(&self, repo: &RepoCoordinate, tag: &str, branch: &str) -> Result<()>;

    /// Fetch the published notes of an existing release, if any
    async fn release_notes(&self, repo: &RepoCoordinate, tag: &str) -> Result<Option<String>>;

    /// Replace a release's notes with the contents of a file
    async fn publish_release_notes(
        &self,
        repo: &RepoCoordinate,
        tag: &str,
        notes_file: &Path,
    ) -> Result<()>;
}

/// [`GitHubApi`] backed by the `gh` CLI
pub struct GhCli<R> {
    runner: R,
}

impl<R: CommandRunner> GhCli<R> {
    /// Create a client over a command runner
    ///
    /// Authentication is `gh`'s own concern (`gh auth login` or
    /// `GH_TOKEN`).
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn run_json<T: serde::de::DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let lines = self.runner.run(args).await?;
        let body = lines.join("\n");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl<R: CommandRunner> GitHubApi for GhCli<R> {
    async fn list_milestones(
        &self,
        repo: &RepoCoordinate,
        state: MilestoneState,
    ) -> Result<Vec<Milestone>> {
        let path = format!(
            "repos/{repo}/milestones?state={}&per_page=100",
            state.query_value()
        );
        self.run_json(&["gh", "api", &path]).await
    }

    async fn create_milestone(
        &self,
        repo: &RepoCoordinate,
        title: &str,
        due_on: Option<DateTime<Utc>>,
    ) -> Result<Milestone> {
        let path = format!("repos/{repo}/milestones");
        let title_field = format!("title={title}");
        let due_field = due_on.map(|due| {
            format!(
                "due_on={}",
                due.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            )
        });
        let mut args = vec!["gh", "api", "-X", "POST", &path, "-f", &title_field];
        if let Some(due_field) = &due_field {
            args.push("-f");
            args.push(due_field);
        }
        self.run_json(&args).await
    }

    async fn close_milestone(&self, repo: &RepoCoordinate, number: u64) -> Result<()> {
        let path = format!("repos/{repo}/milestones/{number}");
        self.runner
            .run(&["gh", "api", "-X", "PATCH", &path, "-f", "state=closed"])
            .await?;
        Ok(())
    }

    async fn list_issues(&self, repo: &RepoCoordinate, milestone: u64) -> Result<Vec<Issue>> {
        let path = format!("repos/{repo}/issues?milestone={milestone}&state=all&per_page=100");
        self.run_json(&["gh", "api", &path]).await
    }

    async fn set_issue_milestone(
        &self,
        repo: &RepoCoordinate,
        issue: u64,
        milestone: u64,
    ) -> Result<()> {
        let path = format!("repos/{repo}/issues/{issue}");
        let field = format!("milestone={milestone}");
        self.runner
            .run(&["gh", "api", "-X", "PATCH", &path, "-F", &field])
            .await?;
        Ok(())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>> {
        // `-i` includes response headers; the Date header is the remote
        // clock.
        let lines = self.runner.run(&["gh", "api", "-i", "/"]).await?;
        for line in &lines {
            if let Some(value) = line
                .strip_prefix("Date:")
                .or_else(|| line.strip_prefix("date:"))
            {
                let parsed = DateTime::parse_from_rfc2822(value.trim()).map_err(|e| {
                    ShunterError::other(format!("unparseable Date header '{value}': {e}"))
                })?;
                return Ok(parsed.with_timezone(&Utc));
            }
        }
        Err(ShunterError::other(
            "remote clock unavailable: no Date header in response",
        ))
    }

    async fn dispatch_event(&self, repo: &RepoCoordinate, event_type: &str) -> Result<()> {
        let path = format!("repos/{repo}/dispatches");
        let field = format!("event_type={event_type}");
        self.runner
            .run(&["gh", "api", "-X", "POST", &path, "-f", &field])
            .await?;
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoCoordinate,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestSummary>> {
        let repo_arg = repo.to_string();
        let search = format!(
            "{} in:title created:>={}",
            query.namespace,
            query
                .created_after
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        );
        self.run_json(&[
            "gh",
            "pr",
            "list",
            "--repo",
            &repo_arg,
            "--state",
            "all",
            "--author",
            &query.author,
            "--search",
            &search,
            "--json",
            "number,title",
        ])
        .await
    }

    async fn pull_request_status(
        &self,
        repo: &RepoCoordinate,
        number: u64,
    ) -> Result<PullRequestStatus> {
        let repo_arg = repo.to_string();
        let number_arg = number.to_string();
        self.run_json(&[
            "gh",
            "pr",
            "view",
            &number_arg,
            "--repo",
            &repo_arg,
            "--json",
            "state,mergeStateStatus",
        ])
        .await
    }

    async fn branch_exists(&self, repo: &RepoCoordinate, branch: &str) -> Result<bool> {
        let path = format!("repos/{repo}/branches/{branch}");
        match self.runner.run(&["gh", "api", &path]).await {
            Ok(_) => Ok(true),
            Err(CommandError::NonZeroExit { stderr, .. }) if stderr.contains("404") => {
                debug!(branch, "branch does not exist remotely");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_release(&self, repo: &RepoCoordinate, tag: &str, branch: &str) -> Result<()> {
        let repo_arg = repo.to_string();
        self.runner
            .run(&[
                "gh", "release", "create", tag, "--repo", &repo_arg, "--target", branch,
                "--title", tag, "--notes", "",
            ])
            .await?;
        Ok(())
    }

    async fn release_notes(&self, repo: &RepoCoordinate, tag: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct Body {
            body: String,
        }

        let repo_arg = repo.to_string();
        let result = self
            .runner
            .run(&["gh", "release", "view", tag, "--repo", &repo_arg, "--json", "body"])
            .await;
        match result {
            Ok(lines) => {
                let parsed: Body = serde_json::from_str(&lines.join("\n"))?;
                Ok(Some(parsed.body))
            }
            Err(CommandError::NonZeroExit { stderr, .. }) if stderr.contains("not found") => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish_release_notes(
        &self,
        repo: &RepoCoordinate,
        tag: &str,
        notes_file: &Path,
    ) -> Result<()> {
        let repo_arg = repo.to_string();
        let notes_arg = notes_file.display().to_string();
        self.runner
            .run(&[
                "gh", "release", "edit", tag, "--repo", &repo_arg, "--notes-file", &notes_arg,
            ])
            .await?;
        Ok(())
    }
}
