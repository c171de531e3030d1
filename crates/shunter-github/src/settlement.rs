//! Dependency settlement verification
//!
//! Before release notes are consolidated, the automated dependency-update
//! pass must have finished: every update pull request it opened since the
//! trigger is merged or closed. The check is a blocking, bounded poll
//! against an eventually-consistent remote; a conflicting pull request is
//! a hard failure the moment it is seen.

use std::time::Duration;

use shunter_core::error::{Result, SettlementError};
use shunter_core::types::RepoCoordinate;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::api::{GitHubApi, PullRequestQuery};

/// Knobs for the settlement poll
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Automation actor that opens update pull requests
    pub automation_author: String,
    /// Library namespace the updates must mention
    pub namespace: String,
    /// Repository dispatch event type that triggers the update pass
    pub dispatch_event: String,
    /// Grace period before the first poll
    pub initial_wait: Duration,
    /// Interval between polls
    pub poll_interval: Duration,
    /// Overall bound on the wait, including the grace period
    pub max_wait: Duration,
}

impl SettlementConfig {
    /// Create a config for `namespace` with the default timing knobs
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            automation_author: "app/dependabot".to_string(),
            namespace: namespace.into(),
            dispatch_event: "check-dependencies".to_string(),
            initial_wait: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// Confirms the automated dependency-update pass has settled
pub struct DependencySettlementVerifier<'a, G> {
    api: &'a G,
    repo: &'a RepoCoordinate,
    config: SettlementConfig,
}

impl<'a, G: GitHubApi> DependencySettlementVerifier<'a, G> {
    /// Create a verifier for one repository
    pub fn new(api: &'a G, repo: &'a RepoCoordinate, config: SettlementConfig) -> Self {
        Self { api, repo, config }
    }

    /// Trigger the update pass and wait for it to settle
    ///
    /// Succeeds immediately if no update pull request appears after the
    /// trigger. Fails with [`SettlementError::Conflict`] the first time any
    /// pull request reports a conflicting merge state, and with
    /// [`SettlementError::Timeout`] once the overall bound is exhausted.
    pub async fn settle(&self) -> Result<()> {
        // The remote's clock, not ours: the created-at filter below compares
        // against the remote's activity log.
        let reference = self.api.server_time().await?;
        self.api
            .dispatch_event(self.repo, &self.config.dispatch_event)
            .await?;
        info!(
            repo = %self.repo,
            event = self.config.dispatch_event,
            since = %reference,
            "triggered dependency update pass"
        );

        let started = Instant::now();
        sleep(self.config.initial_wait).await;

        let query = PullRequestQuery {
            author: self.config.automation_author.clone(),
            created_after: reference,
            namespace: self.config.namespace.clone(),
        };

        loop {
            let pull_requests = self.api.list_pull_requests(self.repo, &query).await?;
            if pull_requests.is_empty() {
                info!(repo = %self.repo, "no update pull requests; settled");
                return Ok(());
            }

            let mut open = 0usize;
            for pr in &pull_requests {
                let status = self.api.pull_request_status(self.repo, pr.number).await?;
                if status.is_conflicting() {
                    return Err(SettlementError::Conflict {
                        number: pr.number,
                        title: pr.title.clone(),
                    }
                    .into());
                }
                if !status.is_settled() {
                    open += 1;
                }
            }
            if open == 0 {
                info!(
                    repo = %self.repo,
                    count = pull_requests.len(),
                    "all update pull requests settled"
                );
                return Ok(());
            }

            if started.elapsed() >= self.config.max_wait {
                return Err(SettlementError::Timeout {
                    repo: self.repo.to_string(),
                    waited_secs: self.config.max_wait.as_secs(),
                }
                .into());
            }
            debug!(open, "update pull requests still open; polling again");
            sleep(self.config.poll_interval).await;
        }
    }
}
