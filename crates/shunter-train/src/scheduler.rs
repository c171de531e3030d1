//! Release train scheduling
//!
//! A train releases several versions of one repository family in order:
//! branches are resolved per version, releases and their CI builds run
//! concurrently, dependency settlement is confirmed, the per-version
//! post-release workflow runs sequentially in ascending release-line
//! order, and finally every artifact's propagation to the package index is
//! awaited.

use std::sync::Arc;
use std::time::Duration;

use shunter_changelog::generator::ChangelogGenerator;
use shunter_core::command::CommandRunner;
use shunter_core::error::{InputError, ShunterError};
use shunter_core::project::ProjectSetup;
use shunter_core::types::{ReleaseLine, ReleaseRef, RepoCoordinate};
use shunter_github::api::GitHubApi;
use shunter_github::deps::DependencyResolver;
use shunter_github::settlement::{DependencySettlementVerifier, SettlementConfig};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::artifacts::{self, PackageIndex, SyncConfig};
use crate::ci::{self, CiApi, CiPollConfig};
use crate::error::{Result, TrainError};
use crate::notify::Notifier;
use crate::workflow::ReleaseWorkflow;

/// Knobs for a train run
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Branch released from when no maintenance branch exists
    pub trunk_branch: String,
    /// Bound on each concurrent release+CI task
    pub task_timeout: Duration,
    /// CI polling knobs
    pub ci: CiPollConfig,
    /// Artifact-sync polling knobs
    pub sync: SyncConfig,
    /// Dependency settlement knobs
    pub settlement: SettlementConfig,
    /// Artifact whose package-index propagation is verified; skipped when
    /// absent
    pub artifact: Option<String>,
    /// Project graph for expected-dependency assertions; skipped when
    /// absent
    pub project_setup: Option<ProjectSetup>,
}

impl TrainConfig {
    /// Create a config with default timing knobs
    pub fn new(settlement: SettlementConfig) -> Self {
        Self {
            trunk_branch: "main".to_string(),
            task_timeout: Duration::from_secs(3600),
            ci: CiPollConfig::default(),
            sync: SyncConfig::default(),
            settlement,
            artifact: None,
            project_setup: None,
        }
    }
}

/// Parse a comma-separated version list into ordered train targets
///
/// Versions are bare (no tag marker); blanks between commas are skipped;
/// an effectively empty list is an input error.
pub fn parse_versions(input: &str) -> std::result::Result<Vec<(ReleaseRef, ReleaseLine)>, ShunterError> {
    let mut targets = Vec::new();
    for raw in input.split(',') {
        let version = raw.trim();
        if version.is_empty() {
            continue;
        }
        let line = ReleaseLine::from_version(version)?;
        targets.push((ReleaseRef::from_version(version), line));
    }
    if targets.is_empty() {
        return Err(InputError::Missing("train versions").into());
    }
    targets.sort_by_key(|(_, line)| *line);
    Ok(targets)
}

/// Drives a whole release train
pub struct TrainScheduler<G, C, P, R1, R2> {
    github: Arc<G>,
    ci: Arc<C>,
    index: Arc<P>,
    generator: Arc<ChangelogGenerator<R1>>,
    resolver: Arc<DependencyResolver<R2>>,
    notifiers: Vec<Box<dyn Notifier>>,
    repo: RepoCoordinate,
    config: TrainConfig,
}

impl<G, C, P, R1, R2> TrainScheduler<G, C, P, R1, R2>
where
    G: GitHubApi + 'static,
    C: CiApi + 'static,
    P: PackageIndex + 'static,
    R1: CommandRunner,
    R2: CommandRunner,
{
    /// Assemble a scheduler from its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        github: Arc<G>,
        ci: Arc<C>,
        index: Arc<P>,
        generator: Arc<ChangelogGenerator<R1>>,
        resolver: Arc<DependencyResolver<R2>>,
        notifiers: Vec<Box<dyn Notifier>>,
        repo: RepoCoordinate,
        config: TrainConfig,
    ) -> Self {
        Self {
            github,
            ci,
            index,
            generator,
            resolver,
            notifiers,
            repo,
            config,
        }
    }

    /// Run the train for a comma-separated version list
    ///
    /// `previous` seeds the "previous release" input of the first version's
    /// post-release workflow; each later version gets its immediate
    /// predecessor in release-line order.
    pub async fn run(&self, versions: &str, previous: Option<&ReleaseRef>) -> Result<()> {
        let targets = parse_versions(versions)?;
        info!(
            repo = %self.repo,
            count = targets.len(),
            "starting release train"
        );

        let branch_targets = self.resolve_branches(&targets).await?;
        self.release_and_verify(&branch_targets).await?;
        self.confirm_settlement().await?;
        self.post_release(&targets, previous).await?;
        self.await_artifacts(&targets).await?;

        info!(repo = %self.repo, "release train complete");
        Ok(())
    }

    /// Phase 1: pick the branch each version releases from
    ///
    /// The maintenance branch of the version's release line when it exists
    /// remotely, the trunk branch otherwise.
    async fn resolve_branches(
        &self,
        targets: &[(ReleaseRef, ReleaseLine)],
    ) -> Result<Vec<(ReleaseRef, String)>> {
        let mut resolved = Vec::with_capacity(targets.len());
        for (release, line) in targets {
            let branch = line.branch_name();
            let target = if self.github.branch_exists(&self.repo, &branch).await? {
                branch
            } else {
                self.config.trunk_branch.clone()
            };
            debug!(release = %release, branch = target, "resolved release branch");
            resolved.push((release.clone(), target));
        }
        Ok(resolved)
    }

    /// Phase 2: create releases and verify their builds, concurrently
    ///
    /// One task's failure does not cancel its siblings; failures are
    /// aggregated at the join and the first (by tag) fails the phase.
    async fn release_and_verify(&self, targets: &[(ReleaseRef, String)]) -> Result<()> {
        let mut tasks: JoinSet<(String, Result<()>)> = JoinSet::new();
        for (release, branch) in targets {
            let github = Arc::clone(&self.github);
            let ci = Arc::clone(&self.ci);
            let repo = self.repo.clone();
            let tag = release.tag().to_string();
            let branch = branch.clone();
            let ci_config = self.config.ci.clone();
            let task_timeout = self.config.task_timeout;

            tasks.spawn(async move {
                let bounded = timeout(task_timeout, async {
                    github.create_release(&repo, &tag, &branch).await?;
                    info!(tag, branch, "release created; verifying build");
                    ci::wait_for_build(ci.as_ref(), &tag, &ci_config).await
                })
                .await;

                let outcome = match bounded {
                    Ok(Ok(true)) => Ok(()),
                    Ok(Ok(false)) => Err(TrainError::CiTimeout {
                        tag: tag.clone(),
                        waited_secs: ci_config.max_wait.as_secs(),
                    }),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(TrainError::CiTimeout {
                        tag: tag.clone(),
                        waited_secs: task_timeout.as_secs(),
                    }),
                };
                (tag, outcome)
            });
        }

        let mut failures: Vec<(String, TrainError)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tag, Ok(()))) => info!(tag, "release and build verified"),
                Ok((tag, Err(e))) => {
                    error!(tag, error = %e, "release verification failed");
                    failures.push((tag, e));
                }
                Err(join_error) => failures.push((
                    "<unknown>".to_string(),
                    TrainError::Core(ShunterError::other(format!(
                        "release task panicked: {join_error}"
                    ))),
                )),
            }
        }

        failures.sort_by(|(a, _), (b, _)| a.cmp(b));
        match failures.into_iter().next() {
            Some((_, cause)) => Err(cause),
            None => Ok(()),
        }
    }

    /// Between phases: confirm dependency settlement and the project
    /// graph's expected-dependency assertions
    async fn confirm_settlement(&self) -> Result<()> {
        let verifier = DependencySettlementVerifier::new(
            self.github.as_ref(),
            &self.repo,
            self.config.settlement.clone(),
        );
        verifier.settle().await?;

        if let Some(setup) = &self.config.project_setup {
            let listing = self.resolver.listing().await?;
            let mismatches: Vec<String> = setup
                .projects()
                .iter()
                .flat_map(|p| setup.verify(p.project.kind, &listing))
                .map(|m| m.to_string())
                .collect();
            if !mismatches.is_empty() {
                return Err(TrainError::DependencyMismatch(mismatches.join("; ")));
            }
        }
        Ok(())
    }

    /// Phase 3: per-version post-release workflows, strictly sequential
    ///
    /// Ascending release-line order; each version's changelog merge needs
    /// the immediately preceding version's output, so nothing here runs
    /// concurrently. A failure stops the remaining versions.
    async fn post_release(
        &self,
        targets: &[(ReleaseRef, ReleaseLine)],
        previous: Option<&ReleaseRef>,
    ) -> Result<()> {
        let mut previous = previous.cloned();
        for (release, _) in targets {
            let workflow = ReleaseWorkflow::new(
                self.github.as_ref(),
                self.generator.as_ref(),
                self.resolver.as_ref(),
                &self.notifiers,
                &self.repo,
            );
            workflow.execute(release, previous.as_ref()).await?;
            previous = Some(release.clone());
        }
        Ok(())
    }

    /// Phase 4: await package-index propagation for every version
    ///
    /// Per-version polls run concurrently and independently; failures are
    /// reported after all polls conclude.
    async fn await_artifacts(&self, targets: &[(ReleaseRef, ReleaseLine)]) -> Result<()> {
        let Some(artifact) = self.config.artifact.clone() else {
            debug!("no artifact configured; skipping package-index verification");
            return Ok(());
        };

        let mut tasks: JoinSet<(String, Result<()>)> = JoinSet::new();
        for (release, _) in targets {
            let index = Arc::clone(&self.index);
            let artifact = artifact.clone();
            let version = release.version().to_string();
            let sync = self.config.sync.clone();
            tasks.spawn(async move {
                let outcome =
                    artifacts::await_sync(index.as_ref(), &artifact, &version, &sync).await;
                (version, outcome)
            });
        }

        let mut failures: Vec<(String, TrainError)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((version, Ok(()))) => info!(version, "artifact synced"),
                Ok((version, Err(e))) => {
                    error!(version, error = %e, "artifact sync failed");
                    failures.push((version, e));
                }
                Err(join_error) => failures.push((
                    "<unknown>".to_string(),
                    TrainError::Core(ShunterError::other(format!(
                        "sync task panicked: {join_error}"
                    ))),
                )),
            }
        }

        failures.sort_by(|(a, _), (b, _)| a.cmp(b));
        match failures.into_iter().next() {
            Some((_, cause)) => Err(cause),
            None => Ok(()),
        }
    }
}
