//! Single-repository release workflow
//!
//! Sequences the post-release steps for one repository and one release:
//! milestone migration, changelog generation and consolidation, publishing
//! the notes, closing the milestone, and notifying. Used on its own
//! outside train mode and once per version by the train's sequential
//! phase.

use shunter_changelog::generator::ChangelogGenerator;
use shunter_changelog::parser;
use shunter_core::command::CommandRunner;
use shunter_core::types::{MilestoneWithDeadline, ReleaseRef, RepoCoordinate};
use shunter_github::api::GitHubApi;
use shunter_github::deps::DependencyResolver;
use shunter_github::milestones::MilestoneCoordinator;
use tracing::{debug, info};

use crate::error::Result;
use crate::notify::{notify_all, Notifier};

/// The single-repo release orchestrator
pub struct ReleaseWorkflow<'a, G, R1, R2> {
    github: &'a G,
    generator: &'a ChangelogGenerator<R1>,
    resolver: &'a DependencyResolver<R2>,
    notifiers: &'a [Box<dyn Notifier>],
    repo: &'a RepoCoordinate,
}

impl<'a, G, R1, R2> ReleaseWorkflow<'a, G, R1, R2>
where
    G: GitHubApi,
    R1: CommandRunner,
    R2: CommandRunner,
{
    /// Assemble a workflow from its collaborators
    pub fn new(
        github: &'a G,
        generator: &'a ChangelogGenerator<R1>,
        resolver: &'a DependencyResolver<R2>,
        notifiers: &'a [Box<dyn Notifier>],
        repo: &'a RepoCoordinate,
    ) -> Self {
        Self {
            github,
            generator,
            resolver,
            notifiers,
            repo,
        }
    }

    /// Run the post-release steps for `release`
    ///
    /// `previous` is the immediately preceding release whose published
    /// notes the fresh changelog is merged against; `None` publishes the
    /// generated notes as-is.
    pub async fn execute(
        &self,
        release: &ReleaseRef,
        previous: Option<&ReleaseRef>,
    ) -> Result<MilestoneWithDeadline> {
        info!(repo = %self.repo, release = %release, "starting release workflow");

        let coordinator = MilestoneCoordinator::new(self.github, self.repo);
        let next_milestone = coordinator.migrate(release).await?;

        let workspace = tempfile::tempdir()?;
        let generated_path = workspace.path().join("changelog.md");
        let mut changelog = self
            .generator
            .generate(release, &generated_path, self.repo)
            .await?;

        if let Some(previous) = previous {
            match self.github.release_notes(self.repo, previous.tag()).await? {
                Some(notes) => {
                    debug!(previous = %previous, "merging previously published notes");
                    let published = parser::parse(&notes).map_err(shunter_core::ShunterError::from)?;
                    changelog.merge(&published);
                }
                None => debug!(previous = %previous, "no published notes to merge"),
            }
        }

        let excluded = self.resolver.excluded_coordinates().await?;
        changelog.consolidate_dependency_upgrades(&excluded);

        let notes_path = workspace.path().join("notes.md");
        tokio::fs::write(&notes_path, changelog.render()).await?;
        self.github
            .publish_release_notes(self.repo, release.tag(), &notes_path)
            .await?;
        info!(release = %release, "release notes published");

        coordinator.close(release).await?;
        notify_all(
            self.notifiers,
            &self.repo.to_string(),
            release.tag(),
            &next_milestone,
        )
        .await;

        Ok(next_milestone)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use shunter_changelog::generator::GeneratorConfig;
    use shunter_core::error::CommandError;
    use shunter_core::types::{Issue, IssueState};
    use shunter_github::testing::InMemoryGitHub;

    use super::*;
    use crate::notify::tests::RecordingNotifier;

    /// Stands in for the changelog generator executable; records the
    /// versions it was invoked for and writes a canned document.
    pub(crate) struct GeneratorStub {
        pub(crate) document: String,
        pub(crate) versions: Mutex<Vec<String>>,
    }

    impl GeneratorStub {
        pub(crate) fn new(document: &str) -> Self {
            Self {
                document: document.to_string(),
                versions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for GeneratorStub {
        async fn run(&self, args: &[&str]) -> std::result::Result<Vec<String>, CommandError> {
            self.versions.lock().unwrap().push(args[1].to_string());
            std::fs::write(args[2], &self.document).unwrap();
            Ok(Vec::new())
        }
    }

    /// Stands in for the dependency-report command
    pub(crate) struct ReportStub {
        pub(crate) report: String,
    }

    #[async_trait]
    impl CommandRunner for ReportStub {
        async fn run(&self, _args: &[&str]) -> std::result::Result<Vec<String>, CommandError> {
            Ok(self.report.lines().map(str::to_string).collect())
        }
    }

    pub(crate) fn generator(stub: &GeneratorStub) -> ChangelogGenerator<&GeneratorStub> {
        ChangelogGenerator::new(
            stub,
            GeneratorConfig::new("https://api.example.com").with_tool("/opt/generator"),
        )
    }

    pub(crate) fn resolver(stub: &ReportStub) -> DependencyResolver<&ReportStub> {
        DependencyResolver::new(stub, vec!["report".to_string()])
    }

    const GENERATED: &str = "\
# 1.0.5

## Features

- Add widget polish

## Dependency Upgrades

- Bump io.acme:gauge-docs from 1.0 to 1.1 [#20](https://example.com/20)
- Bump org.junit:junit from 5.9 to 5.10 [#21](https://example.com/21)
";

    const REPORT: &str = "\
runtime-classpath
+--- io.acme:gauge-docs:1.1

test-implementation
+--- org.junit:junit:5.10
";

    fn seeded_github() -> InMemoryGitHub {
        let github = InMemoryGitHub::new();
        github.add_milestone(1, "1.0.5", vec![Issue { number: 10, state: IssueState::Open }]);
        github.add_milestone(2, "1.0.x", vec![Issue { number: 11, state: IssueState::Closed }]);
        github
    }

    #[tokio::test]
    async fn test_workflow_publishes_consolidated_notes_and_closes() {
        let github = seeded_github();
        let generator_stub = GeneratorStub::new(GENERATED);
        let report_stub = ReportStub {
            report: REPORT.to_string(),
        };
        let generator = generator(&generator_stub);
        let resolver = resolver(&report_stub);
        let (recording, sent) = RecordingNotifier::new(false);
        let notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(recording)];
        let repo = RepoCoordinate::parse("acme/widgets").unwrap();

        let workflow = ReleaseWorkflow::new(&github, &generator, &resolver, &notifiers, &repo);
        let release = ReleaseRef::parse("v1.0.5").unwrap();
        let next = workflow.execute(&release, None).await.unwrap();

        assert_eq!(next.title, "1.0.6");

        let state = github.state.lock().unwrap();
        let notes = state.release_notes.get("v1.0.5").unwrap();
        assert!(notes.contains("- Add widget polish"));
        // The test-scoped bump is excluded from the consolidated section.
        assert!(notes.contains("io.acme:gauge-docs"));
        assert!(!notes.contains("org.junit:junit"));
        assert_eq!(state.closed_milestones, vec![1]);
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_workflow_merges_previously_published_notes() {
        let github = seeded_github();
        github
            .state
            .lock()
            .unwrap()
            .release_notes
            .insert("v1.0.4".to_string(), "## Features\n\n- Older feature\n".to_string());

        let generator_stub = GeneratorStub::new(GENERATED);
        let report_stub = ReportStub {
            report: REPORT.to_string(),
        };
        let generator = generator(&generator_stub);
        let resolver = resolver(&report_stub);
        let notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        let repo = RepoCoordinate::parse("acme/widgets").unwrap();

        let workflow = ReleaseWorkflow::new(&github, &generator, &resolver, &notifiers, &repo);
        let release = ReleaseRef::parse("v1.0.5").unwrap();
        let previous = ReleaseRef::parse("v1.0.4").unwrap();
        workflow.execute(&release, Some(&previous)).await.unwrap();

        let state = github.state.lock().unwrap();
        let notes = state.release_notes.get("v1.0.5").unwrap();
        assert!(notes.contains("- Older feature"));
        assert!(notes.contains("- Add widget polish"));
    }

    #[tokio::test]
    async fn test_workflow_fails_without_milestones_and_publishes_nothing() {
        let github = InMemoryGitHub::new();
        let generator_stub = GeneratorStub::new(GENERATED);
        let report_stub = ReportStub {
            report: REPORT.to_string(),
        };
        let generator = generator(&generator_stub);
        let resolver = resolver(&report_stub);
        let notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        let repo = RepoCoordinate::parse("acme/widgets").unwrap();

        let workflow = ReleaseWorkflow::new(&github, &generator, &resolver, &notifiers, &repo);
        let release = ReleaseRef::parse("v1.0.5").unwrap();
        assert!(workflow.execute(&release, None).await.is_err());

        let state = github.state.lock().unwrap();
        assert!(state.release_notes.is_empty());
        // The generator was never reached.
        assert!(generator_stub.versions.lock().unwrap().is_empty());
    }
}
