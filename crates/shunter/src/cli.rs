//! CLI definition and command handling
//!
//! One entry point; train mode is selected when the train-version input is
//! present and non-blank, the single-repository workflow otherwise. Every
//! input can come from a flag or its environment variable, so the binary
//! drops into CI release jobs without wrapper scripts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::style;
use dialoguer::Confirm;
use tracing::info;
use url::Url;

use shunter_changelog::generator::{ChangelogGenerator, GeneratorConfig};
use shunter_core::command::ProcessRunner;
use shunter_core::types::{ReleaseRef, RepoCoordinate};
use shunter_github::api::GhCli;
use shunter_github::deps::DependencyResolver;
use shunter_github::settlement::SettlementConfig;
use shunter_train::artifacts::HttpPackageIndex;
use shunter_train::ci::{CiConfig, CircleCi};
use shunter_train::notify::{ChatNotifier, Notifier, SocialNotifier};
use shunter_train::scheduler::{TrainConfig, TrainScheduler};
use shunter_train::workflow::ReleaseWorkflow;

/// Shunter - release train coordinator
#[derive(Debug, Parser)]
#[command(name = "shunter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository coordinate (owner/name)
    #[arg(long, env = "SHUNTER_REPOSITORY")]
    pub repository: String,

    /// Release ref being processed (tag-shaped, e.g. v1.2.3)
    #[arg(long, env = "SHUNTER_CURRENT_REF")]
    pub current_ref: Option<String>,

    /// Previous release ref, for changelog diffing
    #[arg(long, env = "SHUNTER_PREVIOUS_REF")]
    pub previous_ref: Option<String>,

    /// Comma-separated train versions; presence selects train mode
    #[arg(long, env = "SHUNTER_TRAIN_VERSIONS")]
    pub train_versions: Option<String>,

    /// Artifact whose package-index propagation is verified after the train
    #[arg(long, env = "SHUNTER_ARTIFACT")]
    pub artifact: Option<String>,

    /// Group id of the released artifacts
    #[arg(long, env = "SHUNTER_GROUP")]
    pub group: Option<String>,

    /// Library namespace watched during dependency settlement
    #[arg(long, env = "SHUNTER_NAMESPACE")]
    pub namespace: Option<String>,

    /// Code-host API base handed to the changelog generator
    #[arg(long, env = "SHUNTER_API_BASE", default_value = "https://api.github.com")]
    pub api_base: String,

    /// Code-host API token handed to the changelog generator
    #[arg(long, env = "GH_TOKEN")]
    pub token: Option<String>,

    /// Explicit path to the changelog generator executable
    #[arg(long, env = "SHUNTER_GENERATOR_TOOL")]
    pub generator_tool: Option<PathBuf>,

    /// CI provider API base
    #[arg(long, env = "SHUNTER_CI_BASE", default_value = "https://circleci.com/api/v2/")]
    pub ci_base: Url,

    /// CI project slug (e.g. gh/acme/widgets)
    #[arg(long, env = "SHUNTER_CI_PROJECT")]
    pub ci_project: Option<String>,

    /// CI provider API token
    #[arg(long, env = "CIRCLE_TOKEN")]
    pub ci_token: Option<String>,

    /// Package index base URL
    #[arg(
        long,
        env = "SHUNTER_INDEX_BASE",
        default_value = "https://repo.maven.apache.org/maven2/"
    )]
    pub index_base: Url,

    /// Command producing the dependency-tree report
    #[arg(
        long,
        env = "SHUNTER_REPORT_COMMAND",
        default_value = "./gradlew -q dependencies"
    )]
    pub report_command: String,

    /// Chat webhook URL for release notifications
    #[arg(long, env = "SHUNTER_CHAT_WEBHOOK")]
    pub chat_webhook: Option<String>,

    /// Social API base for release notifications
    #[arg(long, env = "SHUNTER_SOCIAL_API")]
    pub social_api: Option<String>,

    /// Social API token for release notifications
    #[arg(long, env = "SHUNTER_SOCIAL_TOKEN")]
    pub social_token: Option<String>,

    /// Skip the train confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Cli {
    /// The train-version input, when present and non-blank
    pub fn train_input(&self) -> Option<&str> {
        self.train_versions
            .as_deref()
            .map(str::trim)
            .filter(|versions| !versions.is_empty())
    }

    /// Execute in the selected mode
    pub async fn execute(self) -> anyhow::Result<()> {
        let repo = RepoCoordinate::parse(&self.repository)?;

        match self.train_input() {
            Some(versions) => {
                let versions = versions.to_string();
                self.run_train(&repo, &versions).await
            }
            None => self.run_single(&repo).await,
        }
    }

    async fn run_single(&self, repo: &RepoCoordinate) -> anyhow::Result<()> {
        let current = self
            .current_ref
            .as_deref()
            .context("--current-ref is required outside train mode")?;
        let release = ReleaseRef::parse(current)?;
        let previous = self.parse_previous()?;

        info!(repo = %repo, release = %release, "running single-repository release");

        let github = GhCli::new(ProcessRunner::new());
        let generator = ChangelogGenerator::new(ProcessRunner::new(), self.generator_config());
        let resolver = DependencyResolver::new(ProcessRunner::silent(), self.report_args());
        let notifiers = self.notifiers();

        let workflow = ReleaseWorkflow::new(&github, &generator, &resolver, &notifiers, repo);
        let next = workflow.execute(&release, previous.as_ref()).await?;

        println!(
            "{} {} released; next milestone {}",
            style("✓").green().bold(),
            style(release.tag()).cyan(),
            style(&next.title).cyan()
        );
        Ok(())
    }

    async fn run_train(&self, repo: &RepoCoordinate, versions: &str) -> anyhow::Result<()> {
        let previous = self.parse_previous()?;

        if !self.yes {
            let proceed = Confirm::new()
                .with_prompt(format!("Release train for {repo}: {versions}. Proceed?"))
                .default(false)
                .interact()?;
            if !proceed {
                println!("{} train aborted", style("!").yellow().bold());
                return Ok(());
            }
        }

        let ci_project = self
            .ci_project
            .clone()
            .context("--ci-project is required in train mode")?;
        let ci_token = self
            .ci_token
            .clone()
            .context("--ci-token is required in train mode")?;
        let namespace = self
            .namespace
            .clone()
            .or_else(|| self.group.clone())
            .context("--namespace or --group is required in train mode")?;
        let group = match &self.artifact {
            Some(_) => Some(
                self.group
                    .clone()
                    .context("--group is required when --artifact is set")?,
            ),
            None => None,
        };

        let github = Arc::new(GhCli::new(ProcessRunner::new()));
        let ci = Arc::new(CircleCi::new(CiConfig {
            base_url: self.ci_base.clone(),
            project_slug: ci_project,
            token: ci_token,
        }));
        let index = Arc::new(HttpPackageIndex::new(
            self.index_base.clone(),
            group.unwrap_or_default(),
        ));
        let generator = Arc::new(ChangelogGenerator::new(
            ProcessRunner::new(),
            self.generator_config(),
        ));
        let resolver = Arc::new(DependencyResolver::new(
            ProcessRunner::silent(),
            self.report_args(),
        ));

        let mut config = TrainConfig::new(SettlementConfig::new(namespace));
        config.artifact = self.artifact.clone();

        let scheduler = TrainScheduler::new(
            github,
            ci,
            index,
            generator,
            resolver,
            self.notifiers(),
            repo.clone(),
            config,
        );
        scheduler.run(versions, previous.as_ref()).await?;

        println!(
            "{} release train {} complete",
            style("✓").green().bold(),
            style(versions).cyan()
        );
        Ok(())
    }

    fn parse_previous(&self) -> anyhow::Result<Option<ReleaseRef>> {
        Ok(match self.previous_ref.as_deref() {
            Some(previous) => Some(ReleaseRef::parse(previous)?),
            None => None,
        })
    }

    fn generator_config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::new(self.api_base.clone());
        if let Some(tool) = &self.generator_tool {
            config = config.with_tool(tool);
        }
        if let Some(token) = &self.token {
            config = config.with_token(token);
        }
        config
    }

    fn report_args(&self) -> Vec<String> {
        self.report_command
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn notifiers(&self) -> Vec<Box<dyn Notifier>> {
        vec![
            Box::new(ChatNotifier::new(self.chat_webhook.as_deref())),
            Box::new(SocialNotifier::new(
                self.social_api.as_deref(),
                self.social_token.as_deref(),
            )),
        ]
    }
}
