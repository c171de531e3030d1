//! External changelog generator invocation
//!
//! Changelog documents are produced by a third-party executable; this
//! module only drives it and parses what it writes.

use std::path::{Path, PathBuf};

use shunter_core::command::CommandRunner;
use shunter_core::error::{ChangelogError, CommandError, Result};
use shunter_core::types::{ReleaseRef, RepoCoordinate};
use tracing::{debug, info};

use crate::types::Changelog;

/// Executable name looked up on the path when no tool is configured
pub const DEFAULT_GENERATOR_TOOL: &str = "github-changelog-generator";

/// Configuration for the external generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Explicit path to the generator executable; resolved via the path
    /// lookup when absent
    pub tool: Option<PathBuf>,
    /// API base URL handed to the generator
    pub api_base: String,
    /// API token handed to the generator, if configured
    pub token: Option<String>,
}

impl GeneratorConfig {
    /// Create a configuration for the given API base
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            tool: None,
            api_base: api_base.into(),
            token: None,
        }
    }

    /// Use an explicit generator executable
    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Pass an API token to the generator
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Drives the external changelog generator
pub struct ChangelogGenerator<R> {
    runner: R,
    config: GeneratorConfig,
}

impl<R: CommandRunner> ChangelogGenerator<R> {
    /// Create a generator over a command runner
    pub fn new(runner: R, config: GeneratorConfig) -> Self {
        Self { runner, config }
    }

    /// Generate and parse the changelog for `release`
    ///
    /// The tool is invoked with the version (tag marker stripped), the
    /// output path, the repository coordinate, the API base, and the token.
    pub async fn generate(
        &self,
        release: &ReleaseRef,
        output: &Path,
        repo: &RepoCoordinate,
    ) -> Result<Changelog> {
        let tool = self.resolve_tool()?;
        let tool_arg = tool.display().to_string();
        let output_arg = output.display().to_string();
        let repo_arg = repo.to_string();

        let mut args = vec![
            tool_arg.as_str(),
            release.version(),
            output_arg.as_str(),
            "--repository",
            repo_arg.as_str(),
            "--api-url",
            self.config.api_base.as_str(),
        ];
        if let Some(token) = &self.config.token {
            args.push("--token");
            args.push(token);
        }

        info!(version = release.version(), repo = %repo, "generating changelog");
        self.runner.run(&args).await?;

        let document = tokio::fs::read_to_string(output).await.map_err(|e| {
            ChangelogError::GenerationFailed(format!(
                "generator produced no output at {}: {e}",
                output.display()
            ))
        })?;
        debug!(bytes = document.len(), "read generated changelog");
        Ok(crate::parser::parse(&document)?)
    }

    fn resolve_tool(&self) -> std::result::Result<PathBuf, CommandError> {
        match &self.config.tool {
            Some(tool) => Ok(tool.clone()),
            None => which::which(DEFAULT_GENERATOR_TOOL)
                .map_err(|_| CommandError::ToolNotFound(DEFAULT_GENERATOR_TOOL.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::Section;

    /// Runner standing in for the generator executable: records its
    /// invocation and writes a canned document to the output path.
    struct FakeGeneratorTool {
        document: &'static str,
        invocations: Mutex<Vec<Vec<String>>>,
    }

    impl FakeGeneratorTool {
        fn new(document: &'static str) -> Self {
            Self {
                document,
                invocations: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeGeneratorTool {
        async fn run(&self, args: &[&str]) -> std::result::Result<Vec<String>, CommandError> {
            self.invocations
                .lock()
                .unwrap()
                .push(args.iter().map(|s| s.to_string()).collect());
            std::fs::write(args[2], self.document).unwrap();
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_generates_and_parses_output() {
        let tool = FakeGeneratorTool::new("## Features\n\n- shiny\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("changelog.md");

        let config = GeneratorConfig::new("https://api.example.com")
            .with_tool("/opt/generator")
            .with_token("secret");
        let generator = ChangelogGenerator::new(&tool, config);

        let release = ReleaseRef::parse("v1.2.3").unwrap();
        let repo = RepoCoordinate::parse("acme/widgets").unwrap();
        let changelog = generator.generate(&release, &output, &repo).await.unwrap();

        assert!(changelog.section(Section::Features).is_some());

        let invocations = tool.invocations.lock().unwrap();
        let args = &invocations[0];
        assert_eq!(args[0], "/opt/generator");
        assert_eq!(args[1], "1.2.3");
        assert!(args.contains(&"acme/widgets".to_string()));
        assert!(args.contains(&"--token".to_string()));
    }

    #[tokio::test]
    async fn test_missing_output_is_a_generation_failure() {
        struct SilentTool;

        #[async_trait]
        impl CommandRunner for SilentTool {
            async fn run(&self, _args: &[&str]) -> std::result::Result<Vec<String>, CommandError> {
                Ok(Vec::new())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let generator = ChangelogGenerator::new(
            SilentTool,
            GeneratorConfig::new("https://api.example.com").with_tool("/opt/generator"),
        );

        let release = ReleaseRef::parse("v1.2.3").unwrap();
        let repo = RepoCoordinate::parse("acme/widgets").unwrap();
        let err = generator
            .generate(&release, &dir.path().join("missing.md"), &repo)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("produced no output"));
    }
}
