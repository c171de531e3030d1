//! CI provider integration
//!
//! Release creation pushes a tag; the CI provider picks it up and runs a
//! pipeline of workflows. This module finds the tag's pipeline (paginated,
//! with a small page budget) and watches its workflows until they all
//! succeed, one fails, or the bounded wait runs out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, TrainError};

/// How many pipeline pages are searched for a tag before giving up the
/// round
pub const PIPELINE_PAGE_BUDGET: usize = 5;

/// A CI pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Pipeline id
    pub id: String,
    /// The VCS tag that triggered the pipeline, if any
    pub vcs_tag: Option<String>,
}

/// One page of pipelines
#[derive(Debug, Clone)]
pub struct PipelinePage {
    /// Pipelines on this page
    pub items: Vec<Pipeline>,
    /// Token for the next page, if there is one
    pub next_page_token: Option<String>,
}

/// A workflow within a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    /// Workflow name
    pub name: String,
    /// Raw provider status
    pub status: String,
}

impl Workflow {
    /// Whether the workflow finished successfully
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    /// Whether the workflow reported an explicit failure status
    pub fn is_failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("failed") || self.status.eq_ignore_ascii_case("error")
    }
}

/// The CI capabilities the train consumes
#[async_trait]
pub trait CiApi: Send + Sync {
    /// List pipelines for the project, newest first
    async fn list_pipelines(&self, page_token: Option<&str>) -> Result<PipelinePage>;

    /// List a pipeline's workflows
    async fn list_workflows(&self, pipeline_id: &str) -> Result<Vec<Workflow>>;
}

/// Knobs for the build-verification poll
#[derive(Debug, Clone)]
pub struct CiPollConfig {
    /// Interval between polls
    pub poll_interval: Duration,
    /// Overall bound on the wait for one tag's build
    pub max_wait: Duration,
}

impl Default for CiPollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(1800),
        }
    }
}

/// Search the paginated pipeline list for the pipeline of `tag`
pub async fn find_pipeline<C: CiApi + ?Sized>(ci: &C, tag: &str) -> Result<Option<Pipeline>> {
    let mut page_token: Option<String> = None;
    for _ in 0..PIPELINE_PAGE_BUDGET {
        let page = ci.list_pipelines(page_token.as_deref()).await?;
        if let Some(pipeline) = page
            .items
            .iter()
            .find(|p| p.vcs_tag.as_deref() == Some(tag))
        {
            return Ok(Some(pipeline.clone()));
        }
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    Ok(None)
}

/// Wait for the build of `tag` to succeed
///
/// Returns `Ok(true)` once every workflow of the tag's pipeline reports
/// success, `Ok(false)` if the bounded wait elapses first (not-yet-done,
/// surfaced by the caller at phase completion), and
/// [`TrainError::BuildFailed`] the moment any workflow reports an explicit
/// failure status.
pub async fn wait_for_build<C: CiApi + ?Sized>(
    ci: &C,
    tag: &str,
    config: &CiPollConfig,
) -> Result<bool> {
    let started = Instant::now();
    loop {
        if let Some(pipeline) = find_pipeline(ci, tag).await? {
            let workflows = ci.list_workflows(&pipeline.id).await?;
            if let Some(failed) = workflows.iter().find(|w| w.is_failed()) {
                return Err(TrainError::BuildFailed {
                    tag: tag.to_string(),
                    workflow: failed.name.clone(),
                });
            }
            if !workflows.is_empty() && workflows.iter().all(Workflow::is_success) {
                info!(tag, pipeline = pipeline.id, "build verified");
                return Ok(true);
            }
            debug!(tag, "workflows not yet successful");
        } else {
            debug!(tag, "no pipeline for tag yet");
        }

        if started.elapsed() >= config.max_wait {
            return Ok(false);
        }
        sleep(config.poll_interval).await;
    }
}

/// Configuration for the hosted CI provider
#[derive(Debug, Clone)]
pub struct CiConfig {
    /// API base, e.g. `https://circleci.com/api/v2`
    pub base_url: Url,
    /// Project slug, e.g. `gh/acme/widgets`
    pub project_slug: String,
    /// API token
    pub token: String,
}

/// [`CiApi`] over the hosted CI provider's v2 HTTP API
pub struct CircleCi {
    client: Client,
    config: CiConfig,
}

impl CircleCi {
    /// Create a client
    pub fn new(config: CiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn pipelines_url(&self, page_token: Option<&str>) -> Result<Url> {
        let mut url = self
            .config
            .base_url
            .join(&format!("project/{}/pipeline", self.config.project_slug))
            .map_err(|e| TrainError::Api {
                status: 0,
                message: format!("invalid pipeline URL: {e}"),
            })?;
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("page-token", token);
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct PipelinesBody {
    items: Vec<PipelineItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PipelineItem {
    id: String,
    #[serde(default)]
    vcs: Option<PipelineVcs>,
}

#[derive(Debug, Deserialize)]
struct PipelineVcs {
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowsBody {
    items: Vec<WorkflowItem>,
}

#[derive(Debug, Deserialize)]
struct WorkflowItem {
    name: String,
    status: String,
}

#[async_trait]
impl CiApi for CircleCi {
    async fn list_pipelines(&self, page_token: Option<&str>) -> Result<PipelinePage> {
        let url = self.pipelines_url(page_token)?;
        let response = self
            .client
            .get(url)
            .header("Circle-Token", &self.config.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrainError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: PipelinesBody = response.json().await?;
        Ok(PipelinePage {
            items: body
                .items
                .into_iter()
                .map(|item| Pipeline {
                    id: item.id,
                    vcs_tag: item.vcs.and_then(|vcs| vcs.tag),
                })
                .collect(),
            next_page_token: body.next_page_token.filter(|token| !token.is_empty()),
        })
    }

    async fn list_workflows(&self, pipeline_id: &str) -> Result<Vec<Workflow>> {
        let url = self
            .config
            .base_url
            .join(&format!("pipeline/{pipeline_id}/workflow"))
            .map_err(|e| TrainError::Api {
                status: 0,
                message: format!("invalid workflow URL: {e}"),
            })?;
        let response = self
            .client
            .get(url)
            .header("Circle-Token", &self.config.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrainError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body: WorkflowsBody = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .map(|item| Workflow {
                name: item.name,
                status: item.status,
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// Scripted CI: one pipeline per tag, workflow status sequences that
    /// advance on each poll
    pub(crate) struct ScriptedCi {
        pub(crate) workflows: Mutex<BTreeMap<String, Vec<Vec<Workflow>>>>,
        pub(crate) pages: usize,
    }

    impl ScriptedCi {
        pub(crate) fn new() -> Self {
            Self {
                workflows: Mutex::new(BTreeMap::new()),
                pages: 1,
            }
        }

        pub(crate) fn seed(&self, tag: &str, rounds: Vec<Vec<Workflow>>) {
            self.workflows
                .lock()
                .unwrap()
                .insert(tag.to_string(), rounds);
        }
    }

    #[async_trait]
    impl CiApi for ScriptedCi {
        async fn list_pipelines(&self, page_token: Option<&str>) -> Result<PipelinePage> {
            let page: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            // Pipelines appear on the last page to exercise pagination.
            let items = if page + 1 == self.pages {
                self.workflows
                    .lock()
                    .unwrap()
                    .keys()
                    .map(|tag| Pipeline {
                        id: format!("pipeline-{tag}"),
                        vcs_tag: Some(tag.clone()),
                    })
                    .collect()
            } else {
                Vec::new()
            };
            let next_page_token = (page + 1 < self.pages).then(|| (page + 1).to_string());
            Ok(PipelinePage {
                items,
                next_page_token,
            })
        }

        async fn list_workflows(&self, pipeline_id: &str) -> Result<Vec<Workflow>> {
            let tag = pipeline_id.trim_start_matches("pipeline-");
            let mut workflows = self.workflows.lock().unwrap();
            let rounds = workflows.get_mut(tag).expect("workflows seeded");
            if rounds.len() > 1 {
                Ok(rounds.remove(0))
            } else {
                Ok(rounds[0].clone())
            }
        }
    }

    fn workflow(name: &str, status: &str) -> Workflow {
        Workflow {
            name: name.to_string(),
            status: status.to_string(),
        }
    }

    fn fast_config() -> CiPollConfig {
        CiPollConfig {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_find_pipeline_follows_pagination() {
        let mut ci = ScriptedCi::new();
        ci.pages = 3;
        ci.seed("v1.0.0", vec![vec![workflow("build", "success")]]);

        let pipeline = find_pipeline(&ci, "v1.0.0").await.unwrap().unwrap();
        assert_eq!(pipeline.vcs_tag.as_deref(), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn test_find_pipeline_respects_page_budget() {
        let mut ci = ScriptedCi::new();
        ci.pages = PIPELINE_PAGE_BUDGET + 2;
        ci.seed("v1.0.0", vec![vec![workflow("build", "success")]]);

        assert!(find_pipeline(&ci, "v1.0.0").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_build_succeeds_when_workflows_turn_green() {
        let ci = ScriptedCi::new();
        ci.seed(
            "v1.0.0",
            vec![
                vec![workflow("build", "running"), workflow("test", "running")],
                vec![workflow("build", "success"), workflow("test", "success")],
            ],
        );

        assert!(wait_for_build(&ci, "v1.0.0", &fast_config()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_failure_is_a_hard_error() {
        let ci = ScriptedCi::new();
        ci.seed(
            "v1.0.0",
            vec![vec![workflow("build", "success"), workflow("deploy", "failed")]],
        );

        let err = wait_for_build(&ci, "v1.0.0", &fast_config()).await.unwrap_err();
        match err {
            TrainError::BuildFailed { tag, workflow } => {
                assert_eq!(tag, "v1.0.0");
                assert_eq!(workflow, "deploy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_successful_is_false_not_an_error() {
        let ci = ScriptedCi::new();
        ci.seed("v1.0.0", vec![vec![workflow("build", "running")]]);

        assert!(!wait_for_build(&ci, "v1.0.0", &fast_config()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pipeline_is_false_after_the_bound() {
        let ci = ScriptedCi::new();
        assert!(!wait_for_build(&ci, "v9.9.9", &fast_config()).await.unwrap());
    }
}
