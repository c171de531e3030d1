//! Outbound release notifications
//!
//! Every configured channel is told about a release independently; a
//! misconfigured or failing channel is logged and never blocks the run or
//! another channel.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use shunter_core::types::MilestoneWithDeadline;
use tracing::{info, warn};
use url::Url;

use crate::error::Result;

/// An outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name, for logs
    fn name(&self) -> &str;

    /// Announce a release and the milestone that follows it
    async fn send_notification(
        &self,
        repo_name: &str,
        ref_name: &str,
        milestone: &MilestoneWithDeadline,
    ) -> Result<()>;
}

/// Render the announcement text
///
/// The deadline line is suppressed when the milestone has none.
pub(crate) fn render_message(
    repo_name: &str,
    ref_name: &str,
    milestone: &MilestoneWithDeadline,
) -> String {
    match &milestone.deadline {
        Some(deadline) => format!(
            "{repo_name} {ref_name} has been released. Next up: {} (due {}).",
            milestone.title,
            deadline.format("%Y-%m-%d")
        ),
        None => format!(
            "{repo_name} {ref_name} has been released. Next up: {}.",
            milestone.title
        ),
    }
}

/// Invoke every notifier independently
///
/// Failures are logged per channel; none aborts the run.
pub async fn notify_all(
    notifiers: &[Box<dyn Notifier>],
    repo_name: &str,
    ref_name: &str,
    milestone: &MilestoneWithDeadline,
) {
    for notifier in notifiers {
        match notifier
            .send_notification(repo_name, ref_name, milestone)
            .await
        {
            Ok(()) => info!(channel = notifier.name(), "notification sent"),
            Err(e) => warn!(channel = notifier.name(), error = %e, "notification failed"),
        }
    }
}

/// Chat channel notifier posting to an incoming webhook
pub struct ChatNotifier {
    client: Client,
    webhook: Option<Url>,
}

impl ChatNotifier {
    /// Create a notifier; a missing or unparseable webhook degrades the
    /// channel to a warned no-op
    pub fn new(webhook: Option<&str>) -> Self {
        let webhook = match webhook {
            Some(raw) => match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, "chat webhook unparseable; channel disabled");
                    None
                }
            },
            None => {
                warn!("no chat webhook configured; channel disabled");
                None
            }
        };
        Self {
            client: Client::new(),
            webhook,
        }
    }
}

#[async_trait]
impl Notifier for ChatNotifier {
    fn name(&self) -> &str {
        "chat"
    }

    async fn send_notification(
        &self,
        repo_name: &str,
        ref_name: &str,
        milestone: &MilestoneWithDeadline,
    ) -> Result<()> {
        let Some(webhook) = &self.webhook else {
            return Ok(());
        };
        let body = json!({ "text": render_message(repo_name, ref_name, milestone) });
        self.client
            .post(webhook.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(crate::error::TrainError::from)?;
        Ok(())
    }
}

/// Social status notifier posting through a token-authenticated API
pub struct SocialNotifier {
    client: Client,
    endpoint: Option<(Url, String)>,
}

impl SocialNotifier {
    /// Create a notifier; missing base URL or token degrades the channel
    /// to a warned no-op
    pub fn new(api_base: Option<&str>, token: Option<&str>) -> Self {
        let endpoint = match (api_base, token) {
            (Some(base), Some(token)) => match Url::parse(base) {
                Ok(url) => Some((url, token.to_string())),
                Err(e) => {
                    warn!(error = %e, "social API base unparseable; channel disabled");
                    None
                }
            },
            _ => {
                warn!("social channel not fully configured; channel disabled");
                None
            }
        };
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Notifier for SocialNotifier {
    fn name(&self) -> &str {
        "social"
    }

    async fn send_notification(
        &self,
        repo_name: &str,
        ref_name: &str,
        milestone: &MilestoneWithDeadline,
    ) -> Result<()> {
        let Some((base, token)) = &self.endpoint else {
            return Ok(());
        };
        let body = json!({ "status": render_message(repo_name, ref_name, milestone) });
        self.client
            .post(base.clone())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(crate::error::TrainError::from)?;
        Ok(())
    }
}
