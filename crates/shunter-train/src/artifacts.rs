//! Package index artifact-sync verification
//!
//! After a release builds, the artifact still has to propagate to the
//! public package index. The probe is a HEAD-style existence check against
//! a deterministic URL; anything other than 404 means the artifact is
//! visible.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, TrainError};

/// The package index capabilities the train consumes
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// Probe whether `artifact` at `version` is publicly visible
    async fn artifact_present(&self, artifact: &str, version: &str) -> Result<bool>;
}

/// Knobs for the artifact-sync poll
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between probes
    pub poll_interval: Duration,
    /// Overall bound on the wait per version
    pub max_wait: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            max_wait: Duration::from_secs(1800),
        }
    }
}

/// Poll the index until `artifact`/`version` appears
///
/// Fails with [`TrainError::SyncTimeout`] naming the version once the
/// bounded wait is exhausted.
pub async fn await_sync<P: PackageIndex + ?Sized>(
    index: &P,
    artifact: &str,
    version: &str,
    config: &SyncConfig,
) -> Result<()> {
    let started = Instant::now();
    loop {
        if index.artifact_present(artifact, version).await? {
            info!(artifact, version, "artifact visible in the package index");
            return Ok(());
        }
        if started.elapsed() >= config.max_wait {
            return Err(TrainError::SyncTimeout {
                version: version.to_string(),
                waited_secs: config.max_wait.as_secs(),
            });
        }
        debug!(artifact, version, "artifact not yet visible");
        sleep(config.poll_interval).await;
    }
}

/// [`PackageIndex`] over an HTTP repository layout
///
/// Probes `<base>/<group-as-path>/<artifact>/<version>/`.
pub struct HttpPackageIndex {
    client: Client,
    base_url: Url,
    group: String,
}

impl HttpPackageIndex {
    /// Create a probe for `group` under `base_url`
    pub fn new(base_url: Url, group: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            group: group.into(),
        }
    }

    fn artifact_url(&self, artifact: &str, version: &str) -> Result<Url> {
        let path = format!(
            "{}/{artifact}/{version}/",
            self.group.replace('.', "/")
        );
        self.base_url.join(&path).map_err(|e| TrainError::Api {
            status: 0,
            message: format!("invalid artifact URL: {e}"),
        })
    }
}

#[async_trait]
impl PackageIndex for HttpPackageIndex {
    async fn artifact_present(&self, artifact: &str, version: &str) -> Result<bool> {
        let url = self.artifact_url(artifact, version)?;
        let response = self.client.head(url).send().await?;
        Ok(response.status() != StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// Scripted index: per-version countdown of probes until visibility
    pub(crate) struct ScriptedIndex {
        pub(crate) probes_until_visible: Mutex<BTreeMap<String, usize>>,
    }

    impl ScriptedIndex {
        pub(crate) fn new() -> Self {
            Self {
                probes_until_visible: Mutex::new(BTreeMap::new()),
            }
        }

        pub(crate) fn seed(&self, version: &str, probes: usize) {
            self.probes_until_visible
                .lock()
                .unwrap()
                .insert(version.to_string(), probes);
        }
    }

    #[async_trait]
    impl PackageIndex for ScriptedIndex {
        async fn artifact_present(&self, _artifact: &str, version: &str) -> Result<bool> {
            let mut remaining = self.probes_until_visible.lock().unwrap();
            match remaining.get_mut(version) {
                Some(0) => Ok(true),
                Some(count) => {
                    *count -= 1;
                    Ok(false)
                }
                None => Ok(false),
            }
        }
    }

    fn fast_config() -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_waits_for_visibility() {
        let index = ScriptedIndex::new();
        index.seed("1.0.5", 3);

        await_sync(&index, "gauge", "1.0.5", &fast_config())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_timeout_names_the_version() {
        let index = ScriptedIndex::new();

        let err = await_sync(&index, "gauge", "2.0.0", &fast_config())
            .await
            .unwrap_err();
        match err {
            TrainError::SyncTimeout {
                version,
                waited_secs,
            } => {
                assert_eq!(version, "2.0.0");
                assert_eq!(waited_secs, 60);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_artifact_url_maps_group_to_path() {
        let index = HttpPackageIndex::new(
            Url::parse("https://repo.example.com/releases/").unwrap(),
            "io.acme.gauge",
        );
        let url = index.artifact_url("gauge", "1.0.5").unwrap();
        assert_eq!(
            url.as_str(),
            "https://repo.example.com/releases/io/acme/gauge/gauge/1.0.5/"
        );
    }
}
