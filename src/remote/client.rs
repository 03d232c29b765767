//! Client for the remote index build service.
//!
//! Protocol: `POST {endpoint}/_build` with the request body returns a job id,
//! then `GET {endpoint}/_status/{job_id}` is polled until the job completes
//! or fails. Submission and polling together are bounded by one timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::RemoteBuildConfig;
use crate::error::{Result, SkyhookError};
use crate::remote::request::RemoteBuildRequest;

/// A finished remote build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBuildResult {
    pub job_id: String,
    /// Name of the built index file, relative to the staged vectors' prefix.
    pub file_name: String,
}

/// Anything that can turn a staged build request into a built index.
///
/// Implementations enforce their own timeout and report it as an error.
#[async_trait]
pub trait RemoteBuilder: Send + Sync {
    async fn build(&self, request: &RemoteBuildRequest) -> Result<RemoteBuildResult>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    RunningIndexBuild,
    CompletedIndexBuild,
    FailedIndexBuild,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub task_status: TaskStatus,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// HTTP implementation of [`RemoteBuilder`].
pub struct HttpRemoteBuilder {
    endpoint: Url,
    http: reqwest::Client,
    poll_interval: Duration,
    timeout: Duration,
}

impl HttpRemoteBuilder {
    pub fn new(endpoint: &str, poll_interval: Duration, timeout: Duration) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint).map_err(|e| {
            SkyhookError::Configuration(format!("invalid remote build endpoint '{endpoint}': {e}"))
        })?;
        // Url::join replaces the last path segment unless the path ends in '/'.
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            http: reqwest::Client::builder().build()?,
            poll_interval,
            timeout,
        })
    }

    pub fn from_config(config: &RemoteBuildConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.poll_interval(), config.timeout())
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| SkyhookError::Configuration(format!("invalid remote build url: {e}")))
    }

    #[instrument(skip(self, request), fields(vector_path = request.vector_path()))]
    async fn submit(&self, request: &RemoteBuildRequest) -> Result<String> {
        let resp = self.http.post(self.url("_build")?).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SkyhookError::RemoteBuild(format!(
                "submit returned {status}: {body}"
            )));
        }
        let body: SubmitResponse = resp.json().await?;
        info!(job_id = %body.job_id, "submitted remote build");
        Ok(body.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse> {
        let resp = self
            .http
            .get(self.url(&format!("_status/{job_id}"))?)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SkyhookError::RemoteBuild(format!(
                "status for job {job_id} returned {status}: {body}"
            )));
        }
        Ok(resp.json().await?)
    }

    #[instrument(skip(self))]
    async fn await_completion(&self, job_id: &str) -> Result<RemoteBuildResult> {
        loop {
            let status = self.status(job_id).await?;
            match status.task_status {
                TaskStatus::RunningIndexBuild => {
                    debug!("remote build still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
                TaskStatus::CompletedIndexBuild => {
                    let file_name = status.file_name.filter(|f| !f.is_empty()).ok_or_else(|| {
                        SkyhookError::RemoteBuild(format!(
                            "job {job_id} completed without a file name"
                        ))
                    })?;
                    return Ok(RemoteBuildResult {
                        job_id: job_id.to_string(),
                        file_name,
                    });
                }
                TaskStatus::FailedIndexBuild => {
                    return Err(SkyhookError::RemoteBuild(format!(
                        "job {job_id} failed: {}",
                        status.error_message.unwrap_or_else(|| "no error message".into())
                    )));
                }
                TaskStatus::Unknown => {
                    return Err(SkyhookError::RemoteBuild(format!(
                        "job {job_id} reported an unknown status"
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl RemoteBuilder for HttpRemoteBuilder {
    async fn build(&self, request: &RemoteBuildRequest) -> Result<RemoteBuildResult> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let job_id = tokio::time::timeout_at(deadline, self.submit(request))
            .await
            .map_err(|_| SkyhookError::RemoteTimeout {
                job_id: "unsubmitted".to_string(),
                waited_secs: started.elapsed().as_secs(),
            })??;

        tokio::time::timeout_at(deadline, self.await_completion(&job_id))
            .await
            .map_err(|_| SkyhookError::RemoteTimeout {
                job_id: job_id.clone(),
                waited_secs: started.elapsed().as_secs(),
            })?
    }
}

/// Used when no remote endpoint is configured. Every build fails, which
/// sends the orchestrator straight to its local fallback.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredRemoteBuilder;

#[async_trait]
impl RemoteBuilder for UnconfiguredRemoteBuilder {
    async fn build(&self, _request: &RemoteBuildRequest) -> Result<RemoteBuildResult> {
        Err(SkyhookError::Configuration(
            "no remote build endpoint configured".into(),
        ))
    }
}
