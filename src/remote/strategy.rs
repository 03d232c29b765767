//! Remote-first index build with guaranteed local fallback.
//!
//! A build is offloaded only when the eligibility policy says so. Every
//! failure on the remote path is absorbed and turned into a local build, so
//! the caller sees exactly what a local-only build would have produced. The
//! only error that escapes is a failure of the local builder itself.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SkyhookError};
use crate::local::FallbackBuilder;
use crate::remote::blob::upload_batch;
use crate::remote::client::RemoteBuilder;
use crate::remote::path::{build_storage_location, new_build_token, StorageLocation};
use crate::remote::policy::should_build_remotely;
use crate::remote::request::compose_request;
use crate::repository::Repositories;
use crate::settings::{IndexSettings, SettingsProvider};
use crate::types::BuildParameters;

/// Step of the remote path at which an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Repository,
    Upload,
    Compose,
    Submit,
    Download,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Repository => "repository",
            Stage::Upload => "upload",
            Stage::Compose => "compose",
            Stage::Submit => "submit",
            Stage::Download => "download",
            Stage::Write => "write",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a remote attempt was abandoned.
#[derive(Debug)]
pub struct RemoteFailure {
    pub stage: Stage,
    pub error: SkyhookError,
}

impl RemoteFailure {
    fn at(stage: Stage) -> impl FnOnce(SkyhookError) -> Self {
        move |error| Self { stage, error }
    }
}

/// How a successful build was produced.
#[derive(Debug)]
pub enum BuildOutcome {
    Remote {
        job_id: String,
        location: StorageLocation,
        /// Key of the downloaded index in the vector repository.
        index_key: String,
    },
    Local {
        /// `None` when the build was never eligible for remote.
        fallback: Option<RemoteFailure>,
    },
}

impl BuildOutcome {
    pub fn is_remote(&self) -> bool {
        matches!(self, BuildOutcome::Remote { .. })
    }
}

/// Orchestrates one index's builds: remote when eligible, local otherwise.
pub struct RemoteIndexBuildStrategy {
    repositories: Arc<dyn Repositories>,
    remote: Arc<dyn RemoteBuilder>,
    fallback: Arc<dyn FallbackBuilder>,
    settings: Arc<dyn SettingsProvider>,
}

impl RemoteIndexBuildStrategy {
    pub fn new(
        repositories: Arc<dyn Repositories>,
        remote: Arc<dyn RemoteBuilder>,
        fallback: Arc<dyn FallbackBuilder>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            repositories,
            remote,
            fallback,
            settings,
        }
    }

    /// Build the index for `params` and write it to `params.output`.
    ///
    /// Does not return until the build, remote or local, has fully finished.
    ///
    /// # Errors
    /// Only `SkyhookError::LocalBuild`, when the fallback builder fails.
    #[instrument(skip(self, params), fields(field = %params.field_name, segment = %params.segment))]
    pub async fn build_and_write(&self, params: &BuildParameters) -> Result<BuildOutcome> {
        let started = Instant::now();
        // One snapshot for the whole build, even if settings change meanwhile.
        let settings = self.settings.snapshot();
        let candidate_size = params.candidate_size_bytes();

        let settings = match settings {
            Some(s) if should_build_remotely(Some(&s), candidate_size) => s,
            _ => {
                debug!(candidate_size, "not eligible for remote build");
                return self.build_locally(params, None, started).await;
            }
        };

        match self.try_remote(&settings, params).await {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_secs_f64();
                crate::metrics::BUILDS_TOTAL
                    .with_label_values(&["remote"])
                    .inc();
                crate::metrics::BUILD_DURATION
                    .with_label_values(&["remote"])
                    .observe(elapsed);
                info!(elapsed_secs = elapsed, "remote build complete");
                Ok(outcome)
            }
            Err(failure) => {
                warn!(
                    index_uuid = %settings.index_uuid,
                    stage = %failure.stage,
                    kind = failure.error.kind(),
                    error = %failure.error,
                    "remote build failed, falling back to local build"
                );
                crate::metrics::FALLBACKS_TOTAL
                    .with_label_values(&[failure.stage.as_str(), failure.error.kind()])
                    .inc();
                self.build_locally(params, Some(failure), started).await
            }
        }
    }

    async fn try_remote(
        &self,
        settings: &IndexSettings,
        params: &BuildParameters,
    ) -> std::result::Result<BuildOutcome, RemoteFailure> {
        params.validate().map_err(RemoteFailure::at(Stage::Validate))?;

        let repository = self
            .repositories
            .resolve(&settings.vector_repo)
            .map_err(RemoteFailure::at(Stage::Repository))?;

        let location = build_storage_location(
            repository.base_path(),
            &settings.index_uuid,
            &new_build_token(),
            &params.field_name,
            &params.segment,
        );

        let uploaded = upload_batch(repository.store(), &location, &params.batch)
            .await
            .map_err(RemoteFailure::at(Stage::Upload))?;
        crate::metrics::UPLOADED_BYTES_TOTAL.inc_by(uploaded);

        let request = compose_request(settings, params, repository.metadata(), &location)
            .map_err(RemoteFailure::at(Stage::Compose))?;

        let result = self
            .remote
            .build(&request)
            .await
            .map_err(RemoteFailure::at(Stage::Submit))?;

        let index_key = location.sibling(&result.file_name);
        let data = repository
            .store()
            .get(&index_key)
            .await
            .map_err(RemoteFailure::at(Stage::Download))?;

        params
            .output
            .write_index(data)
            .await
            .map_err(RemoteFailure::at(Stage::Write))?;

        Ok(BuildOutcome::Remote {
            job_id: result.job_id,
            location,
            index_key,
        })
    }

    async fn build_locally(
        &self,
        params: &BuildParameters,
        fallback: Option<RemoteFailure>,
        started: Instant,
    ) -> Result<BuildOutcome> {
        if let Err(e) = self.fallback.build_and_write(params).await {
            crate::metrics::LOCAL_BUILD_FAILURES_TOTAL.inc();
            error!(error = %e, "local build failed");
            return Err(e.into_local_build());
        }

        let elapsed = started.elapsed().as_secs_f64();
        crate::metrics::BUILDS_TOTAL
            .with_label_values(&["local"])
            .inc();
        crate::metrics::BUILD_DURATION
            .with_label_values(&["local"])
            .observe(elapsed);
        debug!(elapsed_secs = elapsed, "local build complete");

        Ok(BuildOutcome::Local { fallback })
    }
}
