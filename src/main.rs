use std::sync::Arc;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use skyhook::config::Config;
use skyhook::local::{DirectoryOutput, FlatIndexBuilder};
use skyhook::remote::{
    BuildOutcome, HttpRemoteBuilder, RemoteBuilder, RemoteIndexBuildStrategy,
    UnconfiguredRemoteBuilder,
};
use skyhook::repository::RepositoryRegistry;
use skyhook::settings::LiveSettings;
use skyhook::types::{BuildParameters, MethodContext, SpaceType, VectorBatch, VectorValues};

/// One field of one segment, as read from the batch file.
#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    index_uuid: Option<String>,
    field_name: String,
    segment: String,
    dimension: usize,
    #[serde(default)]
    method: Option<MethodContext>,
    doc_ids: Vec<i32>,
    vectors: VectorValues,
}

#[tokio::main]
async fn main() {
    // Load .env
    let _ = dotenvy::dotenv();

    let config = Config::load(None).expect("failed to load config");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }

    skyhook::metrics::init();

    let batch_path = std::env::args()
        .nth(1)
        .expect("usage: skyhook <batch.json>");
    let raw = std::fs::read(&batch_path).expect("failed to read batch file");
    let batch: BatchFile = serde_json::from_slice(&raw).expect("failed to parse batch file");

    let index_uuid = batch
        .index_uuid
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let output_dir =
        std::env::var("SKYHOOK_OUTPUT_DIR").unwrap_or_else(|_| "index-out".to_string());
    let output = Arc::new(DirectoryOutput::new(
        &output_dir,
        &batch.segment,
        &batch.field_name,
    ));

    let params = BuildParameters::new(
        batch.field_name,
        batch.segment,
        batch.dimension,
        batch
            .method
            .unwrap_or_else(|| MethodContext::faiss_hnsw(SpaceType::L2)),
        VectorBatch {
            doc_ids: batch.doc_ids,
            values: batch.vectors,
        },
        output.clone(),
    );

    let repositories = Arc::new(
        RepositoryRegistry::from_config(&config.repositories)
            .expect("failed to initialize repositories"),
    );

    let remote: Arc<dyn RemoteBuilder> = if config.remote_build.endpoint.is_empty() {
        Arc::new(UnconfiguredRemoteBuilder)
    } else {
        Arc::new(
            HttpRemoteBuilder::from_config(&config.remote_build)
                .expect("failed to initialize remote build client"),
        )
    };

    let strategy = RemoteIndexBuildStrategy::new(
        repositories,
        remote,
        Arc::new(FlatIndexBuilder),
        Arc::new(LiveSettings::new(config.index_settings(index_uuid.clone()))),
    );

    tracing::info!(index_uuid = %index_uuid, ?params, "starting build");

    match strategy.build_and_write(&params).await {
        Ok(BuildOutcome::Remote { job_id, .. }) => {
            tracing::info!(job_id = %job_id, path = %output.path().display(), "built remotely");
        }
        Ok(BuildOutcome::Local { fallback }) => {
            tracing::info!(
                path = %output.path().display(),
                fell_back = fallback.is_some(),
                "built locally"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "build failed");
            std::process::exit(1);
        }
    }
}
