use std::collections::HashMap;
use std::sync::Arc;

use skyhook::repository::{Repository, RepositoryMetadata, BUCKET_SETTING};
use skyhook::settings::IndexSettings;
use skyhook::storage::BlobStore;
use skyhook::types::{BuildParameters, IndexOutput, MethodContext, SpaceType, VectorBatch};

use super::vectors::tiny_float_batch;

pub const TEST_INDEX_UUID: &str = "SIRKos4rOWlMA62PX2p75m";
pub const TEST_REPO: &str = "test-vector-repo";
pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_CLUSTER: &str = "test-cluster";
pub const TEST_BASE_PATH: &str = "vectors/1_1_25";
pub const TEST_FIELD: &str = "target_field";
pub const TEST_SEGMENT: &str = "_3l";

/// Settings under which any build of at least `threshold` bytes goes remote.
pub fn remote_settings(threshold: u64) -> IndexSettings {
    IndexSettings {
        index_uuid: TEST_INDEX_UUID.to_string(),
        remote_build_enabled: true,
        size_threshold_bytes: threshold,
        vector_repo: TEST_REPO.to_string(),
        tenant_id: TEST_CLUSTER.to_string(),
    }
}

pub fn s3_metadata() -> RepositoryMetadata {
    let mut settings = HashMap::new();
    settings.insert(BUCKET_SETTING.to_string(), TEST_BUCKET.to_string());
    RepositoryMetadata::new(TEST_REPO, "s3", settings)
}

pub fn s3_repository(store: BlobStore) -> Repository {
    Repository::new(s3_metadata(), TEST_BASE_PATH, store)
}

pub fn params_with(batch: VectorBatch, dimension: usize, output: Arc<dyn IndexOutput>) -> BuildParameters {
    BuildParameters::new(
        TEST_FIELD,
        TEST_SEGMENT,
        dimension,
        MethodContext::faiss_hnsw(SpaceType::L2),
        batch,
        output,
    )
}

/// Three docs, dimension 2, float32: 24 bytes of vectors.
pub fn tiny_params(output: Arc<dyn IndexOutput>) -> BuildParameters {
    params_with(tiny_float_batch(), 2, output)
}
