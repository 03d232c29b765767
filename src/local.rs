//! Local index builders, used when a build is not offloaded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Result, SkyhookError};
use crate::remote::blob::encode_vectors;
use crate::types::{BuildParameters, IndexOutput, VectorDataType};

/// File extension of indexes written by [`DirectoryOutput`].
pub const INDEX_FILE_EXTENSION: &str = "skidx";

/// A strategy that builds the index in-process and writes it out.
#[async_trait]
pub trait FallbackBuilder: Send + Sync {
    async fn build_and_write(&self, params: &BuildParameters) -> Result<()>;
}

/// Serialized flat (exhaustive-scan) index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    pub field_name: String,
    pub dimension: usize,
    pub data_type: VectorDataType,
    pub doc_ids: Vec<i32>,
    /// Vectors in the same layout as the staged vector blob.
    pub vectors: Vec<u8>,
    /// xxh3 of `vectors`.
    pub checksum: u64,
}

impl FlatIndex {
    pub fn from_params(params: &BuildParameters) -> Self {
        let vectors = encode_vectors(&params.batch.values).to_vec();
        Self {
            field_name: params.field_name.clone(),
            dimension: params.dimension,
            data_type: params.vector_data_type(),
            doc_ids: params.batch.doc_ids.clone(),
            checksum: xxh3_64(&vectors),
            vectors,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let index: Self = bincode::deserialize(data)?;
        let actual = xxh3_64(&index.vectors);
        if actual != index.checksum {
            return Err(SkyhookError::ChecksumMismatch {
                expected: index.checksum,
                actual,
            });
        }
        Ok(index)
    }
}

/// Builds a [`FlatIndex`] and writes it to the build's output.
#[derive(Debug, Default, Clone)]
pub struct FlatIndexBuilder;

#[async_trait]
impl FallbackBuilder for FlatIndexBuilder {
    #[instrument(skip(self, params), fields(field = %params.field_name, segment = %params.segment))]
    async fn build_and_write(&self, params: &BuildParameters) -> Result<()> {
        params.validate().map_err(SkyhookError::into_local_build)?;
        let data = FlatIndex::from_params(params).to_bytes()?;
        debug!(bytes = data.len(), docs = params.doc_count(), "built flat index");
        params.output.write_index(data).await
    }
}

/// Writes `{segment}_{field}.skidx` into a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    path: PathBuf,
}

impl DirectoryOutput {
    pub fn new(dir: impl AsRef<Path>, segment: &str, field_name: &str) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(format!("{segment}_{field_name}.{INDEX_FILE_EXTENSION}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl IndexOutput for DirectoryOutput {
    async fn write_index(&self, data: Bytes) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &data).await?;
        debug!(path = %self.path.display(), bytes = data.len(), "wrote index file");
        Ok(())
    }
}
