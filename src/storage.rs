use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use tracing::{debug, instrument};

use crate::config::{RepositoryConfig, RepositoryType};
use crate::error::{Result, SkyhookError};

/// Thin wrapper over an `ObjectStore` keyed by plain string paths.
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlobStore({})", self.inner)
    }
}

impl BlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Build the backing store for a configured repository.
    pub fn from_repository_config(config: &RepositoryConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match config.repo_type {
            RepositoryType::S3 => {
                let bucket = required_bucket(config)?;
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
                if let Some(region) = &config.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint).with_allow_http(true);
                }
                Arc::new(builder.build()?)
            }
            RepositoryType::Gcs => {
                let bucket = required_bucket(config)?;
                Arc::new(
                    GoogleCloudStorageBuilder::from_env()
                        .with_bucket_name(bucket)
                        .build()?,
                )
            }
            RepositoryType::Azure => {
                let container = required_bucket(config)?;
                Arc::new(
                    MicrosoftAzureBuilder::from_env()
                        .with_container_name(container)
                        .build()?,
                )
            }
            RepositoryType::Local => {
                let root = config.root.as_deref().ok_or_else(|| {
                    SkyhookError::Configuration(format!(
                        "local repository '{}' needs a root directory",
                        config.name
                    ))
                })?;
                std::fs::create_dir_all(root)?;
                Arc::new(LocalFileSystem::new_with_prefix(root)?)
            }
            RepositoryType::Memory => Arc::new(InMemory::new()),
        };

        debug!(repository = %config.name, repo_type = config.repo_type.as_str(), "initialized blob store");
        Ok(Self::new(inner))
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Path::parse(key)?;
        self.inner.put(&path, data.into()).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = Path::parse(key)?;
        match self.inner.get(&path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(SkyhookError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn head(&self, key: &str) -> Result<ObjectMeta> {
        let path = Path::parse(key)?;
        match self.inner.head(&path).await {
            Ok(meta) => Ok(meta),
            Err(object_store::Error::NotFound { .. }) => Err(SkyhookError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(SkyhookError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let path = Path::parse(key)?;
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn required_bucket(config: &RepositoryConfig) -> Result<&str> {
    config.bucket.as_deref().ok_or_else(|| {
        SkyhookError::Configuration(format!(
            "{} repository '{}' needs a bucket",
            config.repo_type.as_str(),
            config.name
        ))
    })
}
