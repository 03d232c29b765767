//! Named object-storage repositories that vectors are staged in.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RepositoryConfig;
use crate::error::{Result, SkyhookError};
use crate::storage::BlobStore;

pub const BUCKET_SETTING: &str = "bucket";

/// Describes a repository the way the remote builder needs to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub name: String,
    /// Repository type as sent on the wire (`s3`, `gcs`, ...).
    pub repo_type: String,
    pub settings: HashMap<String, String>,
}

impl RepositoryMetadata {
    pub fn new(
        name: impl Into<String>,
        repo_type: impl Into<String>,
        settings: HashMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            repo_type: repo_type.into(),
            settings,
        }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        let mut settings = config.settings.clone();
        if let Some(container) = config.bucket.as_ref().or(config.root.as_ref()) {
            settings.insert(BUCKET_SETTING.to_string(), container.clone());
        }
        if let Some(region) = &config.region {
            settings.insert("region".to_string(), region.clone());
        }
        Self::new(config.name.clone(), config.repo_type.as_str(), settings)
    }

    pub fn repository_type(&self) -> Result<&str> {
        if self.repo_type.is_empty() {
            return Err(SkyhookError::Configuration(format!(
                "repository '{}' has no type",
                self.name
            )));
        }
        Ok(&self.repo_type)
    }

    pub fn container_name(&self) -> Result<&str> {
        match self.settings.get(BUCKET_SETTING) {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(SkyhookError::Configuration(format!(
                "repository '{}' has no container name",
                self.name
            ))),
        }
    }
}

/// A resolved repository: its metadata plus a handle to its blobs.
#[derive(Debug, Clone)]
pub struct Repository {
    metadata: RepositoryMetadata,
    base_path: String,
    store: BlobStore,
}

impl Repository {
    pub fn new(metadata: RepositoryMetadata, base_path: impl Into<String>, store: BlobStore) -> Self {
        Self {
            metadata,
            base_path: base_path.into(),
            store,
        }
    }

    pub fn from_config(config: &RepositoryConfig) -> Result<Self> {
        let store = BlobStore::from_repository_config(config)?;
        Ok(Self::new(
            RepositoryMetadata::from_config(config),
            config.base_path.clone(),
            store,
        ))
    }

    pub fn metadata(&self) -> &RepositoryMetadata {
        &self.metadata
    }

    /// Key prefix every blob of this repository lives under. May be empty.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }
}

/// Lookup of repositories by name.
pub trait Repositories: Send + Sync {
    /// Fails with `RepositoryMissing` when nothing is registered under `name`.
    fn resolve(&self, name: &str) -> Result<Repository>;
}

/// In-process registry of configured repositories.
#[derive(Debug, Default)]
pub struct RepositoryRegistry {
    repositories: DashMap<String, Repository>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[RepositoryConfig]) -> Result<Self> {
        let registry = Self::new();
        for config in configs {
            registry.register(Repository::from_config(config)?);
        }
        info!(count = registry.len(), "registered repositories");
        Ok(registry)
    }

    /// Add or replace a repository under its metadata name.
    pub fn register(&self, repository: Repository) {
        self.repositories
            .insert(repository.metadata().name.clone(), repository);
    }

    pub fn remove(&self, name: &str) -> Option<Repository> {
        self.repositories.remove(name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl Repositories for RepositoryRegistry {
    fn resolve(&self, name: &str) -> Result<Repository> {
        self.repositories
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| SkyhookError::RepositoryMissing {
                name: name.to_string(),
            })
    }
}
