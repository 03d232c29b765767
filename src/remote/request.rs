use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhookError};
use crate::remote::path::StorageLocation;
use crate::repository::RepositoryMetadata;
use crate::settings::IndexSettings;
use crate::types::{BuildParameters, SpaceType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParameters {
    pub space_type: SpaceType,
    pub algorithm: String,
    pub algorithm_parameters: BTreeMap<String, serde_json::Value>,
}

/// Payload sent to the remote build service. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBuildRequest {
    repository_type: String,
    container_name: String,
    engine: String,
    vector_data_type: String,
    vector_path: String,
    doc_id_path: String,
    tenant_id: String,
    doc_count: u64,
    dimension: u32,
    index_parameters: IndexParameters,
}

impl RemoteBuildRequest {
    pub fn repository_type(&self) -> &str {
        &self.repository_type
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn vector_data_type(&self) -> &str {
        &self.vector_data_type
    }

    pub fn vector_path(&self) -> &str {
        &self.vector_path
    }

    pub fn doc_id_path(&self) -> &str {
        &self.doc_id_path
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn index_parameters(&self) -> &IndexParameters {
        &self.index_parameters
    }
}

/// Assemble the remote build request. Does no I/O.
///
/// # Errors
/// Returns `SkyhookError::Configuration` if the repository has no type or
/// container, the engine cannot build remotely, or the dimension is unusable.
pub fn compose_request(
    index_settings: &IndexSettings,
    params: &BuildParameters,
    repository: &RepositoryMetadata,
    location: &StorageLocation,
) -> Result<RemoteBuildRequest> {
    let repository_type = repository.repository_type()?.to_string();
    let container_name = repository.container_name()?.to_string();

    let method = &params.method;
    if !method.engine.supports_remote_build() {
        return Err(SkyhookError::Configuration(format!(
            "engine '{}' does not support remote index build",
            method.engine
        )));
    }

    let dimension = u32::try_from(params.dimension)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| {
            SkyhookError::Configuration(format!("invalid dimension: {}", params.dimension))
        })?;

    Ok(RemoteBuildRequest {
        repository_type,
        container_name,
        engine: method.engine.name().to_string(),
        vector_data_type: params.vector_data_type().as_str().to_string(),
        vector_path: location.vector_path(),
        doc_id_path: location.doc_id_path(),
        tenant_id: index_settings.tenant_id.clone(),
        doc_count: params.doc_count() as u64,
        dimension,
        index_parameters: IndexParameters {
            space_type: method.space_type,
            algorithm: method.method_name.clone(),
            algorithm_parameters: method.parameters.clone(),
        },
    })
}
