use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhookError};

/// Storage type of the vector components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorDataType {
    #[default]
    #[serde(rename = "float32")]
    Float,
    Byte,
    Binary,
}

impl VectorDataType {
    /// Wire name of the data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorDataType::Float => "float32",
            VectorDataType::Byte => "byte",
            VectorDataType::Binary => "binary",
        }
    }

    /// Encoded size of one vector. Binary vectors pack 8 dimensions per byte.
    pub fn bytes_per_vector(&self, dimension: usize) -> usize {
        match self {
            VectorDataType::Float => dimension * std::mem::size_of::<f32>(),
            VectorDataType::Byte => dimension,
            VectorDataType::Binary => dimension / 8,
        }
    }
}

impl std::fmt::Display for VectorDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vector components for a batch, one inner vec per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum VectorValues {
    #[serde(rename = "float32")]
    Float(Vec<Vec<f32>>),
    Byte(Vec<Vec<i8>>),
    Binary(Vec<Vec<u8>>),
}

impl VectorValues {
    pub fn data_type(&self) -> VectorDataType {
        match self {
            VectorValues::Float(_) => VectorDataType::Float,
            VectorValues::Byte(_) => VectorDataType::Byte,
            VectorValues::Binary(_) => VectorDataType::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorValues::Float(v) => v.len(),
            VectorValues::Byte(v) => v.len(),
            VectorValues::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lengths of each stored vector, in document order.
    fn lengths(&self) -> Vec<usize> {
        match self {
            VectorValues::Float(v) => v.iter().map(Vec::len).collect(),
            VectorValues::Byte(v) => v.iter().map(Vec::len).collect(),
            VectorValues::Binary(v) => v.iter().map(Vec::len).collect(),
        }
    }
}

/// Vector search library an index is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Faiss,
    Lucene,
    Nmslib,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Faiss => "faiss",
            Engine::Lucene => "lucene",
            Engine::Nmslib => "nmslib",
        }
    }

    /// Only faiss graphs can be produced by the remote builder.
    pub fn supports_remote_build(&self) -> bool {
        matches!(self, Engine::Faiss)
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    #[default]
    L2,
    #[serde(rename = "innerproduct")]
    InnerProduct,
    #[serde(rename = "cosinesimil")]
    Cosine,
    Hamming,
}

/// How the index for a field is configured: engine, space, and method
/// hyper-parameters such as `m` and `ef_construction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodContext {
    pub engine: Engine,
    #[serde(default)]
    pub space_type: SpaceType,
    pub method_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl MethodContext {
    /// HNSW on faiss with the usual defaults.
    pub fn faiss_hnsw(space_type: SpaceType) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("ef_construction".to_string(), 100.into());
        parameters.insert("m".to_string(), 16.into());
        Self {
            engine: Engine::Faiss,
            space_type,
            method_name: "hnsw".to_string(),
            parameters,
        }
    }
}

/// Doc ids and their vectors, in matching order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorBatch {
    pub doc_ids: Vec<i32>,
    pub values: VectorValues,
}

/// Destination for a finished index artifact.
///
/// Both the remote path (downloaded artifact) and the local fallback write
/// through the same output, so a caller sees one file either way.
#[async_trait]
pub trait IndexOutput: Send + Sync {
    async fn write_index(&self, data: Bytes) -> Result<()>;
}

/// Everything needed to build the index for one field of one segment.
#[derive(Clone)]
pub struct BuildParameters {
    pub field_name: String,
    /// Segment generation the vectors belong to (e.g. `_3l`).
    pub segment: String,
    pub dimension: usize,
    pub method: MethodContext,
    pub batch: Arc<VectorBatch>,
    pub output: Arc<dyn IndexOutput>,
}

impl BuildParameters {
    pub fn new(
        field_name: impl Into<String>,
        segment: impl Into<String>,
        dimension: usize,
        method: MethodContext,
        batch: VectorBatch,
        output: Arc<dyn IndexOutput>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            segment: segment.into(),
            dimension,
            method,
            batch: Arc::new(batch),
            output,
        }
    }

    pub fn vector_data_type(&self) -> VectorDataType {
        self.batch.values.data_type()
    }

    pub fn doc_count(&self) -> usize {
        self.batch.doc_ids.len()
    }

    /// Estimated size of the raw vectors, used by the eligibility policy.
    pub fn candidate_size_bytes(&self) -> u64 {
        let per_vector = self.vector_data_type().bytes_per_vector(self.dimension) as u64;
        per_vector * self.doc_count() as u64
    }

    /// Check that doc ids and vectors line up and every vector has the
    /// expected encoded length.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(SkyhookError::Validation(
                "dimension must be greater than zero".into(),
            ));
        }
        let data_type = self.vector_data_type();
        if data_type == VectorDataType::Binary && self.dimension % 8 != 0 {
            return Err(SkyhookError::Validation(format!(
                "binary vectors need a dimension divisible by 8, got {}",
                self.dimension
            )));
        }
        if self.batch.values.len() != self.doc_count() {
            return Err(SkyhookError::Validation(format!(
                "{} doc ids but {} vectors",
                self.doc_count(),
                self.batch.values.len()
            )));
        }

        let expected = match data_type {
            VectorDataType::Binary => self.dimension / 8,
            _ => self.dimension,
        };
        if let Some((i, actual)) = self
            .batch
            .values
            .lengths()
            .into_iter()
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(SkyhookError::Validation(format!(
                "vector {i} has length {actual}, expected {expected}"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BuildParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildParameters")
            .field("field_name", &self.field_name)
            .field("segment", &self.segment)
            .field("dimension", &self.dimension)
            .field("engine", &self.method.engine)
            .field("data_type", &self.vector_data_type())
            .field("doc_count", &self.doc_count())
            .finish_non_exhaustive()
    }
}
