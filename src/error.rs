use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyhookError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    // Repository errors
    #[error("repository not found: {name}")]
    RepositoryMissing { name: String },

    // Storage errors
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("storage path error: {0}")]
    StoragePath(#[from] object_store::path::Error),

    // Serialization errors
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode serialization error: {0}")]
    Bincode(String),

    // Remote build errors
    #[error("remote build failed: {0}")]
    RemoteBuild(String),

    #[error("remote build job {job_id} did not finish within {waited_secs}s")]
    RemoteTimeout { job_id: String, waited_secs: u64 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    // Local build errors
    #[error("local build failed: {0}")]
    LocalBuild(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    // Validation errors
    #[error("validation error: {0}")]
    Validation(String),

    // IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Box<bincode::ErrorKind>> for SkyhookError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SkyhookError::Bincode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SkyhookError>;

impl SkyhookError {
    /// Coarse error class, used as a log field and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            SkyhookError::Configuration(_)
            | SkyhookError::Toml(_)
            | SkyhookError::Validation(_) => "configuration",

            SkyhookError::RepositoryMissing { .. } => "repository_missing",

            SkyhookError::NotFound { .. }
            | SkyhookError::Storage(_)
            | SkyhookError::StoragePath(_)
            | SkyhookError::Io(_) => "storage_io",

            SkyhookError::RemoteBuild(_)
            | SkyhookError::RemoteTimeout { .. }
            | SkyhookError::Http(_)
            | SkyhookError::Json(_) => "remote_build",

            SkyhookError::LocalBuild(_)
            | SkyhookError::ChecksumMismatch { .. }
            | SkyhookError::Bincode(_) => "local_build",
        }
    }

    /// Collapse any error into `LocalBuild`, keeping the message.
    pub fn into_local_build(self) -> Self {
        match self {
            e @ SkyhookError::LocalBuild(_) => e,
            other => SkyhookError::LocalBuild(other.to_string()),
        }
    }
}
