use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use skyhook::error::{Result, SkyhookError};
use skyhook::local::FallbackBuilder;
use skyhook::remote::{RemoteBuildRequest, RemoteBuildResult, RemoteBuilder};
use skyhook::repository::{Repositories, Repository};
use skyhook::storage::BlobStore;
use skyhook::types::{BuildParameters, IndexOutput};

pub const LOCAL_INDEX_BYTES: &[u8] = b"local-index";
pub const REMOTE_INDEX_BYTES: &[u8] = b"remote-index";

/// Captures whatever index gets written.
#[derive(Default)]
pub struct MemoryOutput {
    writes: Mutex<Vec<Bytes>>,
}

impl MemoryOutput {
    pub fn writes(&self) -> Vec<Bytes> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexOutput for MemoryOutput {
    async fn write_index(&self, data: Bytes) -> Result<()> {
        self.writes.lock().unwrap().push(data);
        Ok(())
    }
}

/// Output whose first write fails; later writes are captured.
#[derive(Default)]
pub struct FailFirstWriteOutput {
    attempts: AtomicUsize,
    writes: Mutex<Vec<Bytes>>,
}

impl FailFirstWriteOutput {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Bytes> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexOutput for FailFirstWriteOutput {
    async fn write_index(&self, data: Bytes) -> Result<()> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SkyhookError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.writes.lock().unwrap().push(data);
        Ok(())
    }
}

/// Fallback builder that counts calls and writes a marker index.
#[derive(Default)]
pub struct RecordingFallback {
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingFallback {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackBuilder for RecordingFallback {
    async fn build_and_write(&self, params: &BuildParameters) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SkyhookError::Validation("local builder exploded".into()));
        }
        params
            .output
            .write_index(Bytes::from_static(LOCAL_INDEX_BYTES))
            .await
    }
}

/// Registry with a single repository (or none) that counts lookups.
pub struct CountingRepositories {
    repository: Option<Repository>,
    calls: AtomicUsize,
}

impl CountingRepositories {
    pub fn with(repository: Repository) -> Self {
        Self {
            repository: Some(repository),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            repository: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Repositories for CountingRepositories {
    fn resolve(&self, name: &str) -> Result<Repository> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.repository
            .clone()
            .ok_or_else(|| SkyhookError::RepositoryMissing {
                name: name.to_string(),
            })
    }
}

pub enum RemoteBehavior {
    /// Write `REMOTE_INDEX_BYTES` next to the staged vectors and report it.
    Succeed(BlobStore),
    /// Report completion of a file that was never written.
    SucceedWithoutFile,
    Fail,
    TimeOut,
}

/// Stand-in for the remote build service.
pub struct ScriptedRemote {
    behavior: RemoteBehavior,
    requests: Mutex<Vec<RemoteBuildRequest>>,
}

impl ScriptedRemote {
    pub fn new(behavior: RemoteBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RemoteBuildRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// `.../{stem}.vec` -> (`.../{stem}.faiss`, `{stem}.faiss`)
fn built_index_key(vector_path: &str) -> (String, String) {
    let stem_key = vector_path.trim_end_matches(".vec");
    let file_name = format!("{}.faiss", stem_key.rsplit('/').next().unwrap());
    (format!("{stem_key}.faiss"), file_name)
}

#[async_trait]
impl RemoteBuilder for ScriptedRemote {
    async fn build(&self, request: &RemoteBuildRequest) -> Result<RemoteBuildResult> {
        self.requests.lock().unwrap().push(request.clone());
        let (key, file_name) = built_index_key(request.vector_path());
        match &self.behavior {
            RemoteBehavior::Succeed(store) => {
                store.put(&key, Bytes::from_static(REMOTE_INDEX_BYTES)).await?;
                Ok(RemoteBuildResult {
                    job_id: "job-1".to_string(),
                    file_name,
                })
            }
            RemoteBehavior::SucceedWithoutFile => Ok(RemoteBuildResult {
                job_id: "job-1".to_string(),
                file_name,
            }),
            RemoteBehavior::Fail => Err(SkyhookError::RemoteBuild("gpu on fire".into())),
            RemoteBehavior::TimeOut => Err(SkyhookError::RemoteTimeout {
                job_id: "job-1".to_string(),
                waited_secs: 3600,
            }),
        }
    }
}
