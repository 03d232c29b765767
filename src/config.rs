use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhookError};
use crate::settings::IndexSettings;

/// 50 MiB. Smaller builds stay local.
pub const DEFAULT_SIZE_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub remote_build: RemoteBuildConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name, sent as the tenant id on remote build requests.
    #[serde(default = "default_cluster_name")]
    pub name: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
        }
    }
}

fn default_cluster_name() -> String {
    "skyhook".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBuildConfig {
    /// Repository that vectors are staged in. Empty disables remote builds.
    #[serde(default)]
    pub vector_repo: String,
    /// Base URL of the remote build service.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteBuildConfig {
    fn default() -> Self {
        Self {
            vector_repo: String::new(),
            endpoint: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteBuildConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    60 * 60
}

/// Defaults applied to every index unless overridden per index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub remote_build_enabled: bool,
    #[serde(default = "default_size_threshold_bytes")]
    pub size_threshold_bytes: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            remote_build_enabled: false,
            size_threshold_bytes: default_size_threshold_bytes(),
        }
    }
}

fn default_size_threshold_bytes() -> u64 {
    DEFAULT_SIZE_THRESHOLD_BYTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryType {
    S3,
    Gcs,
    Azure,
    #[serde(alias = "fs")]
    Local,
    Memory,
}

impl RepositoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryType::S3 => "s3",
            RepositoryType::Gcs => "gcs",
            RepositoryType::Azure => "azure",
            RepositoryType::Local => "local",
            RepositoryType::Memory => "memory",
        }
    }
}

/// One configured object-storage repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub repo_type: RepositoryType,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Root directory for `local` repositories.
    #[serde(default)]
    pub root: Option<String>,
    /// Engine-specific settings passed through untouched.
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load config from a TOML file (explicit path, then `SKYHOOK_CONFIG`),
    /// falling back to defaults, then apply `SKYHOOK_*` env overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("SKYHOOK_CONFIG").ok());

        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(&p).map_err(|e| {
                    SkyhookError::Configuration(format!("failed to read {p}: {e}"))
                })?;
                Self::from_toml(&raw)?
            }
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("SKYHOOK_CLUSTER_NAME") {
            self.cluster.name = v;
        }
        if let Ok(v) = std::env::var("SKYHOOK_VECTOR_REPO") {
            self.remote_build.vector_repo = v;
        }
        if let Ok(v) = std::env::var("SKYHOOK_REMOTE_ENDPOINT") {
            self.remote_build.endpoint = v;
        }
        if let Some(v) = env_parse("SKYHOOK_REMOTE_POLL_INTERVAL_SECS")? {
            self.remote_build.poll_interval_secs = v;
        }
        if let Some(v) = env_parse("SKYHOOK_REMOTE_TIMEOUT_SECS")? {
            self.remote_build.timeout_secs = v;
        }
        if let Some(v) = env_parse("SKYHOOK_REMOTE_BUILD_ENABLED")? {
            self.index.remote_build_enabled = v;
        }
        if let Some(v) = env_parse("SKYHOOK_SIZE_THRESHOLD_BYTES")? {
            self.index.size_threshold_bytes = v;
        }
        if let Ok(v) = std::env::var("SKYHOOK_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("SKYHOOK_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote_build.poll_interval_secs == 0 {
            return Err(SkyhookError::Configuration(
                "remote_build.poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.remote_build.timeout_secs == 0 {
            return Err(SkyhookError::Configuration(
                "remote_build.timeout_secs must be greater than zero".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for repo in &self.repositories {
            if !seen.insert(repo.name.as_str()) {
                return Err(SkyhookError::Configuration(format!(
                    "duplicate repository name: {}",
                    repo.name
                )));
            }
        }
        Ok(())
    }

    /// Snapshot of the settings that govern builds for one index.
    pub fn index_settings(&self, index_uuid: impl Into<String>) -> IndexSettings {
        IndexSettings {
            index_uuid: index_uuid.into(),
            remote_build_enabled: self.index.remote_build_enabled,
            size_threshold_bytes: self.index.size_threshold_bytes,
            vector_repo: self.remote_build.vector_repo.clone(),
            tenant_id: self.cluster.name.clone(),
        }
    }
}

/// Runs before logging is set up, so a bad value is an error, not a warning.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim().parse().map(Some).map_err(|e| {
        SkyhookError::Configuration(format!("invalid value for {key}: '{raw}' ({e})"))
    })
}
