use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use skyhook::config::{Config, RepositoryType, DEFAULT_SIZE_THRESHOLD_BYTES};
use skyhook::error::SkyhookError;
use skyhook::remote::should_build_remotely;
use skyhook::repository::{Repositories, RepositoryMetadata, RepositoryRegistry};

const SAMPLE: &str = r#"
[cluster]
name = "prod-east"

[remote_build]
vector_repo = "vectors"
endpoint = "http://builder.internal:1025"
poll_interval_secs = 2

[index]
remote_build_enabled = true
size_threshold_bytes = 1024

[[repositories]]
name = "vectors"
type = "s3"
bucket = "knn-staging"
base_path = "vectors/1_1_25"
region = "us-east-1"

[[repositories]]
name = "scratch"
type = "memory"

[logging]
format = "json"
"#;

/// Tests that touch process env or call `Config::load` hold this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets env vars for one test and removes them on drop, panics included.
struct EnvGuard {
    keys: Vec<&'static str>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        Self {
            keys: vars.iter().map(|(k, _)| *k).collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

fn sample_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.cluster.name, "skyhook");
    assert!(config.remote_build.vector_repo.is_empty());
    assert_eq!(config.remote_build.poll_interval_secs, 5);
    assert_eq!(config.remote_build.timeout_secs, 3600);
    assert!(!config.index.remote_build_enabled);
    assert_eq!(config.index.size_threshold_bytes, DEFAULT_SIZE_THRESHOLD_BYTES);
    assert_eq!(config.logging.level, "info");
    assert!(config.repositories.is_empty());
}

#[test]
fn test_default_config_never_offloads() {
    let settings = Config::default().index_settings("uuid");
    assert!(!should_build_remotely(Some(&settings), u64::MAX));
}

#[test]
fn test_parse_toml() {
    let config = Config::from_toml(SAMPLE).unwrap();
    assert_eq!(config.cluster.name, "prod-east");
    assert_eq!(config.remote_build.endpoint, "http://builder.internal:1025");
    assert_eq!(config.remote_build.poll_interval_secs, 2);
    // Unset fields keep their defaults.
    assert_eq!(config.remote_build.timeout_secs, 3600);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "json");

    assert_eq!(config.repositories.len(), 2);
    assert_eq!(config.repositories[0].repo_type, RepositoryType::S3);
    assert_eq!(config.repositories[0].bucket.as_deref(), Some("knn-staging"));
    assert_eq!(config.repositories[1].repo_type, RepositoryType::Memory);
}

#[test]
fn test_index_settings_snapshot() {
    let config = Config::from_toml(SAMPLE).unwrap();
    let settings = config.index_settings("abc123");
    assert_eq!(settings.index_uuid, "abc123");
    assert!(settings.remote_build_enabled);
    assert_eq!(settings.size_threshold_bytes, 1024);
    assert_eq!(settings.vector_repo, "vectors");
    assert_eq!(settings.tenant_id, "prod-east");

    assert!(!should_build_remotely(Some(&settings), 1023));
    assert!(should_build_remotely(Some(&settings), 1024));
}

#[test]
fn test_repository_metadata_from_config() {
    let config = Config::from_toml(SAMPLE).unwrap();
    let metadata = RepositoryMetadata::from_config(&config.repositories[0]);
    assert_eq!(metadata.repository_type().unwrap(), "s3");
    assert_eq!(metadata.container_name().unwrap(), "knn-staging");
    // The base path belongs to the repository, not its wire metadata.
    assert!(!metadata.settings.contains_key("base_path"));

    let scratch = RepositoryMetadata::from_config(&config.repositories[1]);
    assert!(matches!(
        scratch.container_name(),
        Err(SkyhookError::Configuration(_))
    ));
}

#[test]
fn test_registry_from_config_memory_and_local() {
    let dir = tempfile::TempDir::new().unwrap();
    let raw = format!(
        r#"
[[repositories]]
name = "scratch"
type = "memory"

[[repositories]]
name = "disk"
type = "local"
root = "{}"
base_path = "staging"
"#,
        dir.path().join("repo").display()
    );
    let config = Config::from_toml(&raw).unwrap();
    let registry = RepositoryRegistry::from_config(&config.repositories).unwrap();
    assert_eq!(registry.len(), 2);

    let disk = registry.resolve("disk").unwrap();
    assert_eq!(disk.base_path(), "staging");
    assert_eq!(disk.metadata().repository_type().unwrap(), "local");
    assert!(dir.path().join("repo").is_dir());

    assert!(matches!(
        registry.resolve("nope"),
        Err(SkyhookError::RepositoryMissing { .. })
    ));
}

#[test]
fn test_local_repository_needs_root() {
    let config = Config::from_toml(
        r#"
[[repositories]]
name = "disk"
type = "local"
"#,
    )
    .unwrap();
    let err = RepositoryRegistry::from_config(&config.repositories).unwrap_err();
    assert!(matches!(err, SkyhookError::Configuration(_)), "got {err}");
}

#[test]
fn test_validate_rejects_duplicates_and_zero_intervals() {
    let mut config = Config::from_toml(SAMPLE).unwrap();
    config.repositories[1].name = "vectors".to_string();
    assert!(matches!(
        config.validate(),
        Err(SkyhookError::Configuration(_))
    ));

    let mut config = Config::from_toml(SAMPLE).unwrap();
    config.remote_build.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_repository_type_rejected() {
    let err = Config::from_toml(
        r#"
[[repositories]]
name = "x"
type = "ftp"
"#,
    )
    .unwrap_err();
    assert_eq!(err.kind(), "configuration");
}

#[test]
fn test_fs_is_an_alias_for_local() {
    let config = Config::from_toml(
        r#"
[[repositories]]
name = "disk"
type = "fs"
root = "/tmp/skyhook"
"#,
    )
    .unwrap();
    assert_eq!(config.repositories[0].repo_type, RepositoryType::Local);
}

// ─── Loading and env overrides ───

#[test]
fn test_load_from_file() {
    let _env = EnvGuard::set(&[]);
    let file = sample_file();

    let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.repositories.len(), 2);
}

#[test]
fn test_load_from_config_env_var() {
    let file = sample_file();
    let _env = EnvGuard::set(&[("SKYHOOK_CONFIG", file.path().to_str().unwrap())]);

    let config = Config::load(None).unwrap();
    assert_eq!(config.cluster.name, "prod-east");
    assert_eq!(config.repositories.len(), 2);
}

#[test]
fn test_explicit_path_wins_over_config_env_var() {
    let file = sample_file();
    let _env = EnvGuard::set(&[("SKYHOOK_CONFIG", "/definitely/not/here.toml")]);

    let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.cluster.name, "prod-east");
}

#[test]
fn test_string_overrides_replace_file_values() {
    let file = sample_file();
    let _env = EnvGuard::set(&[
        ("SKYHOOK_CLUSTER_NAME", "prod-west"),
        ("SKYHOOK_VECTOR_REPO", "scratch"),
        ("SKYHOOK_LOG_LEVEL", "debug"),
    ]);

    let config = Config::load(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.cluster.name, "prod-west");
    assert_eq!(config.remote_build.vector_repo, "scratch");
    assert_eq!(config.logging.level, "debug");
    // Untouched values still come from the file.
    assert_eq!(config.remote_build.endpoint, "http://builder.internal:1025");
}

#[test]
fn test_parsed_overrides_apply() {
    let _env = EnvGuard::set(&[
        ("SKYHOOK_VECTOR_REPO", "vectors"),
        ("SKYHOOK_REMOTE_BUILD_ENABLED", "true"),
        ("SKYHOOK_SIZE_THRESHOLD_BYTES", "4096"),
        ("SKYHOOK_REMOTE_TIMEOUT_SECS", " 120 "),
    ]);

    let config = Config::load(None).unwrap();
    assert!(config.index.remote_build_enabled);
    assert_eq!(config.index.size_threshold_bytes, 4096);
    assert_eq!(config.remote_build.timeout_secs, 120);

    let settings = config.index_settings("uuid");
    assert!(should_build_remotely(Some(&settings), 4096));
    assert!(!should_build_remotely(Some(&settings), 4095));
}

#[test]
fn test_unparseable_override_fails_load() {
    let _env = EnvGuard::set(&[("SKYHOOK_REMOTE_BUILD_ENABLED", "1")]);

    match Config::load(None) {
        Err(SkyhookError::Configuration(msg)) => {
            assert!(msg.contains("SKYHOOK_REMOTE_BUILD_ENABLED"), "{msg}");
            assert!(msg.contains("'1'"), "{msg}");
        }
        other => panic!("expected Configuration error, got {other:?}"),
    }
}

#[test]
fn test_zero_override_fails_validation() {
    let _env = EnvGuard::set(&[("SKYHOOK_REMOTE_POLL_INTERVAL_SECS", "0")]);
    assert!(matches!(
        Config::load(None),
        Err(SkyhookError::Configuration(_))
    ));
}

#[test]
fn test_load_missing_file() {
    let _env = EnvGuard::set(&[]);
    let err = Config::load(Some("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, SkyhookError::Configuration(_)));
}
