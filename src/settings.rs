//! Per-index build settings and the provider the orchestrator reads them from.
//!
//! Settings can change at any time (an operator toggles remote builds, or
//! points the cluster at a different repository). The orchestrator takes one
//! snapshot at the start of each build and uses only that snapshot until the
//! build finishes.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Read-only view of everything the eligibility policy and request composer
/// need about one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub index_uuid: String,
    pub remote_build_enabled: bool,
    /// Builds smaller than this stay local.
    pub size_threshold_bytes: u64,
    /// Cluster-level vector repository name. Empty means unset.
    pub vector_repo: String,
    /// Owning cluster, sent as the tenant id.
    pub tenant_id: String,
}

pub trait SettingsProvider: Send + Sync {
    /// Current settings, or `None` when the index has no settings context.
    fn snapshot(&self) -> Option<IndexSettings>;
}

/// Settings that can be swapped out while builds are running.
#[derive(Debug, Default)]
pub struct LiveSettings {
    current: RwLock<Option<IndexSettings>>,
}

impl LiveSettings {
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            current: RwLock::new(Some(settings)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the settings. Builds already running keep their snapshot.
    pub fn update(&self, settings: Option<IndexSettings>) {
        let mut guard = match self.current.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
    }
}

impl SettingsProvider for LiveSettings {
    fn snapshot(&self) -> Option<IndexSettings> {
        match self.current.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
