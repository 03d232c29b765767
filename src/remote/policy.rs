use tracing::trace;

use crate::settings::IndexSettings;

/// Decide whether a build of `candidate_size_bytes` should be offloaded.
///
/// Each rule short-circuits: no settings, remote build disabled, no vector
/// repository, or a build below the size threshold all keep the build local.
pub fn should_build_remotely(settings: Option<&IndexSettings>, candidate_size_bytes: u64) -> bool {
    let Some(settings) = settings else {
        trace!("no index settings, building locally");
        return false;
    };

    if !settings.remote_build_enabled {
        trace!(index_uuid = %settings.index_uuid, "remote build disabled for index");
        return false;
    }

    if settings.vector_repo.trim().is_empty() {
        trace!(index_uuid = %settings.index_uuid, "no vector repository configured");
        return false;
    }

    if candidate_size_bytes < settings.size_threshold_bytes {
        trace!(
            index_uuid = %settings.index_uuid,
            candidate_size_bytes,
            threshold = settings.size_threshold_bytes,
            "build below remote size threshold"
        );
        return false;
    }

    true
}
