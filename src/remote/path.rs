//! Storage layout for staged vectors.
//!
//! One build writes two blobs that share a stem:
//!
//! ```text
//! {base_path}/{index_uuid}_vectors/{token}_{field}_{segment}.vec
//! {base_path}/{index_uuid}_vectors/{token}_{field}_{segment}.did
//! ```
//!
//! The build token is drawn fresh for every attempt; it is the only thing
//! keeping concurrent builds of the same field and segment apart.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const VECTORS_DIR_SUFFIX: &str = "_vectors";
pub const VECTOR_BLOB_EXTENSION: &str = ".vec";
pub const DOC_ID_BLOB_EXTENSION: &str = ".did";

/// Random bytes in a build token (128 bits).
const BUILD_TOKEN_BYTES: usize = 16;

/// Generate a 22-character URL-safe build token with 128 bits of entropy.
pub fn new_build_token() -> String {
    let mut raw = [0u8; BUILD_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Where one build's vectors and doc ids are staged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    /// Directory prefix, always ending in `/`.
    pub prefix: String,
    /// Object name shared by both blobs, without extension.
    pub stem: String,
}

impl StorageLocation {
    /// Full key of the stem, e.g. `vectors/1_1_25/{uuid}_vectors/{token}_field__3l`.
    pub fn key(&self) -> String {
        format!("{}{}", self.prefix, self.stem)
    }

    pub fn vector_path(&self) -> String {
        format!("{}{VECTOR_BLOB_EXTENSION}", self.key())
    }

    pub fn doc_id_path(&self) -> String {
        format!("{}{DOC_ID_BLOB_EXTENSION}", self.key())
    }

    /// Key of a file the remote builder produced next to the staged blobs.
    pub fn sibling(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name.trim_start_matches('/'))
    }
}

/// Compute the storage location for one build attempt. Pure.
pub fn build_storage_location(
    base_path: &str,
    index_uuid: &str,
    build_token: &str,
    field_name: &str,
    segment: &str,
) -> StorageLocation {
    let base = base_path.trim_matches('/');
    let prefix = if base.is_empty() {
        format!("{index_uuid}{VECTORS_DIR_SUFFIX}/")
    } else {
        format!("{base}/{index_uuid}{VECTORS_DIR_SUFFIX}/")
    };

    StorageLocation {
        prefix,
        stem: format!("{build_token}_{field_name}_{segment}"),
    }
}
