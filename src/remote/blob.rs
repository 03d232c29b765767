//! Binary layout of the staged vector and doc-id blobs.
//!
//! Vector blob: vectors back to back in doc order. float32 components are
//! little-endian, byte components are signed 8-bit, binary vectors are
//! already packed. Doc-id blob: one little-endian `i32` per document.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::remote::path::StorageLocation;
use crate::storage::BlobStore;
use crate::types::{VectorBatch, VectorValues};

pub fn encode_vectors(values: &VectorValues) -> Bytes {
    match values {
        VectorValues::Float(vectors) => {
            let total: usize = vectors.iter().map(|v| v.len() * 4).sum();
            let mut buf = BytesMut::with_capacity(total);
            for v in vectors {
                for x in v {
                    buf.put_f32_le(*x);
                }
            }
            buf.freeze()
        }
        VectorValues::Byte(vectors) => {
            let mut buf = BytesMut::with_capacity(vectors.iter().map(Vec::len).sum());
            for v in vectors {
                for x in v {
                    buf.put_i8(*x);
                }
            }
            buf.freeze()
        }
        VectorValues::Binary(vectors) => Bytes::from(vectors.concat()),
    }
}

pub fn encode_doc_ids(doc_ids: &[i32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(doc_ids.len() * 4);
    for id in doc_ids {
        buf.put_i32_le(*id);
    }
    buf.freeze()
}

/// Write both blobs for a build. Returns the number of bytes uploaded.
#[instrument(skip(store, batch), fields(stem = %location.stem))]
pub async fn upload_batch(
    store: &BlobStore,
    location: &StorageLocation,
    batch: &VectorBatch,
) -> Result<u64> {
    let vectors = encode_vectors(&batch.values);
    let doc_ids = encode_doc_ids(&batch.doc_ids);
    let total = (vectors.len() + doc_ids.len()) as u64;

    store.put(&location.vector_path(), vectors).await?;
    store.put(&location.doc_id_path(), doc_ids).await?;

    debug!(bytes = total, docs = batch.doc_ids.len(), "uploaded vector blobs");
    Ok(total)
}
