use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skyhook::types::{VectorBatch, VectorValues};

/// `n` random float vectors of dimension `dims` in [-1, 1], doc ids 0..n.
pub fn random_float_batch(n: usize, dims: usize) -> VectorBatch {
    let mut rng = StdRng::seed_from_u64(42);
    VectorBatch {
        doc_ids: (0..n as i32).collect(),
        values: VectorValues::Float(
            (0..n)
                .map(|_| (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect())
                .collect(),
        ),
    }
}

/// `n` random byte vectors of dimension `dims`, doc ids 0..n.
pub fn random_byte_batch(n: usize, dims: usize) -> VectorBatch {
    let mut rng = StdRng::seed_from_u64(7);
    VectorBatch {
        doc_ids: (0..n as i32).collect(),
        values: VectorValues::Byte(
            (0..n)
                .map(|_| (0..dims).map(|_| rng.gen::<i8>()).collect())
                .collect(),
        ),
    }
}

/// Three two-dimensional float vectors with non-contiguous doc ids.
pub fn tiny_float_batch() -> VectorBatch {
    VectorBatch {
        doc_ids: vec![0, 1, 5],
        values: VectorValues::Float(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![-0.5, 0.25]]),
    }
}
