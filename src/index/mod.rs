
use tracing::debug;

use crate::{RagError, Result};

/// A nearest neighbor hit: squared Euclidean distance plus the row index of
/// the matching vector in the matrix the index was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub index: usize,
}

/// Flat exhaustive-search index over one embedding matrix snapshot.
///
/// Immutable after construction: a changed matrix requires a new index. Flat
/// search is the right trade-off here, corpora are thousands of chunks, not
/// millions.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorIndex {
    /// Build an index owning the given matrix. Fails on an empty matrix or
    /// ragged rows.
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = match vectors.first() {
            Some(first) => first.len(),
            None => {
                return Err(RagError::Index(
                    "Cannot build an index over an empty embedding matrix".to_string(),
                ));
            }
        };

        if let Some(row) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(RagError::Index(format!(
                "Embedding matrix is ragged: row {row} has {} dimensions, expected {dimension}",
                vectors[row].len()
            )));
        }

        debug!(
            "Built flat index over {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self { vectors, dimension })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return up to `k` nearest neighbors by squared Euclidean distance,
    /// nearest first. `k` is clamped to the number of indexed vectors.
    #[inline]
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, row)| Neighbor {
                distance: squared_l2(vector, row),
                index,
            })
            .collect();

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        neighbors
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
