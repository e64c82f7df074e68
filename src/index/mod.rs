
use tracing::debug;

use crate::{ChatError, Result};

/// A neighbor returned from a search: the position of the vector within
/// the build-time order, plus its squared Euclidean distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// In-memory flat nearest-neighbor index over a fixed set of embeddings.
///
/// Built once from the full embedding matrix and queried many times; a new
/// document set always gets a brand new index rather than an in-place
/// update. Search is an exhaustive scan ranked by squared L2 distance,
/// which keeps the ordering identical to true Euclidean distance.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Build the index from the complete embedding matrix. Rejects an
    /// empty matrix and any disagreement in vector dimensions.
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(ChatError::Index(
                "cannot build an index over zero vectors".to_string(),
            ));
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(ChatError::Index(
                "cannot build an index over zero-dimension vectors".to_string(),
            ));
        }

        if let Some((position, bad)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != dimension)
        {
            return Err(ChatError::Index(format!(
                "vector {} has dimension {} but the index dimension is {}",
                position,
                bad.len(),
                dimension
            )));
        }

        debug!(
            "Built flat index over {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self { dimension, vectors })
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

    /// Return up to `top_k` nearest neighbors to `query`, nearest first.
    /// `top_k` is clamped to the number of stored vectors. Ordering among
    /// exact distance ties follows insertion order and is not guaranteed.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        if self.vectors.is_empty() {
            return Err(ChatError::Index(
                "cannot search an index with zero vectors".to_string(),
            ));
        }

        if query.len() != self.dimension {
            return Err(ChatError::Index(format!(
                "query has dimension {} but the index dimension is {}",
                query.len(),
                self.dimension
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(top_k.min(self.vectors.len()));

        Ok(neighbors)
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
