//! # NearestNeighborIndex
//!
//! Exact top-k search over an [`EmbeddingStore`] by squared Euclidean distance.
//!
//! Every query scans the whole store (O(N·D)), keeps the `k` best candidates with a
//! partial select and sorts only those. Results are ranked by ascending distance and,
//! for equal distances, by ascending slot, so the output is fully deterministic.
//!
//! Large stores are scanned with rayon; the parallel scan produces exactly the same
//! ranking as the sequential one since every candidate carries its slot.
//!
//! The index is read-only once built and is `Send + Sync`; share it through an
//! [`IndexHandle`](crate::handle::IndexHandle) rather than cloning it.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{FaceIndexError, Result};
use crate::metric::squared_l2;
use crate::store::{EmbeddingStore, FaceRecord};

/// Stores at or above this size are scanned in parallel.
pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// One search hit: the matching record, its slot and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub slot: usize,
    /// Squared L2 distance to the query.
    pub distance: f32,
    pub record: &'a FaceRecord,
}

impl<'a> Neighbor<'a> {
    pub fn identifier(&self) -> &'a str {
        &self.record.identifier
    }
}

/// Flat, exhaustive nearest-neighbor index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestNeighborIndex {
    store: EmbeddingStore,
}

impl NearestNeighborIndex {
    pub fn new(store: EmbeddingStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn into_store(self) -> EmbeddingStore {
        self.store
    }

    pub fn len(&self) -> usize {
        self.store.size()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.store.dimension()
    }

    /// Return the `k` stored faces closest to `query`.
    ///
    /// # Returns
    /// `min(k, len())` neighbors sorted by non-decreasing distance, ties broken by
    /// ascending slot. An empty index yields an empty vector.
    ///
    /// # Errors
    /// - [`FaceIndexError::InvalidK`] if `k == 0`.
    /// - [`FaceIndexError::DimensionMismatch`] if the index is non-empty and
    ///   `query.len()` differs from its dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>> {
        if k == 0 {
            return Err(FaceIndexError::InvalidK);
        }
        if self.store.is_empty() {
            debug!("search against empty index, returning no neighbors");
            return Ok(Vec::new());
        }

        let expected = self.store.dimension().unwrap_or(query.len());
        if query.len() != expected {
            return Err(FaceIndexError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }

        let records = self.store.records();
        let mut scored: Vec<(f32, usize)> = if records.len() >= PARALLEL_SCAN_THRESHOLD {
            records
                .par_iter()
                .enumerate()
                .map(|(slot, r)| (squared_l2(query, &r.embedding), slot))
                .collect()
        } else {
            records
                .iter()
                .enumerate()
                .map(|(slot, r)| (squared_l2(query, &r.embedding), slot))
                .collect()
        };

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);

        Ok(scored
            .into_iter()
            .map(|(distance, slot)| Neighbor {
                slot,
                distance,
                record: &records[slot],
            })
            .collect())
    }
}

impl From<EmbeddingStore> for NearestNeighborIndex {
    fn from(store: EmbeddingStore) -> Self {
        Self::new(store)
    }
}

/// Distance ascending, then slot ascending. NaN of either sign ranks after every number.
fn rank(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    worst_if_nan(a.0)
        .total_cmp(&worst_if_nan(b.0))
        .then(a.1.cmp(&b.1))
}

fn worst_if_nan(distance: f32) -> f32 {
    if distance.is_nan() { f32::INFINITY } else { distance }
}
