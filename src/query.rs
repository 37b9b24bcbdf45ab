//! # QueryService
//!
//! Request-facing wrapper around an [`IndexHandle`].
//!
//! A query is either a face embedding computed upstream, or raw image bytes handed to
//! a [`FaceEmbedder`]. The service returns the identifiers of the closest indexed
//! faces, best match first.
//!
//! Two "nothing found" outcomes are kept apart:
//!
//! - the detector saw no face: [`QueryOutcome::NoFaceDetected`], the index is never
//!   touched;
//! - a face was embedded but the index is empty: [`QueryOutcome::Matches`] with an
//!   empty list.
//!
//! ```rust
//! use facefind::{handle::IndexHandle, query::QueryService, store::EmbeddingStore};
//!
//! # fn main() -> facefind::Result<()> {
//! let mut store = EmbeddingStore::new();
//! store.add(vec![0.0, 1.0], "faces/a.jpg")?;
//! store.add(vec![1.0, 0.0], "faces/b.jpg")?;
//!
//! let service = QueryService::new(IndexHandle::from(store));
//! assert_eq!(service.query(&[0.9, 0.1], 1)?, vec!["faces/b.jpg".to_string()]);
//! # Ok(()) }
//! ```

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::face::FaceEmbedder;
use crate::handle::IndexHandle;

/// Number of matches returned when the caller does not ask for a specific `k`.
pub const DEFAULT_K: usize = 5;

/// One match with its distance, for callers that want more than identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub identifier: String,
    /// Squared L2 distance to the query.
    pub distance: f32,
    pub slot: usize,
}

/// Result of an image query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The detector found no face; the index was not searched.
    NoFaceDetected,
    /// Identifiers of the closest faces, best first. May be empty.
    Matches(Vec<String>),
}

impl QueryOutcome {
    /// Collapse both outcomes into a plain identifier list.
    pub fn into_matches(self) -> Vec<String> {
        match self {
            QueryOutcome::NoFaceDetected => Vec::new(),
            QueryOutcome::Matches(m) => m,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryService {
    index: IndexHandle,
    default_k: usize,
}

impl QueryService {
    pub fn new(index: IndexHandle) -> Self {
        Self {
            index,
            default_k: DEFAULT_K,
        }
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Identifiers of the `k` faces closest to `embedding`, best first.
    ///
    /// # Errors
    /// `InvalidK` for `k == 0`, `DimensionMismatch` for a query of the wrong length.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<String>> {
        Ok(self
            .index
            .search(embedding, k)?
            .into_iter()
            .map(|n| n.identifier().to_string())
            .collect())
    }

    /// Same as [`QueryService::query`] with the configured default `k`.
    pub fn query_default(&self, embedding: &[f32]) -> Result<Vec<String>> {
        self.query(embedding, self.default_k)
    }

    /// Like [`QueryService::query`] but keeps distances and slots.
    pub fn query_with_distances(&self, embedding: &[f32], k: usize) -> Result<Vec<Match>> {
        Ok(self
            .index
            .search(embedding, k)?
            .into_iter()
            .map(|n| Match {
                identifier: n.identifier().to_string(),
                distance: n.distance,
                slot: n.slot,
            })
            .collect())
    }

    /// Detect, embed and search a raw image.
    ///
    /// # Errors
    /// Collaborator failures, plus everything [`QueryService::query`] can return.
    pub fn query_image<E: FaceEmbedder>(
        &self,
        image: &[u8],
        embedder: &E,
        k: usize,
    ) -> Result<QueryOutcome> {
        let Some(face) = embedder.detect_face(image)? else {
            debug!(bytes = image.len(), "no face detected in query image");
            return Ok(QueryOutcome::NoFaceDetected);
        };
        let embedding = embedder.embed(&face)?;
        Ok(QueryOutcome::Matches(self.query(&embedding, k)?))
    }

    /// Answer many queries in parallel against the same index; output keeps input order.
    pub fn query_batch<Q>(&self, queries: &[Q], k: usize) -> Result<Vec<Vec<String>>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        queries
            .par_iter()
            .map(|q| self.query(q.as_ref(), k))
            .collect()
    }
}
