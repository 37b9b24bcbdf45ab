//! # EmbeddingStore
//!
//! Append-only collection of face embeddings, one [`FaceRecord`] per slot.
//!
//! A slot is the zero-based insertion position of a record. Each record carries both
//! the embedding and the identifier of the face it came from (usually a file path),
//! so the vector data and the identifier list can never drift out of step: there is a
//! single push per insertion, and a rejected insertion leaves the store untouched.
//!
//! The dimensionality `D` is either fixed up front with
//! [`EmbeddingStore::with_dimension`] or taken from the first successful
//! [`EmbeddingStore::add`]. Every later embedding must have exactly `D` components.
//!
//! ## Quick Example
//! ```rust
//! use facefind::store::EmbeddingStore;
//!
//! # fn main() -> facefind::Result<()> {
//! let mut store = EmbeddingStore::new();
//! store.add(vec![0.1, 0.2, 0.3], "faces/alice.jpg")?;
//! store.add(vec![0.3, 0.2, 0.1], "faces/bob.jpg")?;
//! assert_eq!(store.size(), 2);
//! assert_eq!(store.get(1)?.identifier, "faces/bob.jpg");
//! # Ok(()) }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{FaceIndexError, Result};

/// One indexed face: its embedding plus the identifier of its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    /// Fixed-length embedding produced by the external embedding model.
    pub embedding: Vec<f32>,
    /// Opaque source identifier (e.g. the image path).
    pub identifier: String,
}

impl FaceRecord {
    pub fn new(embedding: Vec<f32>, identifier: impl Into<String>) -> Self {
        Self {
            embedding,
            identifier: identifier.into(),
        }
    }
}

/// Ordered, append-only embedding collection addressed by slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingStore {
    /// `None` until fixed explicitly or by the first insertion.
    dimension: Option<usize>,
    records: Vec<FaceRecord>,
}

impl EmbeddingStore {
    /// Create an empty store whose dimensionality will be fixed by the first `add`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the dimensionality fixed to `dimension`.
    ///
    /// A `dimension` of 0 leaves it unset, as with [`EmbeddingStore::new`].
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: (dimension > 0).then_some(dimension),
            records: Vec::new(),
        }
    }

    /// Append an embedding and its identifier as a single record.
    ///
    /// # Returns
    /// The slot assigned to the new record (equal to the previous `size()`).
    ///
    /// # Errors
    /// [`FaceIndexError::DimensionMismatch`] if `embedding.len()` differs from the
    /// store's dimension, or if the embedding is empty.
    /// [`FaceIndexError::NonFinite`] if any component is NaN or infinite.
    /// In both cases the store is left unchanged.
    pub fn add(&mut self, embedding: Vec<f32>, identifier: impl Into<String>) -> Result<usize> {
        let expected = self.dimension.unwrap_or(embedding.len());
        if embedding.is_empty() || embedding.len() != expected {
            return Err(FaceIndexError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        if let Some(component) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(FaceIndexError::NonFinite { component });
        }
        self.dimension = Some(expected);

        let slot = self.records.len();
        self.records.push(FaceRecord::new(embedding, identifier));
        Ok(slot)
    }

    /// Number of stored records.
    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The fixed dimensionality, if one has been established.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Look up the record stored at `slot`.
    ///
    /// # Errors
    /// [`FaceIndexError::OutOfRange`] if `slot >= size()`.
    pub fn get(&self, slot: usize) -> Result<&FaceRecord> {
        self.records.get(slot).ok_or(FaceIndexError::OutOfRange {
            slot,
            size: self.records.len(),
        })
    }

    /// Records in slot order.
    pub fn iter(&self) -> std::slice::Iter<'_, FaceRecord> {
        self.records.iter()
    }

    /// Identifiers in slot order; always yields exactly `size()` items.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.identifier.as_str())
    }

    pub(crate) fn records(&self) -> &[FaceRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a EmbeddingStore {
    type Item = &'a FaceRecord;
    type IntoIter = std::slice::Iter<'a, FaceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_identity() {
        let mut store = EmbeddingStore::new();
        let inputs = [
            (vec![1.0, 2.0], "a.jpg"),
            (vec![3.0, 4.0], "b.jpg"),
            (vec![5.0, 6.0], "c.jpg"),
        ];
        for (i, (v, id)) in inputs.iter().enumerate() {
            let slot = store.add(v.clone(), *id).unwrap();
            assert_eq!(slot, i);
        }

        assert_eq!(store.size(), 3);
        for (i, (v, id)) in inputs.iter().enumerate() {
            let rec = store.get(i).unwrap();
            assert_eq!(&rec.embedding, v);
            assert_eq!(rec.identifier, *id);
        }
        let ids: Vec<&str> = store.identifiers().collect();
        assert_eq!(ids, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_first_insert_fixes_dimension() {
        let mut store = EmbeddingStore::new();
        assert_eq!(store.dimension(), None);
        store.add(vec![0.0; 4], "x").unwrap();
        assert_eq!(store.dimension(), Some(4));

        let err = store.add(vec![0.0; 3], "y").unwrap_err();
        assert!(matches!(
            err,
            FaceIndexError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_dimension_mismatch_against_fixed_512() {
        let mut store = EmbeddingStore::with_dimension(512);
        let err = store.add(vec![0.5; 128], "small.jpg").unwrap_err();
        assert!(matches!(
            err,
            FaceIndexError::DimensionMismatch {
                expected: 512,
                actual: 128
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_add_leaves_store_unchanged() {
        let mut store = EmbeddingStore::new();
        store.add(vec![1.0, 1.0], "keep").unwrap();
        let before = store.clone();

        assert!(store.add(vec![1.0, 1.0, 1.0], "drop").is_err());
        assert_eq!(store, before);
        assert_eq!(store.identifiers().count(), store.size());
    }

    #[test]
    fn test_empty_embedding_rejected() {
        let mut store = EmbeddingStore::new();
        assert!(store.add(Vec::new(), "empty").is_err());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_non_finite_embedding_rejected() {
        let mut store = EmbeddingStore::new();
        store.add(vec![1.0, 2.0], "ok").unwrap();
        let before = store.clone();

        let err = store.add(vec![1.0, -f32::NAN], "nan").unwrap_err();
        assert!(matches!(err, FaceIndexError::NonFinite { component: 1 }));
        let err = store.add(vec![f32::INFINITY, 0.0], "inf").unwrap_err();
        assert!(matches!(err, FaceIndexError::NonFinite { component: 0 }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_zero_dimension_means_unset() {
        let mut store = EmbeddingStore::with_dimension(0);
        assert_eq!(store.dimension(), None);
        store.add(vec![1.0, 2.0, 3.0], "first").unwrap();
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn test_get_out_of_range() {
        let mut store = EmbeddingStore::new();
        store.add(vec![1.0], "only").unwrap();
        let err = store.get(1).unwrap_err();
        assert!(matches!(err, FaceIndexError::OutOfRange { slot: 1, size: 1 }));
        assert!(EmbeddingStore::new().get(0).is_err());
    }
}
