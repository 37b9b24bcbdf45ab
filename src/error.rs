//! Error types for facefind operations.
//!
//! Structural problems (`DimensionMismatch`, `OutOfRange`) are caller bugs and are
//! surfaced immediately. "No data" situations (an empty index, a query image
//! without a face) are *not* errors and never show up here: they produce empty
//! results instead.
use thiserror::Error;

/// The main error type for the index, builder, persistence and query layers.
#[derive(Error, Debug)]
pub enum FaceIndexError {
    /// An embedding of the wrong length was inserted or used as a query.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed for the store
        expected: usize,
        /// Length of the offending vector
        actual: usize,
    },

    /// An embedding component is NaN or infinite.
    #[error("embedding component {component} is not finite")]
    NonFinite {
        /// Position of the first offending component
        component: usize,
    },

    /// Slot lookup past the end of the store.
    #[error("slot {slot} out of range for store of size {size}")]
    OutOfRange {
        /// Requested slot
        slot: usize,
        /// Current store size
        size: usize,
    },

    /// A search was requested with `k == 0`.
    #[error("k must be greater than zero")]
    InvalidK,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode index: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode index: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The index file was written by an incompatible format version.
    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The index file decoded but its contents are inconsistent.
    #[error("corrupt index file: {reason}")]
    Corrupt { reason: String },

    /// The identifier list does not line up with the stored vectors.
    #[error("identifier list has {identifiers} entries but index holds {vectors} vectors")]
    CountMismatch { vectors: usize, identifiers: usize },

    /// The index file and identifier list do not belong to the same build.
    #[error("checksum mismatch: index records {expected}, artifacts hash to {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The external face detector / embedder failed.
    #[error("embedder error: {0}")]
    Embedder(#[from] crate::face::EmbedderError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FaceIndexError>;
