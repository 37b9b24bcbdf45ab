//! # IndexBuilder
//!
//! Offline, deterministic construction of an [`EmbeddingStore`].
//!
//! The builder consumes `(identifier, outcome)` pairs in order. An outcome is the
//! result of running the external face pipeline on one source:
//!
//! - [`EmbeddingOutcome::Embedded`]: inserted into the next slot;
//! - [`EmbeddingOutcome::NoFace`] / [`EmbeddingOutcome::Failed`]: skipped.
//!
//! Skips (including embeddings whose length disagrees with the store) are logged and
//! collected in a [`BuildReport`]; they never abort the batch.
//!
//! Two directory front-ends are provided:
//!
//! - [`IndexBuilder::from_embeddings_dir`] reads precomputed embedding files
//!   (`*.json` arrays or raw little-endian `*.f32`);
//! - [`IndexBuilder::from_images_dir`] runs every file through a [`FaceEmbedder`].
//!
//! Directory entries are processed in sorted file-name order so that rebuilding from
//! the same directory yields a slot-for-slot identical store.
//!
//! ```no_run
//! use facefind::builder::IndexBuilder;
//!
//! # fn main() -> facefind::Result<()> {
//! let (store, report) = IndexBuilder::new().from_embeddings_dir("embeddings/")?;
//! println!("indexed {} faces, skipped {}", store.size(), report.skipped.len());
//! # Ok(()) }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{FaceIndexError, Result};
use crate::face::FaceEmbedder;
use crate::store::EmbeddingStore;

/// Result of the external face pipeline for one source.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    Embedded(Vec<f32>),
    /// The detector found no face in the source.
    NoFace,
    /// Reading or embedding the source failed.
    Failed(String),
}

impl From<Option<Vec<f32>>> for EmbeddingOutcome {
    fn from(value: Option<Vec<f32>>) -> Self {
        match value {
            Some(v) => EmbeddingOutcome::Embedded(v),
            None => EmbeddingOutcome::NoFace,
        }
    }
}

/// Why a source did not make it into the store.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    #[error("no face detected")]
    NoFace,
    #[error("embedding failed: {0}")]
    Failed(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding component {component} is not finite")]
    NonFinite { component: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSource {
    pub identifier: String,
    pub reason: SkipReason,
}

/// Aggregate outcome of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    /// Number of records inserted.
    pub inserted: usize,
    /// Sources that were skipped, in input order.
    pub skipped: Vec<SkippedSource>,
}

/// Incremental, order-preserving store builder.
pub struct IndexBuilder {
    store: EmbeddingStore,
    report: BuildReport,
    progress: ProgressBar,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::from_store(EmbeddingStore::new())
    }

    /// Builder whose store only accepts `dimension`-long embeddings.
    pub fn with_dimension(dimension: usize) -> Self {
        Self::from_store(EmbeddingStore::with_dimension(dimension))
    }

    fn from_store(store: EmbeddingStore) -> Self {
        Self {
            store,
            report: BuildReport::default(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report directory-build progress on `progress` (hidden by default).
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Feed one source into the builder.
    pub fn push(&mut self, identifier: impl Into<String>, outcome: EmbeddingOutcome) {
        let identifier = identifier.into();
        let reason = match outcome {
            EmbeddingOutcome::Embedded(embedding) => {
                match self.store.add(embedding, identifier.as_str()) {
                    Ok(slot) => {
                        debug!(slot, identifier = %identifier, "indexed face");
                        self.report.inserted += 1;
                        return;
                    }
                    Err(FaceIndexError::DimensionMismatch { expected, actual }) => {
                        SkipReason::DimensionMismatch { expected, actual }
                    }
                    Err(FaceIndexError::NonFinite { component }) => {
                        SkipReason::NonFinite { component }
                    }
                    Err(e) => SkipReason::Failed(e.to_string()),
                }
            }
            EmbeddingOutcome::NoFace => SkipReason::NoFace,
            EmbeddingOutcome::Failed(msg) => SkipReason::Failed(msg),
        };

        warn!(identifier = %identifier, %reason, "skipping source");
        self.report.skipped.push(SkippedSource { identifier, reason });
    }

    pub fn extend<I, S>(&mut self, sources: I)
    where
        I: IntoIterator<Item = (S, EmbeddingOutcome)>,
        S: Into<String>,
    {
        for (identifier, outcome) in sources {
            self.push(identifier, outcome);
        }
    }

    /// Consume the builder, returning the populated store and the build report.
    pub fn finish(self) -> (EmbeddingStore, BuildReport) {
        info!(
            inserted = self.report.inserted,
            skipped = self.report.skipped.len(),
            "index build finished"
        );
        (self.store, self.report)
    }

    /// Build from a directory of precomputed embedding files.
    ///
    /// Files with extension `json` or `f32` are read with [`read_embedding_file`];
    /// other entries are ignored. Unreadable or malformed files are reported as
    /// skipped.
    ///
    /// # Errors
    /// Only if the directory itself cannot be listed.
    pub fn from_embeddings_dir(
        mut self,
        dir: impl AsRef<Path>,
    ) -> Result<(EmbeddingStore, BuildReport)> {
        let paths: Vec<PathBuf> = sorted_files(dir.as_ref())?
            .into_iter()
            .filter(|p| is_embedding_file(p))
            .collect();
        info!(dir = %dir.as_ref().display(), files = paths.len(), "building from embedding files");

        let outcomes = self.run(&paths, |path| match read_embedding_file(path) {
            Ok(v) => v.into(),
            Err(e) => EmbeddingOutcome::Failed(e.to_string()),
        });
        self.extend(outcomes);
        Ok(self.finish())
    }

    /// Build from a directory of raw images through an external face pipeline.
    ///
    /// Every regular file is read and passed to [`FaceEmbedder::detect_face`]; images
    /// without a face are skipped, detected faces are embedded with
    /// [`FaceEmbedder::embed`].
    ///
    /// # Errors
    /// Only if the directory itself cannot be listed.
    pub fn from_images_dir<E: FaceEmbedder>(
        mut self,
        dir: impl AsRef<Path>,
        embedder: &E,
    ) -> Result<(EmbeddingStore, BuildReport)> {
        let paths = sorted_files(dir.as_ref())?;
        info!(dir = %dir.as_ref().display(), files = paths.len(), "building from images");

        let outcomes = self.run(&paths, |path| embed_image(path, embedder));
        self.extend(outcomes);
        Ok(self.finish())
    }

    /// Evaluate `f` for every path in parallel; output keeps the input order.
    fn run<F>(&self, paths: &[PathBuf], f: F) -> Vec<(String, EmbeddingOutcome)>
    where
        F: Fn(&Path) -> EmbeddingOutcome + Send + Sync,
    {
        self.progress.set_length(paths.len() as u64);
        let outcomes = paths
            .par_iter()
            .progress_with(self.progress.clone())
            .map(|p| (p.display().to_string(), f(p.as_path())))
            .collect();
        self.progress.finish_and_clear();
        outcomes
    }
}

fn embed_image<E: FaceEmbedder>(path: &Path, embedder: &E) -> EmbeddingOutcome {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => return EmbeddingOutcome::Failed(e.to_string()),
    };
    match embedder.detect_face(&bytes) {
        Ok(Some(face)) => match embedder.embed(&face) {
            Ok(v) => EmbeddingOutcome::Embedded(v),
            Err(e) => EmbeddingOutcome::Failed(e.to_string()),
        },
        Ok(None) => EmbeddingOutcome::NoFace,
        Err(e) => EmbeddingOutcome::Failed(e.to_string()),
    }
}

/// Regular files directly under `dir`, sorted by file name.
fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn is_embedding_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("f32")
    )
}

/// Read a single precomputed embedding.
///
/// - `*.f32`: raw little-endian `f32` values; an empty file means "no face".
/// - anything else: a JSON array of numbers, or `null` / `[]` for "no face".
///
/// # Returns
/// `Ok(None)` when the file records that no face was found.
///
/// # Errors
/// I/O failures, malformed JSON, or an `.f32` file whose length is not a multiple of 4.
pub fn read_embedding_file(path: &Path) -> Result<Option<Vec<f32>>> {
    let bytes = fs::read(path)?;
    let embedding = if path.extension().and_then(|e| e.to_str()) == Some("f32") {
        if bytes.len() % 4 != 0 {
            return Err(FaceIndexError::Corrupt {
                reason: format!(
                    "{}: {} bytes is not a whole number of f32 values",
                    path.display(),
                    bytes.len()
                ),
            });
        }
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    } else {
        serde_json::from_slice::<Option<Vec<f32>>>(&bytes)?.unwrap_or_default()
    };

    Ok(if embedding.is_empty() { None } else { Some(embedding) })
}
