//! # facefind (library root)
//!
//! Face-similarity search over precomputed face embeddings.
//!
//! Given a face embedding, facefind returns the identifiers (usually image paths) of
//! the closest previously indexed faces by squared Euclidean distance. Face
//! detection and the embedding model are external collaborators plugged in through
//! [`face::FaceEmbedder`].
//!
//! ## Pipeline
//! 1. **Offline build**: [`builder::IndexBuilder`] turns a directory of embeddings
//!    (or images, through a `FaceEmbedder`) into an [`store::EmbeddingStore`]; the
//!    store is written to disk with [`persist::save`].
//! 2. **Serving**: the artifacts are loaded once into a [`handle::IndexHandle`],
//!    which is shared with every request through a [`query::QueryService`].
//!
//! ```rust
//! use facefind::builder::{EmbeddingOutcome, IndexBuilder};
//! use facefind::handle::IndexHandle;
//! use facefind::query::QueryService;
//!
//! # fn main() -> facefind::Result<()> {
//! let mut builder = IndexBuilder::new();
//! builder.push("faces/alice.jpg", EmbeddingOutcome::Embedded(vec![0.9, 0.1]));
//! builder.push("faces/blurry.jpg", EmbeddingOutcome::NoFace);
//! builder.push("faces/bob.jpg", EmbeddingOutcome::Embedded(vec![0.1, 0.9]));
//! let (store, report) = builder.finish();
//! assert_eq!(report.skipped.len(), 1);
//!
//! let service = QueryService::new(IndexHandle::from(store));
//! assert_eq!(service.query(&[1.0, 0.0], 1)?, vec!["faces/alice.jpg".to_string()]);
//! # Ok(()) }
//! ```
//!
//! ## Modules
//! - [`store`], [`metric`], [`index`]: the embedding collection and exact search.
//! - [`builder`], [`persist`]: offline construction and on-disk artifacts.
//! - [`handle`], [`query`], [`face`]: serving side.
//! - [`commands`], [`config`]: CLI surface and YAML configuration.

use directories::ProjectDirs;
use std::error::Error;

pub mod builder;
pub mod commands;
pub mod config;
pub mod error;
pub mod face;
pub mod handle;
pub mod index;
pub mod metric;
pub mod persist;
pub mod query;
pub mod store;

pub use error::{FaceIndexError, Result};

/// Return the per-platform configuration directory used by facefind.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "facefind", "facefind")`, so you get the right place on each OS
/// (e.g., `~/.config/facefind` on Linux).
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> std::result::Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "facefind", "facefind")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
