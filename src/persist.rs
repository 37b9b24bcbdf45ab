//! Persistence of a built index.
//!
//! An index is stored as two artifacts that always travel together:
//!
//! - the **index file**: bincode-encoded [`IndexManifest`] plus the row-major vector
//!   data;
//! - the **identifier list**: a JSON array of identifier strings in slot order.
//!
//! The manifest records a blake3 checksum over the dimension, the vectors and the
//! identifiers, so loading an index file next to an identifier list from a different
//! build fails with [`FaceIndexError::ChecksumMismatch`] instead of silently
//! returning the wrong faces.
//!
//! Both files are written to a `.tmp` sibling first and renamed into place.
//!
//! ```no_run
//! use std::path::Path;
//! use facefind::{persist, store::EmbeddingStore};
//!
//! # fn main() -> facefind::Result<()> {
//! let mut store = EmbeddingStore::new();
//! store.add(vec![0.1, 0.9], "faces/a.jpg")?;
//! persist::save(&store, Path::new("faces.index"), Path::new("identifiers.json"))?;
//! let loaded = persist::load(Path::new("faces.index"), Path::new("identifiers.json"))?;
//! assert_eq!(loaded, store);
//! # Ok(()) }
//! ```

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FaceIndexError, Result};
use crate::store::EmbeddingStore;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored at the head of the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    /// Vector dimensionality; 0 for an empty store with no dimension fixed.
    pub dimension: u64,
    /// Number of stored vectors.
    pub count: u64,
    /// blake3 hex digest over dimension, vectors and identifiers.
    pub checksum: String,
    /// RFC 3339 build timestamp.
    pub built_at: String,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    vectors: Vec<f32>,
}

/// Write `store` to `index_path` and its identifiers to `identifiers_path`.
///
/// # Errors
/// I/O failures, or encoding errors from bincode / serde_json.
pub fn save(store: &EmbeddingStore, index_path: &Path, identifiers_path: &Path) -> Result<IndexManifest> {
    let dimension = store.dimension().unwrap_or(0);
    let mut vectors = Vec::with_capacity(store.size() * dimension);
    for record in store {
        vectors.extend_from_slice(&record.embedding);
    }
    let identifiers: Vec<&str> = store.identifiers().collect();

    let manifest = IndexManifest {
        version: FORMAT_VERSION,
        dimension: dimension as u64,
        count: store.size() as u64,
        checksum: checksum(dimension, &vectors, &identifiers),
        built_at: chrono::Utc::now().to_rfc3339(),
    };
    let file = IndexFile {
        manifest: manifest.clone(),
        vectors,
    };

    let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())?;
    write_atomic(index_path, &bytes)?;
    write_atomic(identifiers_path, &serde_json::to_vec_pretty(&identifiers)?)?;

    info!(
        index = %index_path.display(),
        identifiers = %identifiers_path.display(),
        count = manifest.count,
        dimension = manifest.dimension,
        "index saved"
    );
    Ok(manifest)
}

/// Load a store previously written by [`save`].
///
/// # Errors
/// - [`FaceIndexError::UnsupportedVersion`] for an unknown format version;
/// - [`FaceIndexError::Corrupt`] if the vector data does not match the manifest;
/// - [`FaceIndexError::CountMismatch`] if the identifier list has the wrong length;
/// - [`FaceIndexError::ChecksumMismatch`] if the two artifacts are from different builds;
/// - I/O and decoding errors.
pub fn load(index_path: &Path, identifiers_path: &Path) -> Result<EmbeddingStore> {
    let file = read_index_file(index_path)?;
    let manifest = &file.manifest;
    let (Ok(dimension), Ok(count)) = (
        usize::try_from(manifest.dimension),
        usize::try_from(manifest.count),
    ) else {
        return Err(FaceIndexError::Corrupt {
            reason: format!(
                "{} x {} does not fit in memory",
                manifest.count, manifest.dimension
            ),
        });
    };

    if dimension == 0 && count > 0 {
        return Err(FaceIndexError::Corrupt {
            reason: format!("{count} vectors recorded with dimension 0"),
        });
    }
    let expected = count
        .checked_mul(dimension)
        .ok_or_else(|| FaceIndexError::Corrupt {
            reason: format!("{count} x {dimension} values overflows"),
        })?;
    if file.vectors.len() != expected {
        return Err(FaceIndexError::Corrupt {
            reason: format!(
                "expected {expected} values ({count} x {dimension}), found {}",
                file.vectors.len()
            ),
        });
    }

    let identifiers: Vec<String> = serde_json::from_slice(&fs::read(identifiers_path)?)?;
    if identifiers.len() != count {
        return Err(FaceIndexError::CountMismatch {
            vectors: count,
            identifiers: identifiers.len(),
        });
    }

    let id_refs: Vec<&str> = identifiers.iter().map(String::as_str).collect();
    let actual = checksum(dimension, &file.vectors, &id_refs);
    if actual != manifest.checksum {
        return Err(FaceIndexError::ChecksumMismatch {
            expected: manifest.checksum.clone(),
            actual,
        });
    }

    let mut store = if dimension == 0 {
        EmbeddingStore::new()
    } else {
        EmbeddingStore::with_dimension(dimension)
    };
    if dimension > 0 {
        for (row, identifier) in file.vectors.chunks_exact(dimension).zip(identifiers) {
            store.add(row.to_vec(), identifier)?;
        }
    }

    debug!(count, dimension, built_at = %manifest.built_at, "index loaded");
    Ok(store)
}

/// Read only the manifest of an index file.
pub fn read_manifest(index_path: &Path) -> Result<IndexManifest> {
    Ok(read_index_file(index_path)?.manifest)
}

fn read_index_file(index_path: &Path) -> Result<IndexFile> {
    let bytes = fs::read(index_path)?;
    let (file, _): (IndexFile, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
    if file.manifest.version != FORMAT_VERSION {
        return Err(FaceIndexError::UnsupportedVersion {
            found: file.manifest.version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(file)
}

fn checksum(dimension: usize, vectors: &[f32], identifiers: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(dimension as u64).to_le_bytes());
    for v in vectors {
        hasher.update(&v.to_le_bytes());
    }
    for id in identifiers {
        hasher.update(&(id.len() as u64).to_le_bytes());
        hasher.update(id.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_store() -> EmbeddingStore {
        let mut store = EmbeddingStore::new();
        store.add(vec![0.1, -2.5, 3.75], "faces/a.jpg").unwrap();
        store.add(vec![f32::MIN_POSITIVE, 1e-7, -0.0], "faces/b.jpg").unwrap();
        store.add(vec![42.0, 0.333_333_34, -1.0], "faces/c.jpg").unwrap();
        store
    }

    fn paths(dir: &TempDir) -> (PathBuf, PathBuf) {
        (
            dir.path().join("faces.index"),
            dir.path().join("identifiers.json"),
        )
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        let store = sample_store();

        let manifest = save(&store, &idx, &ids).unwrap();
        assert_eq!(manifest.count, 3);
        assert_eq!(manifest.dimension, 3);

        let loaded = load(&idx, &ids).unwrap();
        assert_eq!(loaded.size(), store.size());
        assert_eq!(loaded.dimension(), Some(3));
        for (a, b) in loaded.iter().zip(store.iter()) {
            assert_eq!(a.identifier, b.identifier);
            let a_bits: Vec<u32> = a.embedding.iter().map(|x| x.to_bits()).collect();
            let b_bits: Vec<u32> = b.embedding.iter().map(|x| x.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
        assert!(!dir.path().join("faces.index.tmp").exists());
    }

    #[test]
    fn test_identifier_list_is_plain_json() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        save(&sample_store(), &idx, &ids).unwrap();

        let raw: Vec<String> = serde_json::from_slice(&fs::read(&ids).unwrap()).unwrap();
        assert_eq!(raw, vec!["faces/a.jpg", "faces/b.jpg", "faces/c.jpg"]);
    }

    #[test]
    fn test_empty_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        save(&EmbeddingStore::new(), &idx, &ids).unwrap();
        let loaded = load(&idx, &ids).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.dimension(), None);
    }

    #[test]
    fn test_count_mismatch_detected() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        save(&sample_store(), &idx, &ids).unwrap();
        fs::write(&ids, r#"["faces/a.jpg", "faces/b.jpg"]"#).unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::CountMismatch {
                vectors: 3,
                identifiers: 2
            })
        ));
    }

    #[test]
    fn test_foreign_identifier_list_detected() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        save(&sample_store(), &idx, &ids).unwrap();
        fs::write(&ids, r#"["x.jpg", "y.jpg", "z.jpg"]"#).unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_index_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        fs::write(&idx, b"\x01").unwrap();
        fs::write(&ids, "[]").unwrap();
        assert!(load(&idx, &ids).is_err());
    }

    fn write_raw(path: &Path, version: u32, dimension: u64, count: u64, vectors: Vec<f32>) {
        let file = IndexFile {
            manifest: IndexManifest {
                version,
                dimension,
                count,
                checksum: String::new(),
                built_at: String::new(),
            },
            vectors,
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        write_raw(&idx, 2, 1, 1, vec![1.0]);
        fs::write(&ids, r#"["a.jpg"]"#).unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::UnsupportedVersion {
                found: 2,
                expected: FORMAT_VERSION
            })
        ));
        assert!(matches!(
            read_manifest(&idx),
            Err(FaceIndexError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn test_short_vector_data_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        write_raw(&idx, FORMAT_VERSION, 3, 2, vec![1.0, 2.0, 3.0, 4.0]);
        fs::write(&ids, r#"["a.jpg", "b.jpg"]"#).unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_overflowing_manifest_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        write_raw(&idx, FORMAT_VERSION, 1 << 33, 1 << 33, Vec::new());
        fs::write(&ids, "[]").unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_count_without_dimension_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        write_raw(&idx, FORMAT_VERSION, 0, 4, Vec::new());
        fs::write(&ids, "[]").unwrap();

        assert!(matches!(
            load(&idx, &ids),
            Err(FaceIndexError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_read_manifest() {
        let dir = TempDir::new().unwrap();
        let (idx, ids) = paths(&dir);
        let saved = save(&sample_store(), &idx, &ids).unwrap();
        let read = read_manifest(&idx).unwrap();
        assert_eq!(read, saved);
        assert!(chrono::DateTime::parse_from_rfc3339(&read.built_at).is_ok());
    }
}
