//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `FaceFindConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a file.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use facefind::config::{FaceFindConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: FaceFindConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::PathBuf};

use tracing::*;

use crate::query::DEFAULT_K;

/// Represents the application's configuration.
///
/// Holds where the persisted index artifacts live and how queries behave. It can be
/// constructed by loading a YAML configuration file using the `load_config` function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct FaceFindConfig {
    /// Path of the bincode index file.
    pub index_path: PathBuf,

    /// Path of the JSON identifier list that accompanies the index file.
    pub identifiers_path: PathBuf,

    // Number of matches returned when a query does not specify k.
    #[serde(default = "default_k")]
    pub default_k: usize,

    // Expected embedding length; enforced at build time when set.
    #[serde(default)]
    pub dimension: Option<usize>,
}

fn default_k() -> usize {
    DEFAULT_K
}

impl FaceFindConfig {
    /// Default configuration with both artifacts stored under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            index_path: dir.join("faces.index"),
            identifiers_path: dir.join("identifiers.json"),
            default_k: DEFAULT_K,
            dimension: None,
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// This function reads the file at the given path, parses it as YAML, and
/// constructs a `FaceFindConfig` struct from it.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(FaceFindConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: &str) -> Result<FaceFindConfig, Box<dyn Error>> {
    debug!("Loading config from: {:?}", file);
    let content = fs::read_to_string(file)?;
    let config: FaceFindConfig = serde_yaml::from_str(&content)?;
    if config.default_k == 0 {
        return Err("default_k must be greater than zero".into());
    }
    if config.dimension == Some(0) {
        return Err("dimension must be greater than zero".into());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
index_path: "/var/lib/facefind/faces.index"
identifiers_path: "/var/lib/facefind/identifiers.json"
default_k: 10
dimension: 512
"#
        )
        .unwrap();

        let config = load_config(temp_file.path().to_str().unwrap());

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(
            config.index_path,
            PathBuf::from("/var/lib/facefind/faces.index")
        );
        assert_eq!(
            config.identifiers_path,
            PathBuf::from("/var/lib/facefind/identifiers.json")
        );
        assert_eq!(config.default_k, 10);
        assert_eq!(config.dimension, Some(512));
    }

    #[test]
    fn test_load_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
index_path: "faces.index"
identifiers_path: "identifiers.json"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.default_k, 5);
        assert_eq!(config.dimension, None);
    }

    #[test]
    fn test_load_config_zero_k_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "index_path: a\nidentifiers_path: b\ndefault_k: 0\n"
        )
        .unwrap();
        assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_load_config_zero_dimension_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            "index_path: a\nidentifiers_path: b\ndimension: 0\n"
        )
        .unwrap();
        assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_load_config_invalid_file() {
        let config = load_config("non/existent/path");
        assert!(config.is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap());
        assert!(config.is_err());
    }

    #[test]
    fn test_in_dir_round_trips_through_yaml() {
        let config = FaceFindConfig::in_dir("/tmp/ff");
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: FaceFindConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
