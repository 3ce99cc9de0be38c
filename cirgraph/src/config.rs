//! Configuration
//!
//! JSON file with serde defaults for every field, so a partial file (or
//! `{}`) is valid. Mutation settings are range-checked while parsing.
//!
//! ```json
//! {
//!   "simulator": { "executable": "/usr/local/bin/ltspice", "work_dir": "NetLists" },
//!   "mutation": { "sigma": 0.1, "p_mutate": 0.1 },
//!   "seed": 42
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::circuit::MutationParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(target_os = "macos")]
const DEFAULT_EXECUTABLE: &str = "/Applications/LTspice.app/Contents/MacOS/LTspice";
#[cfg(target_os = "windows")]
const DEFAULT_EXECUTABLE: &str = r"C:\Program Files\ADI\LTspice\LTspice.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_EXECUTABLE: &str = "ltspice";

/// Where the simulator lives and where its scratch files go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub executable: PathBuf,
    /// Root of the per-circuit `Circuit{id}/` directories
    pub work_dir: PathBuf,
    /// Keep the `.log` after decoding
    pub keep_artifacts: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            work_dir: PathBuf::from("NetLists"),
            keep_artifacts: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirGraphConfig {
    pub simulator: SimulatorConfig,
    pub mutation: MutationParams,
    /// Seed for reproducible mutation runs
    pub seed: Option<u64>,
}

impl CirGraphConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// [`load`](Self::load) when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cirgraph.json");
        std::fs::write(&path, r#"{"simulator": {"keep_artifacts": true}, "seed": 7}"#).unwrap();

        let config = CirGraphConfig::load(&path).unwrap();
        assert!(config.simulator.keep_artifacts);
        assert_eq!(config.simulator.work_dir, PathBuf::from("NetLists"));
        assert_eq!(config.mutation, MutationParams::default());
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_invalid_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = CirGraphConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let garbled = dir.path().join("garbled.json");
        std::fs::write(&garbled, "{ not json").unwrap();
        assert!(matches!(CirGraphConfig::load(&garbled), Err(ConfigError::Parse { .. })));

        let bad_sigma = dir.path().join("sigma.json");
        std::fs::write(&bad_sigma, r#"{"mutation": {"sigma": -1.0, "p_mutate": 0.5}}"#).unwrap();
        assert!(matches!(CirGraphConfig::load(&bad_sigma), Err(ConfigError::Parse { .. })));

        let bad_probability = dir.path().join("probability.json");
        std::fs::write(&bad_probability, r#"{"mutation": {"p_mutate": 1.5}}"#).unwrap();
        let err = CirGraphConfig::load(&bad_probability).unwrap_err();
        assert!(err.to_string().contains("p_mutate"));
    }

    #[test]
    fn test_default_without_path() {
        assert_eq!(CirGraphConfig::load_or_default(None).unwrap(), CirGraphConfig::default());
    }
}
