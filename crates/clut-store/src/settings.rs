//! Store configuration.
//!
//! ```yaml
//! clut_dir: /usr/share/cluts
//! cache_size: 16
//! verbose: true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// Settings of a [`crate::ClutStore`].
///
/// Missing keys take their defaults, so an empty document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base directory for relative CLUT paths.
    pub clut_dir: PathBuf,
    /// Entries kept per resource kind. Zero is treated as one.
    pub cache_size: usize,
    /// Report load failures as warnings instead of debug records.
    pub verbose: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            clut_dir: PathBuf::from("."),
            cache_size: 10,
            verbose: false,
        }
    }
}

impl StoreSettings {
    /// Loads settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    /// Parses settings from YAML text.
    pub fn from_yaml_str(yaml: &str) -> StoreResult<Self> {
        // serde_yaml rejects an empty document; treat it as all defaults
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets the base directory.
    pub fn with_clut_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.clut_dir = dir.into();
        self
    }

    /// Sets the per-kind capacity.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Sets failure verbosity.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = StoreSettings::default();
        assert_eq!(s.clut_dir, PathBuf::from("."));
        assert_eq!(s.cache_size, 10);
        assert!(!s.verbose);
    }

    #[test]
    fn test_partial_yaml() {
        let s = StoreSettings::from_yaml_str("cache_size: 3\n").unwrap();
        assert_eq!(s.cache_size, 3);
        assert_eq!(s.clut_dir, PathBuf::from("."));

        let s = StoreSettings::from_yaml_str("").unwrap();
        assert_eq!(s, StoreSettings::default());
    }

    #[test]
    fn test_full_yaml() {
        let s = StoreSettings::from_yaml_str("clut_dir: /data/cluts\ncache_size: 1\nverbose: true\n").unwrap();
        assert_eq!(s.clut_dir, PathBuf::from("/data/cluts"));
        assert_eq!(s.cache_size, 1);
        assert!(s.verbose);
    }

    #[test]
    fn test_bad_yaml() {
        assert!(StoreSettings::from_yaml_str("cache_size: many\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.yaml");
        std::fs::write(&path, "verbose: true\n").unwrap();
        let s = StoreSettings::from_file(&path).unwrap();
        assert!(s.verbose);
        assert!(StoreSettings::from_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_builders() {
        let s = StoreSettings::default().with_clut_dir("/x").with_cache_size(2).with_verbose(true);
        assert_eq!(s.clut_dir, PathBuf::from("/x"));
        assert_eq!(s.cache_size, 2);
        assert!(s.verbose);
    }
}
