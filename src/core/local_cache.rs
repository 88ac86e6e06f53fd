//! Local fallback copies of settings blobs.
//!
//! Saved settings are mirrored as JSON files in a local directory so the home
//! page and the form builder still have something to show when the database is
//! unreachable.

use crate::errors::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of `<key>.json` files
#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    /// Cache rooted at `dir`; the directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reads the cached copy of `key`, `None` if nothing was cached yet.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Replaces the cached copy of `key`.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
        debug!("Cached {} locally at {}", key, path.display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_cache(label: &str) -> LocalCache {
    LocalCache::new(std::env::temp_dir().join(format!(
        "school-census-{label}-{}",
        uuid::Uuid::new_v4()
    )))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_read_missing_is_none() {
        let cache = temp_cache("missing");
        let value: Option<Vec<String>> = cache.read("nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let cache = temp_cache("write");
        cache.write("names", &vec!["a".to_string(), "b".to_string()]).unwrap();
        let value: Option<Vec<String>> = cache.read("names").unwrap();
        assert_eq!(value.unwrap(), vec!["a", "b"]);
        std::fs::remove_dir_all(cache.dir()).unwrap();
    }
}
