//! Correction cache: which diagnostic was last fixed for each file.
//!
//! Maps a file path to the SHA-256 digest of the diagnostic snippet used
//! for its most recent fix. When a later cycle extracts an identical
//! snippet for the same file, the repair agent skips it; that exact
//! problem was already attempted and nothing changed. Entries never expire
//! except by explicit removal.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct CorrectionCache {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl CorrectionCache {
    /// Open (or create) the cache backed by the given file.
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// True when `snippet` hashes to the digest recorded for `file`.
    pub fn was_corrected(&self, file: &Path, snippet: &str) -> bool {
        self.entries
            .get(&Self::key(file))
            .is_some_and(|recorded| *recorded == hash_snippet(snippet))
    }

    /// Record `snippet` as the diagnostic last fixed for `file`.
    pub fn mark_corrected(&mut self, file: &Path, snippet: &str) -> Result<()> {
        self.entries.insert(Self::key(file), hash_snippet(snippet));
        self.persist()
    }

    pub fn remove(&mut self, file: &Path) -> Result<()> {
        if self.entries.remove(&Self::key(file)).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Paths compare case-insensitively: build logs on Windows-style
    // toolchains mix cases freely.
    fn key(file: &Path) -> String {
        file.to_string_lossy().to_lowercase()
    }

    fn persist(&self) -> Result<()> {
        let json =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize cache")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cache file {}", self.path.display()))?;
        Ok(())
    }
}

/// Deterministic digest of diagnostic text, used only for equality.
pub fn hash_snippet(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_unknown_file_not_corrected() {
        let dir = tempdir().unwrap();
        let cache = CorrectionCache::open(&dir.path().join("cache.json"));
        assert!(!cache.was_corrected(Path::new("Models/Foo.cs"), "error CS0103"));
    }

    #[test]
    fn test_mark_then_hit() {
        let dir = tempdir().unwrap();
        let mut cache = CorrectionCache::open(&dir.path().join("cache.json"));
        let file = Path::new("Models/Foo.cs");
        cache.mark_corrected(file, "error CS0103: x").unwrap();
        assert!(cache.was_corrected(file, "error CS0103: x"));
        assert!(!cache.was_corrected(file, "error CS0246: y"));
    }

    #[test]
    fn test_paths_are_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut cache = CorrectionCache::open(&dir.path().join("cache.json"));
        cache
            .mark_corrected(Path::new("Models/Foo.cs"), "snippet")
            .unwrap();
        assert!(cache.was_corrected(Path::new("models/foo.cs"), "snippet"));
    }

    #[test]
    fn test_entries_persist_across_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        {
            let mut cache = CorrectionCache::open(&path);
            cache
                .mark_corrected(Path::new("Pages/Index.razor"), "error RZ1006")
                .unwrap();
        }
        let reopened = CorrectionCache::open(&path);
        assert!(reopened.was_corrected(Path::new("Pages/Index.razor"), "error RZ1006"));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_remove_deletes_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = CorrectionCache::open(&path);
        let file = Path::new("Services/Svc.cs");
        cache.mark_corrected(file, "snippet").unwrap();
        cache.remove(file).unwrap();
        assert!(!cache.was_corrected(file, "snippet"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_cache_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "][").unwrap();
        let cache = CorrectionCache::open(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let a = hash_snippet("error CS0103");
        let b = hash_snippet("error CS0103");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
