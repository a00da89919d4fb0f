//! Execution memory: append-only audit log of processed requests.
//!
//! One entry per fully processed request, written at the end of its cycle
//! regardless of outcome.

use crate::queue::Request;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp_utc: DateTime<Utc>,
    pub request: Request,
    pub backlog: Vec<String>,
    pub build_success: bool,
    pub project_path: PathBuf,
    /// HEAD revision of the worker's own repository at processing time;
    /// empty when the worker does not run inside a git checkout.
    pub revision: String,
}

pub struct ExecutionMemory {
    path: PathBuf,
    entries: Vec<MemoryEntry>,
}

impl ExecutionMemory {
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn append(&mut self, entry: MemoryEntry) -> Result<()> {
        self.entries.push(entry);
        let json =
            serde_json::to_string_pretty(&self.entries).context("Failed to serialize memory")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write memory file {}", self.path.display()))?;
        Ok(())
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }
}

/// HEAD commit of the repository containing `dir`, if any.
pub fn current_revision(dir: &Path) -> String {
    git2::Repository::discover(dir)
        .ok()
        .and_then(|repo| {
            let head = repo.head().ok()?;
            let commit = head.peel_to_commit().ok()?;
            Some(commit.id().to_string())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(title: &str, success: bool) -> MemoryEntry {
        MemoryEntry {
            timestamp_utc: Utc::now(),
            request: Request::new(title, "desc"),
            backlog: vec!["Crear modelo Models/Foo.cs".to_string()],
            build_success: success,
            project_path: PathBuf::from("output/proj"),
            revision: String::new(),
        }
    }

    #[test]
    fn test_append_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        {
            let mut memory = ExecutionMemory::open(&path);
            memory.append(entry("one", true)).unwrap();
            memory.append(entry("two", false)).unwrap();
        }
        let reopened = ExecutionMemory::open(&path);
        assert_eq!(reopened.entries().len(), 2);
        assert_eq!(reopened.entries()[0].request.title, "one");
        assert!(reopened.entries()[0].build_success);
        assert!(!reopened.entries()[1].build_success);
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let memory = ExecutionMemory::open(&dir.path().join("memory.json"));
        assert!(memory.entries().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "not json").unwrap();
        let memory = ExecutionMemory::open(&path);
        assert!(memory.entries().is_empty());
    }

    #[test]
    fn test_revision_empty_outside_repo() {
        let dir = tempdir().unwrap();
        assert_eq!(current_revision(dir.path()), "");
    }
}
