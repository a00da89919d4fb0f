//! Persisted FIFO of pending generation requests.
//!
//! Delivery is at-least-once: `peek_next` leaves the head request in the
//! file and the worker calls `acknowledge` only after the request has been
//! fully processed and its memory entry written. A crash mid-cycle
//! therefore redelivers the request on restart instead of losing it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One natural-language project request. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub title: String,
    pub description: String,
}

impl Request {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// JSON-file-backed request queue.
pub struct RequestQueue {
    path: PathBuf,
}

impl RequestQueue {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Append a request at the tail.
    pub fn enqueue(&self, request: Request) -> Result<()> {
        let mut requests = self.read_all()?;
        requests.push(request);
        self.write_all(&requests)
    }

    /// Return the head request without removing it, or `None` when empty.
    pub fn peek_next(&self) -> Result<Option<Request>> {
        let requests = self.read_all()?;
        Ok(requests.into_iter().next())
    }

    /// Remove the head request if it matches `request`. The match guard
    /// keeps a concurrent enqueue from being dropped by a stale ack.
    pub fn acknowledge(&self, request: &Request) -> Result<()> {
        let mut requests = self.read_all()?;
        if requests.first() == Some(request) {
            requests.remove(0);
            self.write_all(&requests)?;
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_all(&self) -> Result<Vec<Request>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read queue file {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        // A corrupt queue file is reset rather than wedging the worker.
        match serde_json::from_str(&content) {
            Ok(requests) => Ok(requests),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "Queue file corrupt; resetting to empty");
                self.write_all(&[])?;
                Ok(Vec::new())
            }
        }
    }

    fn write_all(&self, requests: &[Request]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(requests).context("Failed to serialize queue")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write queue file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn queue_in(dir: &Path) -> RequestQueue {
        RequestQueue::new(&dir.join("queue.json"))
    }

    #[test]
    fn test_empty_queue_peeks_none() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        assert!(queue.peek_next().unwrap().is_none());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_fifo_order() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue(Request::new("first", "a")).unwrap();
        queue.enqueue(Request::new("second", "b")).unwrap();

        let head = queue.peek_next().unwrap().unwrap();
        assert_eq!(head.title, "first");
        queue.acknowledge(&head).unwrap();

        let head = queue.peek_next().unwrap().unwrap();
        assert_eq!(head.title, "second");
    }

    #[test]
    fn test_peek_does_not_remove() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue(Request::new("only", "x")).unwrap();
        assert!(queue.peek_next().unwrap().is_some());
        assert_eq!(queue.len().unwrap(), 1, "peek must leave the head in place");
    }

    #[test]
    fn test_stale_acknowledge_is_a_noop() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue(Request::new("current", "x")).unwrap();
        queue
            .acknowledge(&Request::new("someone-else", "y"))
            .unwrap();
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_file_resets_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "{ not a list").unwrap();
        let queue = RequestQueue::new(&path);
        assert!(queue.peek_next().unwrap().is_none());
        // File was rewritten as a valid empty list.
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Request> = serde_json::from_str(&content).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_requests_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.json");
        RequestQueue::new(&path)
            .enqueue(Request::new("persisted", "body"))
            .unwrap();
        let reopened = RequestQueue::new(&path);
        assert_eq!(reopened.peek_next().unwrap().unwrap().title, "persisted");
    }
}
