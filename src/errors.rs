//! Typed error hierarchy for the codesmith pipeline.
//!
//! Three enums cover the three failure domains:
//! - `LlmError`: generation collaborator failures (transient)
//! - `GeneratorError`: per-task code generation failures
//! - `RepairError`: repair-run failures (fatal vs. per-file)

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the text-generation collaborator.
///
/// `Quota` is distinguished because the repair agent must stop consuming
/// the collaborator for the rest of a failing cycle when it appears.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request to generation service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Generation quota exhausted (rate limited)")]
    Quota,

    #[error("Generation service returned an empty response")]
    Empty,

    #[error("Generation response had no text content")]
    MissingContent,
}

impl LlmError {
    /// True when the error indicates quota/rate-limit exhaustion and
    /// further calls in the same cycle should not be attempted.
    pub fn is_quota(&self) -> bool {
        match self {
            LlmError::Quota => true,
            LlmError::Api { status, body } => {
                *status == 429 || body.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}

/// Errors from a single generation task.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Resolved path {path} escapes the project sandbox")]
    SandboxViolation { path: PathBuf },

    #[error("Generated content failed the plausibility check: {reason}")]
    Implausible { reason: String },

    #[error("Modification to {path} rejected: {reason}")]
    ModificationRejected { path: PathBuf, reason: String },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a repair run over one build log.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Failed to read build log at {path}: {source}")]
    LogReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fatal repair failure: {0}")]
    Fatal(#[from] anyhow::Error),
}
