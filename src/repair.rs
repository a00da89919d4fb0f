//! Automatic repair of build failures.
//!
//! One repair run consumes one build log: parse it, and for each file
//! with diagnostics ask the collaborator for a corrected version. The
//! correction cache keeps a run from re-attempting a fix for a snippet
//! that did not change since the last attempt. A quota error stops the
//! run immediately; whatever was already fixed stays fixed.

use crate::cache::CorrectionCache;
use crate::diagnostics::{DiagnosticLimits, FileDiagnostics, analyze};
use crate::errors::RepairError;
use crate::generator::FileKind;
use crate::generator::paths::is_protected_system_path;
use crate::generator::prompts::repair_prompt;
use crate::generator::validate::{ContentValidator, clean_generated};
use crate::llm::TextGenerator;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What one repair run achieved.
#[derive(Debug, Default)]
pub struct RepairReport {
    /// Files rewritten this run.
    pub corrected: Vec<PathBuf>,
    /// Files skipped because their snippet was already attempted.
    pub skipped: usize,
    /// True when the run stopped early on quota exhaustion.
    pub quota_hit: bool,
}

pub struct RepairAgent<'a> {
    collaborator: &'a dyn TextGenerator,
    validator: &'a dyn ContentValidator,
    project_root: PathBuf,
    limits: DiagnosticLimits,
}

impl<'a> RepairAgent<'a> {
    pub fn new(
        collaborator: &'a dyn TextGenerator,
        validator: &'a dyn ContentValidator,
        project_root: PathBuf,
        limits: DiagnosticLimits,
    ) -> Self {
        Self {
            collaborator,
            validator,
            project_root,
            limits,
        }
    }

    /// Repair every file named in the build log at `log_path`.
    pub async fn repair_from_log(
        &self,
        log_path: &Path,
        cache: &mut CorrectionCache,
    ) -> Result<RepairReport, RepairError> {
        let log = std::fs::read_to_string(log_path).map_err(|source| {
            RepairError::LogReadFailed {
                path: log_path.to_path_buf(),
                source,
            }
        })?;

        let files = analyze(&log, &self.project_root, self.limits);
        info!(
            log = %log_path.display(),
            files = files.len(),
            "Repair run starting"
        );

        let mut report = RepairReport::default();
        for file in files {
            if cache.was_corrected(&file.path, &file.snippet) {
                info!(
                    path = %file.path.display(),
                    "Identical diagnostic already attempted; skipping"
                );
                report.skipped += 1;
                continue;
            }
            match self.repair_file(&file).await {
                Ok(()) => {
                    cache.mark_corrected(&file.path, &file.snippet)?;
                    report.corrected.push(file.path);
                }
                Err(FileRepairFailure::Quota) => {
                    warn!("Generation quota exhausted; aborting repair run");
                    report.quota_hit = true;
                    break;
                }
                Err(FileRepairFailure::Skipped(reason)) => {
                    warn!(path = %file.path.display(), %reason, "File left unrepaired");
                }
            }
        }

        info!(
            corrected = report.corrected.len(),
            skipped = report.skipped,
            quota_hit = report.quota_hit,
            "Repair run finished"
        );
        Ok(report)
    }

    async fn repair_file(&self, file: &FileDiagnostics) -> Result<(), FileRepairFailure> {
        if is_protected_system_path(&file.path) {
            return Err(FileRepairFailure::Skipped(
                "diagnostic points at a protected system path".to_string(),
            ));
        }

        let original = std::fs::read_to_string(&file.path)
            .map_err(|err| FileRepairFailure::Skipped(format!("cannot read file: {err}")))?;
        let kind = kind_of(&file.path);

        let raw = self
            .collaborator
            .generate(&repair_prompt(&file.path, kind, &original, &file.snippet))
            .await
            .map_err(|err| {
                if err.is_quota() {
                    FileRepairFailure::Quota
                } else {
                    FileRepairFailure::Skipped(format!("collaborator failed: {err}"))
                }
            })?;

        let content = clean_generated(&raw);
        if !self.validator.validate(&content, kind) {
            return Err(FileRepairFailure::Skipped(
                "replacement failed structural checks".to_string(),
            ));
        }

        let mut data = content;
        if !data.ends_with('\n') {
            data.push('\n');
        }
        std::fs::write(&file.path, data)
            .map_err(|err| FileRepairFailure::Skipped(format!("cannot write file: {err}")))?;
        info!(path = %file.path.display(), "File repaired");
        Ok(())
    }
}

enum FileRepairFailure {
    /// Stop the whole run.
    Quota,
    /// Skip this file, keep going.
    Skipped(String),
}

fn kind_of(path: &Path) -> FileKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some("razor") | Some("cshtml") => FileKind::Markup,
        _ => FileKind::Source,
    }
}
