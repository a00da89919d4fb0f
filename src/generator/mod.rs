//! Per-task code generation.
//!
//! One backlog task becomes one file on disk. The flow is: decide the
//! file kind, decide create vs. modify, ask the collaborator, clean and
//! validate the response, resolve the target path inside the sandbox,
//! write. Any failure aborts the task only; the worker moves on to the
//! next one.

pub mod paths;
pub mod prompts;
pub mod validate;

use crate::errors::GeneratorError;
use crate::llm::TextGenerator;
use crate::planner::rules::has_modify_verb;
use paths::{
    ROOT_FILE_WHITELIST, extract_explicit_path, infer_filename, infer_subfolder,
    is_protected_system_path, resolve_within_root,
};
use prompts::{create_prompt, modify_prompt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use validate::{ContentValidator, clean_generated};

/// The two file families the generator distinguishes. Source gets C#
/// plausibility rules; Markup gets Razor ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Source,
    Markup,
}

impl FileKind {
    /// Infer the kind from an explicit path when present, else from task
    /// wording. Source is the default.
    pub fn infer(task: &str, explicit: Option<&Path>) -> FileKind {
        if let Some(path) = explicit
            && let Some(ext) = path.extension().and_then(|e| e.to_str())
        {
            return match ext.to_lowercase().as_str() {
                "razor" | "cshtml" => FileKind::Markup,
                _ => FileKind::Source,
            };
        }
        let lower = task.to_lowercase();
        let markup_hints = [
            ".razor", "razor", "página", "pagina", "componente", "component", "vista", "view",
            "layout", "navmenu",
        ];
        if markup_hints.iter().any(|hint| lower.contains(hint)) {
            FileKind::Markup
        } else {
            FileKind::Source
        }
    }

}

/// How a task was applied to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Created,
    Modified,
}

/// Result of one successful task: where the file landed and how.
#[derive(Debug)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub mode: WriteMode,
}

pub struct CodeGenerator<'a> {
    collaborator: &'a dyn TextGenerator,
    validator: &'a dyn ContentValidator,
    project_root: PathBuf,
    request_description: String,
    modify_delta_ratio: f64,
}

// Originals shorter than this are treated as trivial and exempt from the
// size-delta guard.
const TRIVIAL_ORIGINAL_CHARS: usize = 200;

// In-place modification is limited to the wiring files every task may
// legitimately touch. Anything else named with a modify verb is
// regenerated wholesale instead.
fn is_modifiable(target: &Path) -> bool {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ROOT_FILE_WHITELIST
        .iter()
        .any(|allowed| allowed.to_lowercase() == name)
        || name == "navmenu.razor"
        || name == "mainlayout.razor"
        || name.ends_with(".csproj")
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        collaborator: &'a dyn TextGenerator,
        validator: &'a dyn ContentValidator,
        project_root: PathBuf,
        request_description: String,
        modify_delta_ratio: f64,
    ) -> Self {
        Self {
            collaborator,
            validator,
            project_root,
            request_description,
            modify_delta_ratio,
        }
    }

    /// Execute one backlog task end to end.
    pub async fn run_task(&self, task: &str) -> Result<GeneratedFile, GeneratorError> {
        let explicit = extract_explicit_path(task);
        let kind = FileKind::infer(task, explicit.as_deref());
        debug!(task = %task, ?kind, explicit = ?explicit, "Task analyzed");

        let existing_target = match &explicit {
            Some(relative) => {
                let resolved =
                    resolve_within_root(&self.project_root, relative).inspect_err(|_| {
                        warn!(
                            candidate = %relative.display(),
                            "Task names a path outside the project sandbox; aborting task"
                        );
                    })?;
                resolved.is_file().then_some(resolved)
            }
            None => None,
        };

        if has_modify_verb(task)
            && let Some(target) = existing_target
            && is_modifiable(&target)
        {
            return self.modify_file(task, kind, &target).await;
        }
        self.create_file(task, kind, explicit).await
    }

    async fn create_file(
        &self,
        task: &str,
        kind: FileKind,
        explicit: Option<PathBuf>,
    ) -> Result<GeneratedFile, GeneratorError> {
        let raw = self
            .collaborator
            .generate(&create_prompt(&self.request_description, task, kind))
            .await?;
        let content = clean_generated(&raw);

        if !self.validator.validate(&content, kind) {
            return Err(GeneratorError::Implausible {
                reason: format!(
                    "{} chars of {:?} content failed structural checks",
                    content.len(),
                    kind
                ),
            });
        }

        let relative = match explicit {
            Some(path) => path,
            None => {
                let filename = infer_filename(&content, task, kind);
                let subfolder = infer_subfolder(task, &content);
                if subfolder.is_empty() {
                    PathBuf::from(filename)
                } else {
                    Path::new(subfolder).join(filename)
                }
            }
        };

        let target = self.checked_target(&relative)?;
        self.write_file(&target, &content)?;
        info!(path = %target.display(), "File created");
        Ok(GeneratedFile {
            path: target,
            mode: WriteMode::Created,
        })
    }

    async fn modify_file(
        &self,
        task: &str,
        kind: FileKind,
        target: &Path,
    ) -> Result<GeneratedFile, GeneratorError> {
        let original =
            std::fs::read_to_string(target).map_err(|source| GeneratorError::ReadFailed {
                path: target.to_path_buf(),
                source,
            })?;

        let raw = self
            .collaborator
            .generate(&modify_prompt(
                &self.request_description,
                task,
                target,
                &original,
            ))
            .await?;
        let content = clean_generated(&raw);

        if !self.validator.validate(&content, kind) {
            return Err(GeneratorError::Implausible {
                reason: "modified content failed structural checks".to_string(),
            });
        }

        // A replacement wildly different in size from the original is
        // more likely a hallucinated rewrite than a patch.
        if original.len() < TRIVIAL_ORIGINAL_CHARS && content.len() > 10_000 {
            return Err(GeneratorError::ModificationRejected {
                path: target.to_path_buf(),
                reason: format!(
                    "{} chars replacing a {}-char file",
                    content.len(),
                    original.len()
                ),
            });
        }
        if original.len() >= TRIVIAL_ORIGINAL_CHARS {
            let delta = content.len().abs_diff(original.len()) as f64 / original.len() as f64;
            if delta > self.modify_delta_ratio {
                return Err(GeneratorError::ModificationRejected {
                    path: target.to_path_buf(),
                    reason: format!(
                        "size delta {delta:.2} exceeds limit {:.2} ({} -> {} chars)",
                        self.modify_delta_ratio,
                        original.len(),
                        content.len()
                    ),
                });
            }
        }

        self.write_file(target, &content)?;
        info!(path = %target.display(), "File modified");
        Ok(GeneratedFile {
            path: target.to_path_buf(),
            mode: WriteMode::Modified,
        })
    }

    /// Sandbox and system-path checks on a candidate relative path.
    fn checked_target(&self, relative: &Path) -> Result<PathBuf, GeneratorError> {
        let resolved = resolve_within_root(&self.project_root, relative).inspect_err(|_| {
            warn!(
                candidate = %relative.display(),
                root = %self.project_root.display(),
                "Rejected write outside the project sandbox"
            );
        })?;
        if is_protected_system_path(&resolved) {
            warn!(path = %resolved.display(), "Rejected write to a protected system path");
            return Err(GeneratorError::SandboxViolation { path: resolved });
        }
        // Root-level writes are restricted to known base files.
        if resolved.parent() == Some(self.project_root.as_path()) {
            let name = resolved
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let whitelisted = ROOT_FILE_WHITELIST
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&name))
                || name.to_lowercase().ends_with(".csproj");
            if !whitelisted {
                debug!(file = %name, "Unlisted root file moved under Models/");
                return Ok(self.project_root.join("Models").join(name));
            }
        }
        Ok(resolved)
    }

    fn write_file(&self, target: &Path, content: &str) -> Result<(), GeneratorError> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| GeneratorError::WriteFailed {
                path: target.to_path_buf(),
                source,
            })?;
        }
        let mut data = content.to_string();
        if !data.ends_with('\n') {
            data.push('\n');
        }
        std::fs::write(target, data).map_err(|source| GeneratorError::WriteFailed {
            path: target.to_path_buf(),
            source,
        })
    }
}
