//! Post-generation completeness sweep.
//!
//! Generation failures leave stub files behind (empty, or a few tokens
//! of a truncated response). The sweep walks the project after the
//! backlog ran and regenerates any source or markup file that is too
//! small to be a real implementation.

use crate::generator::FileKind;
use crate::generator::prompts::create_prompt;
use crate::generator::validate::{ContentValidator, clean_generated};
use crate::llm::TextGenerator;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const STUB_MAX_LINES: usize = 5;
const STUB_MAX_CHARS: usize = 100;

// Base files that are legitimately tiny.
const IGNORED_FILES: &[&str] = &["_Imports.razor", "_Host.cshtml", "Error.cshtml"];

pub struct CompletenessSweep<'a> {
    collaborator: &'a dyn TextGenerator,
    validator: &'a dyn ContentValidator,
    project_root: PathBuf,
    request_description: String,
}

impl<'a> CompletenessSweep<'a> {
    pub fn new(
        collaborator: &'a dyn TextGenerator,
        validator: &'a dyn ContentValidator,
        project_root: PathBuf,
        request_description: String,
    ) -> Self {
        Self {
            collaborator,
            validator,
            project_root,
            request_description,
        }
    }

    /// Regenerate every stub file found. Returns how many were rewritten.
    /// Quota exhaustion ends the sweep early.
    pub async fn run(&self) -> usize {
        let stubs = find_stub_files(&self.project_root);
        if stubs.is_empty() {
            return 0;
        }
        info!(count = stubs.len(), "Stub files found; regenerating");

        let mut regenerated = 0;
        for stub in stubs {
            let relative = stub
                .strip_prefix(&self.project_root)
                .unwrap_or(&stub)
                .to_path_buf();
            let kind = match stub.extension().and_then(|e| e.to_str()) {
                Some("razor") | Some("cshtml") => FileKind::Markup,
                _ => FileKind::Source,
            };
            let task = format!(
                "Crear el contenido completo del archivo `{}` acorde al requerimiento general; \
                 el archivo existe pero quedó vacío o incompleto.",
                relative.display()
            );

            let raw = match self
                .collaborator
                .generate(&create_prompt(&self.request_description, &task, kind))
                .await
            {
                Ok(text) => text,
                Err(err) if err.is_quota() => {
                    warn!("Generation quota exhausted; completeness sweep stopped");
                    break;
                }
                Err(err) => {
                    warn!(path = %stub.display(), %err, "Could not regenerate stub");
                    continue;
                }
            };

            let content = clean_generated(&raw);
            if !self.validator.validate(&content, kind) {
                warn!(path = %stub.display(), "Regenerated content failed structural checks");
                continue;
            }
            match std::fs::write(&stub, content + "\n") {
                Ok(()) => {
                    info!(path = %stub.display(), "Stub file regenerated");
                    regenerated += 1;
                }
                Err(err) => warn!(path = %stub.display(), %err, "Failed to write stub file"),
            }
        }
        regenerated
    }
}

/// Source and markup files small enough to be generation leftovers.
pub fn find_stub_files(project_root: &Path) -> Vec<PathBuf> {
    WalkDir::new(project_root)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir() && (name == "obj" || name == "bin" || name == "wwwroot"))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            let relevant = name.ends_with(".cs") || name.ends_with(".razor");
            relevant && !IGNORED_FILES.iter().any(|ignored| *ignored == name)
        })
        .filter(|entry| {
            std::fs::read_to_string(entry.path()).is_ok_and(|content| {
                let trimmed = content.trim();
                trimmed.len() <= STUB_MAX_CHARS || trimmed.lines().count() <= STUB_MAX_LINES
            })
        })
        .map(|entry| entry.into_path())
        .collect()
}
