//! Build log analysis.
//!
//! Parses MSBuild-style diagnostic lines (`path(line,col): severity
//! CODE: message`), resolves their paths against the project root, and
//! extracts per-file log snippets small enough to embed in a repair
//! prompt.

use crate::util::truncate_chars;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One parsed diagnostic line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

/// Diagnostics attributed to one file, with the log snippet to show the
/// collaborator.
#[derive(Debug)]
pub struct FileDiagnostics {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub snippet: String,
}

/// Size limits applied during analysis.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticLimits {
    pub max_log_chars: usize,
    pub max_lines_per_file: usize,
}

// `Models/Foo.cs(12,34): error CS0246: message` with either `,` or `;`
// between line and column. Some localized SDKs emit the semicolon form.
// The targets/props extensions exist only so SDK-level diagnostics
// (NETSDK codes) are seen at all; their paths never survive resolution.
static DIAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^\s*(?P<path>[^(\r\n]+?\.(?:cs|razor|cshtml|csproj|targets|props))\((?P<line>\d+)[,;](?P<col>\d+)\)\s*:\s*(?P<sev>error|warning)\s+(?P<code>[A-Za-z]+\d+)\s*:\s*(?P<msg>.*?)\s*$",
    )
    .expect("diagnostic regex")
});

// Severity lines that never name a file, e.g. bare `error MSB1009: ...`.
static BARE_SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:error|warning)\s+[A-Za-z]+\d+\s*:").expect("bare severity regex")
});

const SNIPPET_FALLBACK_LINES: usize = 10;

/// Parse a build log into per-file diagnostics.
///
/// The log is truncated to the character budget before parsing so a
/// pathological log cannot blow up prompt sizes downstream. Paths that
/// resolve outside `project_root`, or into `obj/`, `bin/` or the SDK
/// itself, are discarded. NETSDK diagnostics are reattributed to the
/// project descriptor since they describe the project, not a source file.
pub fn analyze(log: &str, project_root: &Path, limits: DiagnosticLimits) -> Vec<FileDiagnostics> {
    let truncated = truncate_chars(log, limits.max_log_chars);

    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();
    for captures in DIAG_RE.captures_iter(&truncated) {
        let raw_path = captures["path"].trim().replace('\\', "/");
        let code = captures["code"].to_uppercase();

        let resolved = if code.starts_with("NETSDK") {
            match project_descriptor(project_root) {
                Some(descriptor) => descriptor,
                None => {
                    warn!(%code, "NETSDK diagnostic but no project descriptor found");
                    continue;
                }
            }
        } else {
            match resolve_diag_path(project_root, &raw_path) {
                Some(path) => path,
                None => {
                    debug!(path = %raw_path, "Discarded diagnostic outside the project");
                    continue;
                }
            }
        };

        let (Ok(line), Ok(column)) = (captures["line"].parse(), captures["col"].parse()) else {
            continue;
        };
        let key = (
            resolved.to_string_lossy().to_lowercase(),
            line,
            column,
            code.clone(),
        );
        if !seen.insert(key) {
            continue;
        }

        diagnostics.push(Diagnostic {
            path: resolved,
            line,
            column,
            severity: if captures["sev"].eq_ignore_ascii_case("error") {
                Severity::Error
            } else {
                Severity::Warning
            },
            code,
            message: captures["msg"].to_string(),
        });
    }

    group_by_file(diagnostics, &truncated, limits.max_lines_per_file)
}

/// Resolve a diagnostic path against the project root. Relative paths
/// are joined to the root; absolute ones must already be inside it.
fn resolve_diag_path(project_root: &Path, raw: &str) -> Option<PathBuf> {
    let lower = raw.to_lowercase();
    if lower.contains("/obj/")
        || lower.contains("/bin/")
        || lower.starts_with("obj/")
        || lower.starts_with("bin/")
        || lower.contains("dotnet/sdk")
    {
        return None;
    }

    let candidate = Path::new(raw);
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    };
    resolved.starts_with(project_root).then_some(resolved)
}

/// First `.csproj` directly under the project root.
fn project_descriptor(project_root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(project_root).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "csproj") {
            return Some(path);
        }
    }
    None
}

fn group_by_file(
    diagnostics: Vec<Diagnostic>,
    log: &str,
    max_lines_per_file: usize,
) -> Vec<FileDiagnostics> {
    let mut files: Vec<FileDiagnostics> = Vec::new();
    for diag in diagnostics {
        match files.iter_mut().find(|f| {
            f.path.to_string_lossy().to_lowercase() == diag.path.to_string_lossy().to_lowercase()
        }) {
            Some(file) => file.diagnostics.push(diag),
            None => files.push(FileDiagnostics {
                path: diag.path.clone(),
                diagnostics: vec![diag],
                snippet: String::new(),
            }),
        }
    }
    for file in &mut files {
        file.snippet = snippet_for(log, &file.path, max_lines_per_file);
    }
    files
}

/// Lines of the log relevant to one file: lines naming the file plus
/// severity lines that name no file at all. Falls back to the head of
/// the log when nothing matches by name.
fn snippet_for(log: &str, path: &Path, max_lines: usize) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut lines: Vec<&str> = log
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains(&file_name)
                || (BARE_SEVERITY_RE.is_match(line) && !mentions_any_file(&lower))
        })
        .take(max_lines)
        .collect();

    if lines.is_empty() {
        lines = log.lines().take(SNIPPET_FALLBACK_LINES).collect();
    }
    lines.join("\n")
}

fn mentions_any_file(lower_line: &str) -> bool {
    [".cs(", ".razor(", ".cshtml(", ".csproj("]
        .iter()
        .any(|marker| lower_line.contains(marker))
}
