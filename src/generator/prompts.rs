//! Prompt construction for code generation and repair.

use super::FileKind;
use crate::planner::rules::is_crud_task;
use std::path::Path;

/// Prompt for generating a brand-new file from a backlog task.
pub fn create_prompt(request_description: &str, task: &str, kind: FileKind) -> String {
    let language_hint = match kind {
        FileKind::Source => "a complete C# source file for a Blazor Server application",
        FileKind::Markup => "a complete Razor component or page for a Blazor Server application",
    };

    let mut prompt = format!(
        r#"You are an expert Blazor Server developer. Generate {language_hint}.

Overall requirement:
"{request_description}"

Current task (implement exactly this, nothing else):
"{task}"

Rules:
1. Output ONLY the raw file content. No markdown fences, no explanations before or after.
2. The file must be complete and compile on its own within a standard Blazor Server project targeting net8.0.
3. Use namespace and using directives consistent with a default Blazor Server template.
4. Do not invent files that other tasks will create; reference them by their conventional names.
"#
    );

    if is_crud_task(task) {
        prompt.push_str(
            r#"
This task is part of a CRUD feature. Where applicable include:
- the full set of operations (list, get by id, create, update, delete),
- async signatures returning Task,
- basic input validation with DataAnnotations on models,
- navigation between Index, Create, Edit, Details and Delete pages.
"#,
        );
    }
    prompt
}

/// Prompt for modifying an existing file. The full original content is
/// embedded so the collaborator returns a complete replacement, not a
/// diff.
pub fn modify_prompt(
    request_description: &str,
    task: &str,
    path: &Path,
    original: &str,
) -> String {
    format!(
        r#"You are an expert Blazor Server developer. Modify the existing file below.

Overall requirement:
"{request_description}"

Modification task:
"{task}"

File to modify: {path}

Current content:
---
{original}
---

Rules:
1. Output the COMPLETE updated file content, not a diff or a fragment.
2. Preserve everything that the task does not ask to change.
3. Output ONLY the raw file content. No markdown fences, no explanations.
"#,
        path = path.display()
    )
}

/// Prompt for repairing a file that produced build diagnostics. The
/// excerpt contains only the diagnostic lines attributed to this file.
pub fn repair_prompt(path: &Path, kind: FileKind, content: &str, excerpt: &str) -> String {
    let kind_label = match kind {
        FileKind::Source => "C# source file",
        FileKind::Markup => "Razor file",
    };
    format!(
        r#"You are an expert Blazor Server developer fixing a compilation failure.

File with errors: {path} ({kind_label})

Build diagnostics for this file:
---
{excerpt}
---

Current content:
---
{content}
---

Rules:
1. Output the COMPLETE corrected file content. No markdown fences, no explanations.
2. Make the minimal change that fixes the reported diagnostics; do not restructure working code.
3. If a diagnostic refers to a member you cannot verify exists, prefer commenting the offending line with a short note over guessing a new API.
"#,
        path = path.display()
    )
}
