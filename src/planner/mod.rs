//! Task planner: natural-language request -> ordered backlog of atomic
//! file-level tasks.
//!
//! The collaborator is asked for one task per line; its raw output then
//! runs through a sanitization pipeline of pure functions before the
//! surviving lines are categorized and sorted into dependency-ish order.

pub mod rules;

use crate::llm::TextGenerator;
use crate::queue::Request;
use rules::{
    CODE_LINE_PREFIXES, PROMPT_ECHO_PHRASES, categorize, has_action_verb, has_artifact_keyword,
    references_base_file,
};
use tracing::{debug, error, info, warn};

const MIN_TASK_LENGTH: usize = 10;

pub struct TaskPlanner<'a> {
    generator: &'a dyn TextGenerator,
}

impl<'a> TaskPlanner<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self { generator }
    }

    /// Turn a request into an ordered backlog. Collaborator failure or an
    /// empty result after filtering yields an empty backlog; the caller
    /// treats that as a no-op for the request.
    pub async fn plan(&self, request: &Request) -> Vec<String> {
        info!(title = %request.title, "Planning backlog");

        let response = match self.generator.generate(&planning_prompt(request)).await {
            Ok(text) => text,
            Err(err) => {
                error!(title = %request.title, %err, "Planner call failed; returning empty backlog");
                return Vec::new();
            }
        };

        let backlog = sanitize_and_order(&response);
        if backlog.is_empty() {
            error!(
                title = %request.title,
                "Planning produced no valid tasks; raw response had {} chars",
                response.len()
            );
        } else {
            info!(title = %request.title, tasks = backlog.len(), "Backlog ready");
        }
        backlog
    }
}

/// Full sanitization + ordering pipeline over the raw planner response.
pub fn sanitize_and_order(response: &str) -> Vec<String> {
    let lines: Vec<String> = response
        .lines()
        .map(strip_list_markers)
        .filter(|line| !line.is_empty())
        .collect();
    debug!(lines = lines.len(), "Lines after split and trim");

    let mut valid = Vec::new();
    let mut discarded = Vec::new();
    for line in lines {
        if is_valid_task(&line) {
            valid.push(line);
        } else {
            discarded.push(line);
        }
    }
    if !discarded.is_empty() {
        warn!(
            count = discarded.len(),
            sample = %discarded.iter().take(5).cloned().collect::<Vec<_>>().join(" | "),
            "Discarded lines that did not look like tasks"
        );
    }

    let mut tagged: Vec<(rules::TaskCategory, String)> = valid
        .into_iter()
        .map(|task| (categorize(&task), task))
        .collect();
    tagged.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    tagged.into_iter().map(|(_, task)| task).collect()
}

/// Strip leading list markers, quoting and trailing whitespace.
fn strip_list_markers(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| {
            c == '-' || c == '*' || c == '.' || c == '"' || c == '\'' || c.is_ascii_digit()
        })
        .trim()
        .trim_end_matches('"')
        .trim()
        .to_string()
}

/// The validity predicate applied after basic cleanup. A line survives iff
/// it is not an echo of the planning instruction, not source code, long
/// enough (or a base-file reference), and carries both an action verb and
/// an artifact keyword.
pub fn is_valid_task(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }

    // Prompt-echo lines are dropped unless they are rescued by looking
    // like a real instruction: leading action verb plus a concrete
    // extension.
    if is_prompt_echo(line) && !(starts_with_action_verb(line) && mentions_extension(line)) {
        return false;
    }

    if line.len() < MIN_TASK_LENGTH && !references_base_file(line) {
        return false;
    }

    if looks_like_code(line) {
        // A code-looking fragment may still be a task when it names a base
        // file and carries enough prose around the code token.
        if !(references_base_file(line) && line.len() >= 2 * MIN_TASK_LENGTH) {
            return false;
        }
    }

    has_action_verb(line) && has_artifact_keyword(line)
}

fn starts_with_action_verb(line: &str) -> bool {
    let lower = line.to_lowercase();
    rules::ACTION_VERBS.iter().any(|verb| lower.starts_with(verb))
}

fn is_prompt_echo(line: &str) -> bool {
    let lower = line.to_lowercase();
    PROMPT_ECHO_PHRASES.iter().any(|p| lower.contains(p))
}

fn mentions_extension(line: &str) -> bool {
    let lower = line.to_lowercase();
    [".cs", ".razor", ".cshtml", ".csproj"]
        .iter()
        .any(|ext| lower.contains(ext))
}

fn looks_like_code(line: &str) -> bool {
    let lower = line.to_lowercase();
    CODE_LINE_PREFIXES.iter().any(|p| lower.starts_with(p))
        || assignment_like(line)
        || line.trim() == "```"
}

// `x = y;`-shaped fragments that slipped through without a leading keyword.
fn assignment_like(line: &str) -> bool {
    line.ends_with(';') && line.contains('=') && !line.contains(' ')
}

fn planning_prompt(request: &Request) -> String {
    format!(
        r#"You are a senior software engineer expert in Blazor Server web applications.
From the user requirement below, produce a concise list of high-level TECHNICAL TASKS, one per line, to implement the full functionality.

Rules:
1. Each task must describe the creation or modification of exactly ONE file and the main functionality to implement in it. For CRUD applications that means separate tasks for the model, the service class, each Razor page (Index, Create, Edit, Details, Delete), and any configuration or layout modification.
2. Do NOT output code, HTML, Razor markup or comments. Do not write file contents here.
3. Each task description must be rich enough for another developer agent to generate the complete file from it.
4. Order tasks logically: models before services, services before the pages that use them, registrations in Program.cs after the things they register.
5. Do not include tasks for base files that already exist (_Imports.razor, App.razor, a basic MainLayout, the .csproj) unless the requirement explicitly asks to modify them.
6. Use relative paths, e.g. `Models/Cliente.cs`, `Pages/Clientes/Index.razor`.

User requirement:
"{}"

Valid task examples (desired format):
- Crear modelo C# `Models/Cliente.cs` con propiedades Id (Key), Nombre (Required), Email y DataAnnotations apropiadas.
- Crear servicio `Services/ClienteService.cs` que implemente operaciones CRUD para Cliente usando AppDbContext.
- Crear página Razor `Pages/Clientes/Index.razor` para listar clientes con opciones CRUD.
- Modificar `Program.cs` para registrar AppDbContext y ClienteService.
- Modificar `Shared/NavMenu.razor` para añadir enlaces de navegación.

Produce the list of technical tasks now, one task per line, each starting with '-' or a number:"#,
        request.description
    )
}
