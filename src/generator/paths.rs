//! Path extraction, inference and sandbox containment.
//!
//! Targets come from three layered sources, tried in order: an explicit
//! path in the task text, a known root base file, or a name inferred from
//! the generated content. Whatever the source, the final path must resolve
//! inside the project root (or be one of the whitelisted root files)
//! before anything is written.

use super::FileKind;
use crate::errors::GeneratorError;
use crate::util::{to_pascal_case, uppercase_first};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Root-level files that may be written without a subfolder.
pub const ROOT_FILE_WHITELIST: &[&str] = &["Program.cs", "App.razor", "_Imports.razor"];

/// Top-level folders an unquoted relative path may start with.
const KNOWN_TOP_FOLDERS: &[&str] = &[
    "Models",
    "Pages",
    "Services",
    "Data",
    "Shared",
    "Components",
    "Controllers",
    "Interfaces",
];

// Quoted or backticked path following a file-ish keyword:
// "Crear modelo `Models/Producto.cs` ..." / "modify file 'Program.cs'".
static QUOTED_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:file|archivo|model|modelo|page|página|pagina|component|componente|service|servicio|context|contexto|interface|interfaz|class|clase|modify|modificar)[^`"']{0,40}[`"']([\w\-./\\]+\.(?:cs|razor|cshtml|csproj))[`"']"#,
    )
    .expect("quoted path regex")
});

// Bare relative path starting at a known top-level folder.
static BARE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:Models|Pages|Services|Data|Shared|Components|Controllers|Interfaces)[/\\][\w\-./\\]*\.(?:cs|razor|cshtml))\b",
    )
    .expect("bare path regex")
});

// C# type declaration, for naming a generated source file.
static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:class|interface|record|enum|struct)\s+([A-Za-z_]\w*)").expect("type regex")
});

// Razor @page route; the last literal segment names the file.
static PAGE_ROUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@page\s+"/?([\w/\-{}:]*)""#).expect("page route regex"));

// Component-ish tag at the start of markup.
static COMPONENT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Z][A-Za-z_]\w*)\b").expect("component tag regex"));

// Name mentioned in a task after a create-ish verb and an optional noun.
static TASK_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:crear|implementar|generar|create|implement|generate)\s+(?:la\s+|el\s+|a\s+|the\s+)?(?:clase|interfaz|servicio|modelo|contexto|enum|componente|página|pagina|vista|class|interface|service|model|context|component|page|view)?\s*'?`?([A-Za-z_]\w+)'?`?",
    )
    .expect("task name regex")
});

/// Explicit path extraction from task text. Layered attempts, first
/// success wins: quoted path after a keyword, bare path under a known
/// folder, whitelisted root filename.
pub fn extract_explicit_path(task: &str) -> Option<PathBuf> {
    if let Some(captures) = QUOTED_PATH_RE.captures(task) {
        return Some(PathBuf::from(normalize_separators(&captures[1])));
    }
    if let Some(captures) = BARE_PATH_RE.captures(task) {
        return Some(PathBuf::from(normalize_separators(&captures[1])));
    }
    let lower = task.to_lowercase();
    for root_file in ROOT_FILE_WHITELIST {
        if lower.contains(&root_file.to_lowercase()) {
            return Some(PathBuf::from(root_file));
        }
    }
    // NavMenu lives under Shared/ by convention.
    if lower.contains("navmenu.razor") {
        return Some(PathBuf::from("Shared/NavMenu.razor"));
    }
    None
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve `candidate` against `root` and enforce the sandbox invariant:
/// the result must be a strict descendant of `root`, or `root` joined
/// with a whitelisted root file. Resolution is purely lexical so paths
/// that do not exist yet can still be checked.
pub fn resolve_within_root(root: &Path, candidate: &Path) -> Result<PathBuf, GeneratorError> {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                // Popping above the root is exactly the traversal attack
                // the sandbox exists to stop.
                if !resolved.pop() || !resolved.starts_with(root) {
                    return Err(GeneratorError::SandboxViolation {
                        path: joined.clone(),
                    });
                }
            }
            Component::CurDir => {}
            other => resolved.push(other.as_os_str()),
        }
    }

    if resolved == root {
        return Err(GeneratorError::SandboxViolation { path: resolved });
    }
    if resolved.starts_with(root) {
        return Ok(resolved);
    }
    Err(GeneratorError::SandboxViolation { path: resolved })
}

/// System locations that must never receive a write, even when a build
/// log or collaborator response names them.
pub fn is_protected_system_path(path: &Path) -> bool {
    const PROTECTED: &[&str] = &[
        "/usr/bin",
        "/usr/sbin",
        "/bin",
        "/sbin",
        "/etc",
        "C:\\Program Files",
        "C:\\Program Files (x86)",
        "C:\\Windows",
    ];
    let display = path.to_string_lossy();
    PROTECTED.iter().any(|p| display.starts_with(p))
        || display.to_lowercase().contains("dotnet/sdk")
        || display.to_lowercase().contains("dotnet\\sdk")
}

/// Infer the subfolder for a task whose path was not explicit, using the
/// same keyword heuristics the planner categorizes with.
pub fn infer_subfolder(task: &str, content: &str) -> &'static str {
    let t = task.to_lowercase();
    let c = content.to_lowercase();

    if t.contains("controlador")
        || t.contains("controller")
        || c.contains("[apicontroller]")
        || c.contains("controllerbase")
    {
        return "Controllers";
    }
    if t.contains("dbcontext")
        || t.contains("contexto")
        || t.contains("repositor")
        || c.contains("dbcontext")
    {
        return "Data";
    }
    if t.contains("servicio")
        || t.contains("service")
        || t.contains("helper")
        || t.contains("manager")
    {
        return "Services";
    }
    if c.contains("@page ") || (t.contains("página") || t.contains("pagina")) && t.contains(".razor")
    {
        return "Pages";
    }
    if t.contains(".razor") || t.contains("componente") || t.contains("component") {
        return "Components";
    }
    if t.contains("interfaz") || t.contains("interface") || c.contains(" interface ") {
        return "Interfaces";
    }
    if t.contains("modelo")
        || t.contains("model")
        || t.contains("entidad")
        || t.contains("entity")
        || t.contains("dto")
        || c.contains(" class ")
        || c.contains(" record ")
    {
        return "Models";
    }
    debug!(task = %task, "No subfolder inferred; using project root");
    ""
}

/// Name a generated file from its content, then from the task text, then
/// randomly. The extension follows the file kind.
pub fn infer_filename(content: &str, task: &str, kind: FileKind) -> String {
    match kind {
        FileKind::Source => infer_source_filename(content, task),
        FileKind::Markup => infer_markup_filename(content, task),
    }
}

fn infer_source_filename(content: &str, task: &str) -> String {
    if let Some(captures) = TYPE_DECL_RE.captures(content) {
        return format!("{}.cs", &captures[1]);
    }
    if let Some(name) = name_from_task(task) {
        return format!("{name}.cs");
    }
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    format!("Class_{suffix}.cs")
}

fn infer_markup_filename(content: &str, task: &str) -> String {
    if let Some(captures) = PAGE_ROUTE_RE.captures(content) {
        let route = &captures[1];
        let last_literal = route
            .split('/')
            .filter(|segment| !segment.is_empty() && !segment.contains('{'))
            .next_back();
        if let Some(segment) = last_literal {
            return format!("{}.razor", uppercase_first(&to_pascal_case(segment)));
        }
    }
    if let Some(captures) = COMPONENT_TAG_RE.captures(content) {
        return format!("{}.razor", &captures[1]);
    }
    if let Some(name) = name_from_task(task) {
        return format!("{}.razor", uppercase_first(&name));
    }
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    format!("Component_{suffix}.razor")
}

fn name_from_task(task: &str) -> Option<String> {
    let captures = TASK_NAME_RE.captures(task)?;
    let raw = captures[1].to_string();
    if raw.is_empty() { None } else { Some(raw) }
}
