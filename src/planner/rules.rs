//! Classification rule tables for backlog task lines.
//!
//! Everything here is an ordered table of (predicate, result) pairs so the
//! matching behavior is testable in isolation. Keyword sets carry both
//! English and Spanish forms; the collaborator answers in whichever
//! language the request used.

/// Action verbs a line must contain to count as a task.
pub const ACTION_VERBS: &[&str] = &[
    // English
    "create", "modify", "add", "register", "configure", "update", "delete", "generate",
    "implement", "ensure", "refactor", "move", "rename",
    // Spanish
    "crear", "modificar", "añadir", "agregar", "registrar", "configurar", "actualizar",
    "eliminar", "generar", "implementar", "asegurar", "refactorizar", "mover", "renombrar",
];

/// Verbs that specifically request modification of an existing file.
pub const MODIFY_VERBS: &[&str] = &["modify", "update", "modificar", "actualizar"];

/// Artifact keywords: a file extension or an architectural noun.
pub const ARTIFACT_KEYWORDS: &[&str] = &[
    ".cs", ".razor", ".cshtml", ".csproj",
    "model", "modelo", "entity", "entidad", "dto", "viewmodel", "enum",
    "service", "servicio", "page", "página", "pagina", "component", "componente",
    "context", "dbcontext", "contexto", "controller", "controlador", "api",
    "interface", "interfaz", "repository", "repositorio", "class", "clase",
    "program", "startup", "config", "setting", "navmenu", "layout",
];

/// Root-level base files short lines may legitimately reference.
pub const BASE_FILE_WHITELIST: &[&str] = &["program.cs", "navmenu.razor", "_imports.razor", "app.razor"];

/// Phrases that indicate the generator echoed the planning instruction
/// back instead of producing a task.
pub const PROMPT_ECHO_PHRASES: &[&str] = &[
    "one task per line",
    "una tarea por línea",
    "technical tasks",
    "tareas técnicas",
    "valid task examples",
    "ejemplos de tareas",
    "do not decompose",
    "no descomponer",
    "user requirement",
    "requerimiento de usuario",
];

/// Tokens that mark a line as source code rather than a task description.
pub const CODE_LINE_PREFIXES: &[&str] = &[
    "{", "}", "(", ")", "<", "/", "@", "using ", "public ", "private ", "protected ",
    "internal ", "namespace ", "var ", "await ", "return ", "if ", "else", "foreach",
    "while ", "console.", "builder.", "context.", "services.", "app.", "```",
];

/// Keywords that make a CRUD structural checklist appropriate for a task.
pub const CRUD_KEYWORDS: &[&str] = &["crud", "abm", "gestionar", "administrar", "manage"];

/// Task category, ranked to approximate dependency order: data shapes
/// before services before UI, layout wiring last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskCategory {
    Model = 1,
    Data = 2,
    Configuration = 3,
    Service = 4,
    Component = 5,
    Page = 6,
    Layout = 7,
    Other = 100,
}

/// One classification rule: if `matches(line)` then `category`.
struct CategoryRule {
    matches: fn(&str) -> bool,
    category: TaskCategory,
}

fn has_any(line: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| line.contains(n))
}

fn cs_in_folder(line: &str, folder: &str) -> bool {
    line.contains(".cs") && (line.contains(&format!("/{folder}/")) || line.contains(&format!("\\{folder}\\")))
}

fn razor_in_folder(line: &str, folder: &str) -> bool {
    line.contains(".razor")
        && (line.contains(&format!("/{folder}/")) || line.contains(&format!("\\{folder}\\")))
}

/// Ordered rule table; the first matching rule wins.
const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        matches: |l| {
            has_any(l, &["modelo", "model", "entidad", "entity", "dto", "enum"])
                || cs_in_folder(l, "models")
        },
        category: TaskCategory::Model,
    },
    CategoryRule {
        matches: |l| {
            has_any(l, &["dbcontext", "contexto", "repositorio", "repository"])
                || cs_in_folder(l, "data")
        },
        category: TaskCategory::Data,
    },
    CategoryRule {
        matches: |l| {
            has_any(
                l,
                &["program.cs", "startup", "configurar", "configure", "appsettings"],
            ) || l.contains("registrar servicio")
                || l.contains("register service")
        },
        category: TaskCategory::Configuration,
    },
    CategoryRule {
        matches: |l| {
            has_any(l, &["servicio", "service", "helper", "manager"])
                || cs_in_folder(l, "services")
                || cs_in_folder(l, "clients")
                || cs_in_folder(l, "helpers")
        },
        category: TaskCategory::Service,
    },
    CategoryRule {
        matches: |l| {
            has_any(l, &["componente", "component"]) || razor_in_folder(l, "components")
        },
        category: TaskCategory::Component,
    },
    CategoryRule {
        matches: |l| {
            ((l.contains("página") || l.contains("pagina") || l.contains("page"))
                && l.contains(".razor"))
                || razor_in_folder(l, "pages")
        },
        category: TaskCategory::Page,
    },
    CategoryRule {
        matches: |l| has_any(l, &["navmenu", "layout"]) || razor_in_folder(l, "shared"),
        category: TaskCategory::Layout,
    },
    CategoryRule {
        matches: |l| {
            has_any(l, &["interfaz", "interface"]) || cs_in_folder(l, "interfaces")
        },
        category: TaskCategory::Service,
    },
    CategoryRule {
        matches: |l| l.ends_with(".cs"),
        category: TaskCategory::Other,
    },
    CategoryRule {
        matches: |l| l.ends_with(".razor"),
        category: TaskCategory::Component,
    },
];

/// Classify a task line. Falls through to `Other` when nothing matches.
pub fn categorize(task: &str) -> TaskCategory {
    let lower = task.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|rule| (rule.matches)(&lower))
        .map(|rule| rule.category)
        .unwrap_or(TaskCategory::Other)
}

/// True when the line contains at least one recognized action verb.
pub fn has_action_verb(line: &str) -> bool {
    let lower = line.to_lowercase();
    has_any(&lower, ACTION_VERBS)
}

/// True when the line contains at least one recognized artifact keyword.
pub fn has_artifact_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    has_any(&lower, ARTIFACT_KEYWORDS)
}

/// True when the line uses a modification verb.
pub fn has_modify_verb(line: &str) -> bool {
    let lower = line.to_lowercase();
    has_any(&lower, MODIFY_VERBS)
}

/// True when the line references a whitelisted root base file.
pub fn references_base_file(line: &str) -> bool {
    let lower = line.to_lowercase();
    has_any(&lower, BASE_FILE_WHITELIST)
}

/// True when the task warrants the CRUD structural checklist.
pub fn is_crud_task(line: &str) -> bool {
    let lower = line.to_lowercase();
    has_any(&lower, CRUD_KEYWORDS)
        || (lower.contains("crear")
            && lower.contains("leer")
            && lower.contains("actualizar")
            && lower.contains("eliminar"))
}
