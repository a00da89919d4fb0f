//! End-to-end pipeline tests: queue in, project out, through the real
//! worker with a scripted collaborator and shell-script builds.

use async_trait::async_trait;
use codesmith::config::Config;
use codesmith::errors::LlmError;
use codesmith::llm::TextGenerator;
use codesmith::memory::ExecutionMemory;
use codesmith::queue::{Request, RequestQueue};
use codesmith::worker::Worker;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Returns canned responses in order; the last one replays.
struct Script {
    responses: Mutex<Vec<Result<String, LlmError>>>,
}

impl Script {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        let mut responses: Vec<Result<String, LlmError>> =
            responses.into_iter().map(|s| Ok(s.to_string())).collect();
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
        })
    }
}

#[async_trait]
impl TextGenerator for Script {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(LlmError::Empty),
            1 => match &responses[0] {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(LlmError::Empty),
            },
            _ => responses.pop().unwrap_or(Err(LlmError::Empty)),
        }
    }
}

fn base_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.output_root = root.join("output");
    config.queue_file = root.join("queue.json");
    config.cache_file = root.join("cache.json");
    config.memory_file = root.join("memory.json");
    config.build_command = vec!["sh".into(), "-c".into(), "exit 0".into()];
    config
}

const PLAN: &str = "\
- Crear página Razor `Pages/Productos/Index.razor` para listar productos con su precio
- Crear modelo C# `Models/Producto.cs` con propiedades Id, Nombre y Precio
- Crear servicio `Services/ProductoService.cs` con operaciones CRUD para Producto";

const MODEL_CS: &str = "\
namespace Tienda.Models
{
    public class Producto
    {
        public int Id { get; set; }
        public string Nombre { get; set; } = string.Empty;
        public decimal Precio { get; set; }
    }
}";

const SERVICE_CS: &str = "\
namespace Tienda.Services
{
    public class ProductoService
    {
        private readonly List<Producto> _items = new();

        public Task<List<Producto>> GetAllAsync() => Task.FromResult(_items);

        public Task AddAsync(Producto producto)
        {
            _items.Add(producto);
            return Task.CompletedTask;
        }
    }
}";

const PAGE_RAZOR: &str = "\
@page \"/productos\"
@inject ProductoService Servicio

<h1>Productos</h1>

<table class=\"table\">
    @foreach (var producto in _productos)
    {
        <tr><td>@producto.Nombre</td><td>@producto.Precio</td></tr>
    }
</table>

@code {
    private List<Producto> _productos = new();

    protected override async Task OnInitializedAsync()
    {
        _productos = await Servicio.GetAllAsync();
    }
}";

#[tokio::test]
async fn full_request_generates_ordered_project() {
    let dir = tempdir().unwrap();
    let config = base_config(dir.path());
    RequestQueue::new(&config.queue_file)
        .enqueue(Request::new("Tienda Online", "CRUD de productos de la tienda"))
        .unwrap();

    // One planning call, then one generation call per task in backlog
    // order: model first, then service, then page.
    let collaborator = Script::new(vec![PLAN, MODEL_CS, SERVICE_CS, PAGE_RAZOR]);
    let worker = Worker::new(config.clone(), collaborator);
    assert_eq!(worker.drain_queue().await.unwrap(), 1);

    let project = config.output_root.join("tienda-online");
    let model = std::fs::read_to_string(project.join("Models/Producto.cs")).unwrap();
    assert!(model.contains("class Producto"));
    let service = std::fs::read_to_string(project.join("Services/ProductoService.cs")).unwrap();
    assert!(service.contains("class ProductoService"));
    let page = std::fs::read_to_string(project.join("Pages/Productos/Index.razor")).unwrap();
    assert!(page.contains("@page \"/productos\""));

    // Scaffold present alongside generated files.
    assert!(project.join("tienda-online.csproj").exists());
    assert!(project.join("Shared/NavMenu.razor").exists());

    let memory = ExecutionMemory::open(&config.memory_file);
    assert_eq!(memory.entries().len(), 1);
    let entry = &memory.entries()[0];
    assert!(entry.build_success);
    assert_eq!(entry.backlog.len(), 3);
    assert!(entry.backlog[0].contains("Models/Producto.cs"));
    assert!(entry.backlog[1].contains("Services/ProductoService.cs"));
    assert!(entry.backlog[2].contains("Pages/Productos/Index.razor"));

    assert!(
        RequestQueue::new(&config.queue_file).is_empty().unwrap(),
        "request acknowledged after the memory entry was written"
    );
}

#[tokio::test]
async fn failing_build_is_repaired_and_logs_cleaned() {
    let dir = tempdir().unwrap();
    let mut config = base_config(dir.path());
    // Fails while the generated model still references the unknown type.
    config.build_command = vec![
        "sh".into(),
        "-c".into(),
        "if grep -q TipoInexistente Models/Producto.cs; then \
            echo 'Models/Producto.cs(5,16): error CS0246: TipoInexistente no encontrado'; exit 1; \
         fi; exit 0"
            .into(),
    ];

    let broken_model = "\
namespace Tienda.Models
{
    public class Producto
    {
        public TipoInexistente Id { get; set; }
        public string Nombre { get; set; } = string.Empty;
    }
}";
    let plan = "- Crear modelo C# `Models/Producto.cs` con propiedades Id y Nombre";
    let collaborator = Script::new(vec![plan, broken_model, MODEL_CS]);

    RequestQueue::new(&config.queue_file)
        .enqueue(Request::new("Tienda", "CRUD de productos"))
        .unwrap();
    let worker = Worker::new(config.clone(), collaborator);
    assert_eq!(worker.drain_queue().await.unwrap(), 1);

    let project = config.output_root.join("tienda");
    let model = std::fs::read_to_string(project.join("Models/Producto.cs")).unwrap();
    assert!(!model.contains("TipoInexistente"), "repair replaced the bad type");

    // Both cycle logs were removed after the clean build.
    assert!(!project.join("build_errors.log").exists());
    assert!(!project.join("build_errors_after_fix_attempt_1.log").exists());

    // The correction stays in the dedup cache after the clean build;
    // entries only ever leave it through explicit removal.
    let cache_json = std::fs::read_to_string(&config.cache_file).unwrap();
    let cache: serde_json::Value = serde_json::from_str(&cache_json).unwrap();
    let keys: Vec<&String> = cache.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 1);
    assert!(
        keys[0].ends_with("models/producto.cs"),
        "cache must hold an entry for the fixed file, got: {keys:?}"
    );

    let memory = ExecutionMemory::open(&config.memory_file);
    assert!(memory.entries()[0].build_success);
}

#[tokio::test]
async fn unrepairable_build_records_failure_and_keeps_log() {
    let dir = tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.build_command = vec![
        "sh".into(),
        "-c".into(),
        "echo 'Models/Producto.cs(1,1): error CS0246: sin arreglo posible'; exit 1".into(),
    ];

    let plan = "- Crear modelo C# `Models/Producto.cs` con propiedades Id y Nombre";
    // The repair response is prose and never passes validation, so the
    // cycle stalls after the first build.
    let collaborator = Script::new(vec![plan, MODEL_CS, "No puedo corregir ese archivo."]);

    RequestQueue::new(&config.queue_file)
        .enqueue(Request::new("Tienda", "CRUD de productos"))
        .unwrap();
    let worker = Worker::new(config.clone(), collaborator);
    assert_eq!(worker.drain_queue().await.unwrap(), 1);

    let project = config.output_root.join("tienda");
    assert!(
        project.join("build_errors.log").exists(),
        "failing log kept for inspection"
    );

    let memory = ExecutionMemory::open(&config.memory_file);
    assert_eq!(memory.entries().len(), 1);
    assert!(!memory.entries()[0].build_success);
    assert!(
        RequestQueue::new(&config.queue_file).is_empty().unwrap(),
        "failed requests are still acknowledged"
    );
}

#[tokio::test]
async fn requests_process_in_fifo_order() {
    let dir = tempdir().unwrap();
    let config = base_config(dir.path());
    let queue = RequestQueue::new(&config.queue_file);
    queue.enqueue(Request::new("Primero", "nada util")).unwrap();
    queue.enqueue(Request::new("Segundo", "nada util")).unwrap();

    // Planner output survives no filter, so both requests are recorded
    // with empty backlogs.
    let collaborator = Script::new(vec!["texto sin tareas reconocibles"]);
    let worker = Worker::new(config.clone(), collaborator);
    assert_eq!(worker.drain_queue().await.unwrap(), 2);

    let memory = ExecutionMemory::open(&config.memory_file);
    assert_eq!(memory.entries().len(), 2);
    assert_eq!(memory.entries()[0].request.title, "Primero");
    assert_eq!(memory.entries()[1].request.title, "Segundo");
    assert!(queue.is_empty().unwrap());
}
