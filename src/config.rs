//! Runtime configuration.
//!
//! Everything that was a hard-coded literal in earlier revisions (queue
//! file, cache file, output root, cycle budget) is an injected field here.
//! Values come from `codesmith.toml` next to the working directory, with
//! CLI flags layered on top by `main.rs`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration for the worker and its collaborators.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which every generated project lives.
    pub output_root: PathBuf,
    /// Persisted FIFO of pending requests.
    pub queue_file: PathBuf,
    /// Correction cache file (path -> diagnostic hash).
    pub cache_file: PathBuf,
    /// Append-only execution memory file.
    pub memory_file: PathBuf,
    /// Maximum correction cycles per request; values < 1 mean unbounded.
    pub max_correction_cycles: i32,
    /// Hard wall-clock limit for one build invocation, in seconds.
    pub build_timeout_secs: u64,
    /// Build command; first element is the program, the rest its args.
    pub build_command: Vec<String>,
    /// Modification size-delta guard: reject patched content whose length
    /// differs from the original by more than this ratio.
    pub modify_delta_ratio: f64,
    /// Character budget applied to a build log before diagnostic parsing.
    pub max_log_chars: usize,
    /// Per-file cap on diagnostic snippet lines.
    pub max_lines_per_file: usize,
    /// Generation model name.
    pub model: String,
    /// API key for the generation service.
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            queue_file: PathBuf::from("request-queue.json"),
            cache_file: PathBuf::from("corrected_errors.json"),
            memory_file: PathBuf::from("execution_memory.json"),
            max_correction_cycles: 4,
            build_timeout_secs: 60,
            build_command: vec![
                "dotnet".to_string(),
                "build".to_string(),
                "--nologo".to_string(),
                "-v".to_string(),
                "q".to_string(),
            ],
            modify_delta_ratio: 0.75,
            max_log_chars: 20_000,
            max_lines_per_file: 50,
            model: "gemini-2.0-flash".to_string(),
            api_key: String::new(),
        }
    }
}

/// Raw TOML structure for `codesmith.toml`. Every field is optional;
/// missing ones fall back to defaults.
#[derive(Debug, Deserialize)]
struct ConfigToml {
    worker: Option<WorkerSection>,
    generator: Option<GeneratorSection>,
}

#[derive(Debug, Deserialize)]
struct WorkerSection {
    output_root: Option<PathBuf>,
    queue_file: Option<PathBuf>,
    cache_file: Option<PathBuf>,
    memory_file: Option<PathBuf>,
    max_correction_cycles: Option<i32>,
    build_timeout_secs: Option<u64>,
    build_command: Option<Vec<String>>,
    max_log_chars: Option<usize>,
    max_lines_per_file: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GeneratorSection {
    model: Option<String>,
    api_key: Option<String>,
    modify_delta_ratio: Option<f64>,
}

impl Config {
    /// Load configuration from `codesmith.toml` in `dir`, falling back to
    /// defaults when the file is absent. The API key may also come from
    /// the `CODESMITH_API_KEY` environment variable, which wins over the
    /// file so keys can stay out of checked-in config.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("codesmith.toml");
        let mut config = Config::default();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let toml: ConfigToml = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?;

            if let Some(worker) = toml.worker {
                if let Some(v) = worker.output_root {
                    config.output_root = v;
                }
                if let Some(v) = worker.queue_file {
                    config.queue_file = v;
                }
                if let Some(v) = worker.cache_file {
                    config.cache_file = v;
                }
                if let Some(v) = worker.memory_file {
                    config.memory_file = v;
                }
                if let Some(v) = worker.max_correction_cycles {
                    config.max_correction_cycles = v;
                }
                if let Some(v) = worker.build_timeout_secs {
                    config.build_timeout_secs = v;
                }
                if let Some(v) = worker.build_command
                    && !v.is_empty()
                {
                    config.build_command = v;
                }
                if let Some(v) = worker.max_log_chars {
                    config.max_log_chars = v;
                }
                if let Some(v) = worker.max_lines_per_file {
                    config.max_lines_per_file = v;
                }
            }
            if let Some(generator) = toml.generator {
                if let Some(v) = generator.model {
                    config.model = v;
                }
                if let Some(v) = generator.api_key {
                    config.api_key = v;
                }
                if let Some(v) = generator.modify_delta_ratio {
                    config.modify_delta_ratio = v;
                }
            }
        }

        if let Ok(key) = std::env::var("CODESMITH_API_KEY") {
            config.api_key = key;
        }

        // Relative paths are anchored at the config directory.
        for path in [
            &mut config.output_root,
            &mut config.queue_file,
            &mut config.cache_file,
            &mut config.memory_file,
        ] {
            if path.is_relative() {
                let anchored = dir.join(path.as_path());
                *path = anchored;
            }
        }

        Ok(config)
    }
}
