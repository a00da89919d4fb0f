use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codesmith::config::Config;
use codesmith::llm::GeminiClient;
use codesmith::memory::ExecutionMemory;
use codesmith::queue::{Request, RequestQueue};
use codesmith::server;
use codesmith::worker::Worker;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "codesmith")]
#[command(version, about = "Autonomous code-generation worker")]
struct Cli {
    /// Directory holding codesmith.toml and the state files.
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker loop, processing queued requests until stopped
    Run {
        /// Process the current queue and exit instead of polling forever
        #[arg(long)]
        once: bool,
    },
    /// Serve the HTTP intake endpoint (POST /request)
    Serve {
        #[arg(short, long, default_value = "8081")]
        port: u16,
    },
    /// Add a request to the queue from the command line
    Enqueue {
        title: String,
        description: String,
    },
    /// Print the execution memory
    Memory,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let work_dir = match cli.work_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = Config::load(&work_dir)?;

    match cli.command {
        Commands::Run { once } => run_worker(config, once).await,
        Commands::Serve { port } => server::serve(port, config.queue_file.clone()).await,
        Commands::Enqueue { title, description } => {
            let queue = RequestQueue::new(&config.queue_file);
            queue.enqueue(Request::new(title, description))?;
            info!(pending = queue.len()?, "Request enqueued");
            Ok(())
        }
        Commands::Memory => print_memory(&config),
    }
}

async fn run_worker(config: Config, once: bool) -> Result<()> {
    if config.api_key.trim().is_empty() {
        bail!(
            "No API key configured; set CODESMITH_API_KEY or [generator].api_key in codesmith.toml"
        );
    }
    let collaborator = Arc::new(GeminiClient::new(
        config.api_key.clone(),
        config.model.clone(),
    ));
    let worker = Worker::new(config, collaborator);

    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current task before stopping");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    if once {
        let processed = worker.drain_queue().await?;
        info!(processed, "Queue drained");
        Ok(())
    } else {
        worker.run().await
    }
}

fn print_memory(config: &Config) -> Result<()> {
    let memory = ExecutionMemory::open(&config.memory_file);
    if memory.entries().is_empty() {
        println!("Execution memory is empty.");
        return Ok(());
    }
    for entry in memory.entries() {
        let status = if entry.build_success { "ok" } else { "failed" };
        println!(
            "{} [{status}] {} -> {} ({} tasks)",
            entry.timestamp_utc.format("%Y-%m-%d %H:%M:%S"),
            entry.request.title,
            entry.project_path.display(),
            entry.backlog.len()
        );
    }
    Ok(())
}
