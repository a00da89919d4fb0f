//! The worker loop.
//!
//! One request at a time: peek it from the queue, scaffold its project,
//! plan a backlog, run every generation task, sweep for stubs, drive
//! correction cycles, record the outcome in execution memory, and only
//! then acknowledge the request. A crash anywhere in between leaves the
//! request queued for redelivery.

use crate::builder::BuildRunner;
use crate::cache::CorrectionCache;
use crate::completeness::CompletenessSweep;
use crate::config::Config;
use crate::diagnostics::DiagnosticLimits;
use crate::errors::GeneratorError;
use crate::generator::CodeGenerator;
use crate::generator::validate::HeuristicValidator;
use crate::llm::TextGenerator;
use crate::memory::{ExecutionMemory, MemoryEntry, current_revision};
use crate::orchestrator::Orchestrator;
use crate::planner::TaskPlanner;
use crate::queue::{Request, RequestQueue};
use crate::repair::RepairAgent;
use crate::scaffold;
use crate::util::sanitize_project_slug;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

const IDLE_POLL: Duration = Duration::from_secs(5);

/// What processing one request produced.
#[derive(Debug)]
pub struct ProcessSummary {
    pub project_dir: PathBuf,
    pub backlog_len: usize,
    pub files_generated: usize,
    pub build_success: bool,
}

pub struct Worker {
    config: Config,
    collaborator: Arc<dyn TextGenerator>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(config: Config, collaborator: Arc<dyn TextGenerator>) -> Self {
        Self {
            config,
            collaborator,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between requests and between tasks; setting it makes
    /// the worker stop at the next safe point.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    fn should_stop(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Process queued requests until the queue is empty or shutdown is
    /// requested. Returns how many requests were processed.
    pub async fn drain_queue(&self) -> Result<usize> {
        let queue = RequestQueue::new(&self.config.queue_file);
        let mut processed = 0;
        while !self.should_stop() {
            let Some(request) = queue.peek_next()? else {
                break;
            };
            match self.process_request(&request).await {
                Ok(summary) => {
                    info!(
                        title = %request.title,
                        project = %summary.project_dir.display(),
                        tasks = summary.backlog_len,
                        generated = summary.files_generated,
                        build_success = summary.build_success,
                        "Request processed"
                    );
                }
                // A broken request must not take the loop down with it;
                // record the failure and move on to the next one.
                Err(err) => {
                    error!(title = %request.title, %err, "Request failed");
                    self.record_failure(&request);
                }
            }
            queue.acknowledge(&request)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Poll the queue forever (or until shutdown).
    pub async fn run(&self) -> Result<()> {
        info!(queue = %self.config.queue_file.display(), "Worker started");
        while !self.should_stop() {
            if self.drain_queue().await? == 0 {
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
        info!("Worker stopped");
        Ok(())
    }

    /// Best-effort memory entry for a request whose pipeline aborted
    /// before writing its own, keeping the memory one-per-request.
    fn record_failure(&self, request: &Request) {
        let slug = sanitize_project_slug(&request.title);
        let revision = std::env::current_dir()
            .map(|dir| current_revision(&dir))
            .unwrap_or_default();
        let mut memory = ExecutionMemory::open(&self.config.memory_file);
        let entry = MemoryEntry {
            timestamp_utc: Utc::now(),
            request: request.clone(),
            backlog: Vec::new(),
            build_success: false,
            project_path: self.config.output_root.join(&slug),
            revision,
        };
        if let Err(err) = memory.append(entry) {
            warn!(%err, "Failed to record the failed request in execution memory");
        }
    }

    /// The full pipeline for one request.
    pub async fn process_request(&self, request: &Request) -> Result<ProcessSummary> {
        let slug = sanitize_project_slug(&request.title);
        let project_dir = self.config.output_root.join(&slug);
        std::fs::create_dir_all(&project_dir)
            .with_context(|| format!("Failed to create {}", project_dir.display()))?;
        scaffold::ensure_base_files(&project_dir, &slug)?;

        let planner = TaskPlanner::new(self.collaborator.as_ref());
        let backlog = planner.plan(request).await;

        let mut files_generated = 0;
        let mut build_success = false;

        if backlog.is_empty() {
            warn!(title = %request.title, "Empty backlog; nothing to generate");
        } else {
            let validator = HeuristicValidator;
            let generator = CodeGenerator::new(
                self.collaborator.as_ref(),
                &validator,
                project_dir.clone(),
                request.description.clone(),
                self.config.modify_delta_ratio,
            );

            for task in &backlog {
                if self.should_stop() {
                    warn!("Shutdown requested; abandoning remaining tasks");
                    break;
                }
                match generator.run_task(task).await {
                    Ok(file) => {
                        info!(task = %task, path = %file.path.display(), "Task done");
                        files_generated += 1;
                    }
                    Err(GeneratorError::Llm(err)) if err.is_quota() => {
                        warn!("Generation quota exhausted; abandoning remaining tasks");
                        break;
                    }
                    Err(err) => {
                        warn!(task = %task, %err, "Task failed; continuing with the next one");
                    }
                }
            }

            if files_generated == 0 {
                // Nothing new on disk; building would only exercise the
                // scaffold.
                warn!(title = %request.title, "No files generated; skipping build");
            } else {
                let sweep = CompletenessSweep::new(
                    self.collaborator.as_ref(),
                    &validator,
                    project_dir.clone(),
                    request.description.clone(),
                );
                sweep.run().await;

                let runner = BuildRunner::new(
                    self.config.build_command.clone(),
                    Duration::from_secs(self.config.build_timeout_secs),
                );
                let limits = DiagnosticLimits {
                    max_log_chars: self.config.max_log_chars,
                    max_lines_per_file: self.config.max_lines_per_file,
                };
                let repair = RepairAgent::new(
                    self.collaborator.as_ref(),
                    &validator,
                    project_dir.clone(),
                    limits,
                );
                let orchestrator =
                    Orchestrator::new(&runner, &repair, self.config.max_correction_cycles);
                let mut cache = CorrectionCache::open(&self.config.cache_file);
                let outcome = orchestrator.run(&project_dir, &mut cache).await?;
                build_success = outcome.build_succeeded();
            }
        }

        let revision = std::env::current_dir()
            .map(|dir| current_revision(&dir))
            .unwrap_or_default();
        let mut memory = ExecutionMemory::open(&self.config.memory_file);
        memory.append(MemoryEntry {
            timestamp_utc: Utc::now(),
            request: request.clone(),
            backlog: backlog.clone(),
            build_success,
            project_path: project_dir.clone(),
            revision,
        })?;

        Ok(ProcessSummary {
            project_dir,
            backlog_len: backlog.len(),
            files_generated,
            build_success,
        })
    }
}
