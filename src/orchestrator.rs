//! Build-and-repair correction cycles.
//!
//! After generation the project is built; while the build fails and the
//! cycle budget allows, the repair agent gets one pass over the build
//! log and the project is rebuilt. The loop terminates on success, on a
//! cycle that repairs nothing, on quota exhaustion, or when the budget
//! runs out.

use crate::builder::BuildRunner;
use crate::cache::CorrectionCache;
use crate::repair::RepairAgent;
use anyhow::Result;
use std::path::Path;
use tracing::{error, info, warn};

/// Terminal state of a correction run. `cycles` counts build invocations.
#[derive(Debug)]
pub enum CorrectionOutcome {
    /// The build succeeded.
    Clean { cycles: u32 },
    /// A repair pass changed nothing, so rebuilding would be futile.
    Stalled { cycles: u32 },
    /// The cycle budget ran out with the build still failing.
    Exhausted { cycles: u32 },
    /// Generation quota was exhausted before anything could be fixed.
    QuotaAborted { cycles: u32 },
    /// The repair agent itself failed (unreadable log, persistence error).
    RepairFailed { cycles: u32, reason: String },
}

impl CorrectionOutcome {
    pub fn build_succeeded(&self) -> bool {
        matches!(self, CorrectionOutcome::Clean { .. })
    }

    pub fn cycles(&self) -> u32 {
        match self {
            CorrectionOutcome::Clean { cycles }
            | CorrectionOutcome::Stalled { cycles }
            | CorrectionOutcome::Exhausted { cycles }
            | CorrectionOutcome::QuotaAborted { cycles }
            | CorrectionOutcome::RepairFailed { cycles, .. } => *cycles,
        }
    }
}

pub struct Orchestrator<'a> {
    runner: &'a BuildRunner,
    repair: &'a RepairAgent<'a>,
    /// Values below 1 mean unbounded.
    max_cycles: i32,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a BuildRunner, repair: &'a RepairAgent<'a>, max_cycles: i32) -> Self {
        Self {
            runner,
            repair,
            max_cycles,
        }
    }

    /// Drive correction cycles for one project until a terminal state.
    pub async fn run(
        &self,
        project_dir: &Path,
        cache: &mut CorrectionCache,
    ) -> Result<CorrectionOutcome> {
        let mut cycle: u32 = 1;

        loop {
            let (outcome, log_path) = self.runner.build_cycle(project_dir, cycle).await?;

            if outcome.succeeded() {
                BuildRunner::clean_logs(project_dir, cycle);
                info!(cycles = cycle, "Project builds cleanly");
                return Ok(CorrectionOutcome::Clean { cycles: cycle });
            }

            if self.max_cycles >= 1 && cycle as i32 >= self.max_cycles {
                error!(
                    cycles = cycle,
                    "Cycle budget exhausted with the build still failing"
                );
                return Ok(CorrectionOutcome::Exhausted { cycles: cycle });
            }

            let report = match self.repair.repair_from_log(&log_path, cache).await {
                Ok(report) => report,
                Err(err) => {
                    error!(cycles = cycle, %err, "Repair run failed");
                    return Ok(CorrectionOutcome::RepairFailed {
                        cycles: cycle,
                        reason: err.to_string(),
                    });
                }
            };

            if report.corrected.is_empty() {
                if report.quota_hit {
                    return Ok(CorrectionOutcome::QuotaAborted { cycles: cycle });
                }
                // Nothing changed on disk; another build would reproduce
                // the same log.
                warn!(cycles = cycle, "Repair pass fixed no files; stopping");
                return Ok(CorrectionOutcome::Stalled { cycles: cycle });
            }

            cycle += 1;
        }
    }
}
