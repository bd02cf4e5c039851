//! Installer sequencer: 5-step pipeline (architecture -> install -> service -> ingest -> access).
//!
//! Steps run strictly in order. A step returns a [`StepOutcome`] for anything
//! the run survives and an error for anything that must stop it; the first
//! error ends the run. Re-running the whole sequencer is the only recovery.

pub mod checkpoint;
pub mod executor;
pub mod phases;
pub mod state;

pub use checkpoint::StepLedger;
pub use executor::{require_success, run_captured, Spinner, SPINNER_INTERVAL, TAIL_LINES};
pub use state::{SequencerStep, StepState};

use crate::config::SequencerConfig;
use crate::error::{ProvisionError, Result};
use crate::models::StepOutcome;
use crate::system::{RunLock, SystemWrapper};
use std::fs;
use std::sync::Arc;

/// Lock and log name of the sequencer.
pub const TOOL_NAME: &str = "install_splunk";

/// Outcome of every step that ran, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: Vec<(SequencerStep, StepOutcome)>,
}

impl RunSummary {
    pub fn outcome(&self, step: SequencerStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }
}

/// Drives the installer steps against a host.
pub struct Sequencer {
    config: SequencerConfig,
    system: Arc<dyn SystemWrapper>,
}

impl Sequencer {
    pub fn new(config: SequencerConfig, system: Arc<dyn SystemWrapper>) -> Self {
        Sequencer { config, system }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Run every step in order.
    ///
    /// Preconditions (root, run lock) are checked before the first step.
    pub async fn run(&self) -> Result<RunSummary> {
        let uid = self.system.effective_uid();
        if uid != 0 {
            return Err(ProvisionError::NotRoot(uid));
        }
        let _lock = RunLock::acquire(&self.config.lock_dir, TOOL_NAME)?;

        fs::create_dir_all(&self.config.work_dir)?;
        let mut ledger = StepLedger::load(&self.config.ledger_path());
        log::info!(
            "[Install] [PREPARATION] Work dir {}, ledger {}",
            self.config.work_dir.display(),
            ledger.path().display()
        );

        let mut summary = RunSummary::default();
        for step in SequencerStep::ALL {
            println!(
                "==> [{}/{}] {}",
                step.number(),
                SequencerStep::ALL.len(),
                step.title()
            );
            log::info!("[Install] [STEP {}] {}", step.number(), step.as_str());

            let outcome = match self.run_step(step, &mut ledger).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("[Install] [STEP {}] {} failed: {}", step.number(), step.as_str(), e);
                    return Err(e);
                }
            };

            match &outcome {
                StepOutcome::Skipped(reason) => println!("    skipped: {}", reason),
                StepOutcome::Recovered(warning) => println!("    warning: {}", warning),
                StepOutcome::Done | StepOutcome::Ignored => {}
            }
            log::info!(
                "[Install] [STEP {}] {}: {}",
                step.number(),
                step.as_str(),
                outcome.label()
            );
            summary.steps.push((step, outcome));
        }

        Ok(summary)
    }

    async fn run_step(&self, step: SequencerStep, ledger: &mut StepLedger) -> Result<StepOutcome> {
        let config = &self.config;
        let system = self.system.as_ref();
        match step {
            SequencerStep::ArchGate => phases::arch::check_architecture(config, system),
            SequencerStep::InstallOrReuse => {
                phases::install::install_or_reuse(config, system, ledger).await
            }
            SequencerStep::EnsureRunning => phases::service::ensure_running(config, system).await,
            SequencerStep::IngestSample => {
                phases::ingest::ingest_sample(config, system, ledger).await
            }
            SequencerStep::AccessInfo => Ok(phases::access::report_access(config, system)),
        }
    }
}
