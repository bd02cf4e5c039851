//! Step 3: ensure the platform service is running.

use super::{start_command, status_command};
use crate::config::SequencerConfig;
use crate::error::{ProvisionError, Result};
use crate::models::StepOutcome;
use crate::orchestrator::executor::require_success;
use crate::system::SystemWrapper;

fn is_running(config: &SequencerConfig, system: &dyn SystemWrapper) -> Result<bool> {
    let output = system.run(&status_command(config))?;
    log::debug!(
        "[Install] [SERVICE] status exited with {:?}: {}",
        output.code,
        output.first_line().unwrap_or("")
    );
    Ok(output.success())
}

pub async fn ensure_running(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
) -> Result<StepOutcome> {
    if is_running(config, system)? {
        log::info!("[Install] [SERVICE] splunkd already running");
        return Ok(StepOutcome::Skipped("already running".to_string()));
    }

    log::info!("[Install] [SERVICE] splunkd not running, starting it");
    let output = system
        .run_long(start_command(config), "Starting Splunk".to_string())
        .await?;
    require_success("start", output)?;

    if !is_running(config, system)? {
        return Err(ProvisionError::ServiceNotRunning(format!(
            "{} status still reports stopped after start",
            config.splunk_bin().display()
        )));
    }
    Ok(StepOutcome::Done)
}
