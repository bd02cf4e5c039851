//! Step 1: architecture gate.

use crate::config::SequencerConfig;
use crate::error::{ProvisionError, Result};
use crate::hardware::arch_allowed;
use crate::models::StepOutcome;
use crate::system::SystemWrapper;

pub fn check_architecture(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
) -> Result<StepOutcome> {
    let arch = system.host_arch()?;
    if !arch_allowed(&arch, &config.allowed_arches) {
        log::error!(
            "[Install] [ARCH] {} is not in the allow-list {:?}",
            arch,
            config.allowed_arches
        );
        return Err(ProvisionError::UnsupportedArch {
            arch,
            allowed: config.allowed_arches.join(", "),
        });
    }
    log::info!("[Install] [ARCH] Host architecture {} is supported", arch);
    Ok(StepOutcome::Done)
}
