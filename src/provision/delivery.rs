//! Installer script delivery into the lab user's home.

use crate::config::ProvisionerConfig;
use crate::error::{ProvisionError, Result};
use crate::models::StepOutcome;
use crate::system::{files, PathRegistry, SystemWrapper};
use std::fs;

pub fn deliver_script(
    config: &ProvisionerConfig,
    system: &dyn SystemWrapper,
    paths: &PathRegistry,
) -> Result<StepOutcome> {
    if !config.script_src.is_file() {
        log::error!(
            "[Bootstrap] [DELIVER] Source script missing: {}",
            config.script_src.display()
        );
        return Err(ProvisionError::SourceMissing(config.script_src.clone()));
    }

    let dest = paths.resolve(config.delivered_script());
    let content = fs::read(&config.script_src)?;
    files::write_atomic(&dest, &content, 0o755)?;

    let owner = format!("{0}:{0}", config.lab_user.name);
    system.set_owner(&dest, &owner, false)?;

    log::info!(
        "[Bootstrap] [DELIVER] {} -> {} ({} bytes)",
        config.script_src.display(),
        dest.display(),
        content.len()
    );
    Ok(StepOutcome::Done)
}
