//! Scoped elevation grant.
//!
//! The grant is one policy line allowing the lab user to run exactly one
//! absolute path as root. It is staged beside the live file, checked with
//! `visudo -cf`, and renamed into place only when the check passes. A failed
//! check leaves the live policy exactly as it was.

use crate::error::{ProvisionError, Result};
use crate::models::{CommandSpec, StepOutcome};
use crate::system::{files, PathRegistry, SystemWrapper};
use std::path::{Path, PathBuf};

/// Characters that would widen or break a sudoers command spec.
const FORBIDDEN: [char; 7] = [',', ':', '=', '\\', '*', '?', '['];

/// Reject a command path that is not a single literal absolute path.
pub fn validate_command_path(path: &Path) -> Result<()> {
    let text = path.to_str().ok_or_else(|| {
        ProvisionError::PolicyRejected(format!("{} is not valid UTF-8", path.display()))
    })?;

    if !path.is_absolute() {
        return Err(ProvisionError::PolicyRejected(format!(
            "command path must be absolute: {}",
            text
        )));
    }
    if let Some(bad) = text
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(c))
    {
        return Err(ProvisionError::PolicyRejected(format!(
            "command path {:?} contains forbidden character {:?}",
            text, bad
        )));
    }
    Ok(())
}

/// A passwordless grant for one user and one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoersGrant {
    user: String,
    command: PathBuf,
}

impl SudoersGrant {
    pub fn new(user: impl Into<String>, command: impl Into<PathBuf>) -> Result<Self> {
        let command = command.into();
        validate_command_path(&command)?;
        Ok(SudoersGrant {
            user: user.into(),
            command,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// The single policy line.
    pub fn render(&self) -> String {
        format!(
            "{} ALL=(root) NOPASSWD: {}\n",
            self.user,
            self.command.display()
        )
    }
}

/// Back up, stage, validate and promote the grant.
pub fn install_grant(
    grant: &SudoersGrant,
    system: &dyn SystemWrapper,
    paths: &PathRegistry,
) -> Result<StepOutcome> {
    let target = paths.sudoers_file(grant.user());
    files::backup_if_exists(&target)?;

    let staged = files::stage_beside(&target, grant.render().as_bytes(), 0o440)?;
    let check = CommandSpec::new("visudo").arg("-cf").path_arg(staged.path());
    let output = system.run(&check)?;
    if !output.success() {
        // dropping `staged` removes the staging file
        let reason = output
            .first_line()
            .unwrap_or("visudo reported a syntax error")
            .to_string();
        log::error!("[Bootstrap] [SUDOERS] Validation failed: {}", reason);
        return Err(ProvisionError::PolicyRejected(reason));
    }

    staged.persist(&target).map_err(|e| e.error)?;
    log::info!(
        "[Bootstrap] [SUDOERS] {} may run {} as root",
        grant.user(),
        grant.command().display()
    );
    Ok(StepOutcome::Done)
}
