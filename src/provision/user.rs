//! Lab user ensure: create, reset password, admin group membership.

use crate::config::ProvisionerConfig;
use crate::error::Result;
use crate::models::{CommandSpec, LabUser, StepOutcome};
use crate::orchestrator::executor::require_success;
use crate::system::SystemWrapper;

/// Administrative groups in order of preference.
pub const ADMIN_GROUPS: [&str; 2] = ["sudo", "wheel"];

pub fn useradd_command(user: &LabUser) -> CommandSpec {
    CommandSpec::new("useradd")
        .arg("-m")
        .arg("-s")
        .arg("/bin/bash")
        .arg(user.name.clone())
}

/// `chpasswd` with the credentials on stdin, never in argv.
pub fn chpasswd_command(user: &LabUser) -> CommandSpec {
    CommandSpec::new("chpasswd").stdin(format!("{}:{}\n", user.name, user.password))
}

pub fn ensure_user(config: &ProvisionerConfig, system: &dyn SystemWrapper) -> Result<StepOutcome> {
    let user = &config.lab_user;
    let mut outcome = StepOutcome::Done;

    if system.user_exists(&user.name) {
        log::info!("[Bootstrap] [USER] {} already exists", user.name);
        outcome = StepOutcome::Skipped(format!("user {} already exists", user.name));
    } else {
        log::info!("[Bootstrap] [USER] Creating {}", user.name);
        require_success("create lab user", system.run(&useradd_command(user))?)?;
    }

    if config.set_password {
        require_success("set password", system.run(&chpasswd_command(user))?)?;
        log::info!("[Bootstrap] [USER] Password reset for {}", user.name);
        if matches!(outcome, StepOutcome::Skipped(_)) {
            outcome = StepOutcome::Done;
        }
    }

    match ADMIN_GROUPS.iter().find(|g| system.group_exists(g)) {
        Some(group) => {
            let spec = CommandSpec::new("usermod")
                .arg("-aG")
                .arg(*group)
                .arg(user.name.clone());
            match system.run(&spec) {
                Ok(output) if output.success() => {
                    log::info!("[Bootstrap] [USER] {} is in group {}", user.name, group);
                }
                Ok(output) => {
                    let reason = format!(
                        "usermod -aG {} exited with {:?}",
                        group, output.code
                    );
                    log::warn!("[Bootstrap] [USER] {}", reason);
                    outcome = StepOutcome::Recovered(reason);
                }
                Err(e) => {
                    log::warn!("[Bootstrap] [USER] {}", e.user_message());
                    outcome = StepOutcome::Recovered(e.user_message());
                }
            }
        }
        None => {
            let reason = "neither 'sudo' nor 'wheel' group exists".to_string();
            log::warn!("[Bootstrap] [USER] {}, skipping group membership", reason);
            outcome = StepOutcome::Recovered(reason);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab_user() -> LabUser {
        LabUser {
            name: "student".to_string(),
            password: "s3cret!".to_string(),
        }
    }

    #[test]
    fn test_password_never_in_argv() {
        let spec = chpasswd_command(&lab_user());
        assert!(spec.args.is_empty());
        assert_eq!(spec.stdin.as_deref(), Some("student:s3cret!\n"));
        assert!(!spec.display().contains("s3cret"));
    }

    #[test]
    fn test_useradd_creates_home_and_shell() {
        assert_eq!(
            useradd_command(&lab_user()).argv(),
            vec!["useradd", "-m", "-s", "/bin/bash", "student"]
        );
    }
}
