//! Bootstrap provisioner: lab user, script delivery, scoped elevation, banners.
//!
//! # Module Structure
//!
//! - `user`: create the lab account, reset its password, join an admin group
//! - `delivery`: copy the installer into the lab user's home
//! - `sudoers`: stage, validate and promote the single-command grant
//! - `banner`: render and write the login banners
//! - `sshd`: point sshd at the pre-login banner and reload it

pub mod banner;
pub mod delivery;
pub mod sshd;
pub mod sudoers;
pub mod user;

pub use banner::{render_banners, BannerSet};
pub use sudoers::SudoersGrant;

use crate::config::ProvisionerConfig;
use crate::error::{ProvisionError, Result};
use crate::models::StepOutcome;
use crate::system::{PathRegistry, RunLock, SystemWrapper};
use std::sync::Arc;

/// Lock and log name of the provisioner.
pub const TOOL_NAME: &str = "lab_bootstrap";

/// Outcome of each provisioning operation, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub steps: Vec<(&'static str, StepOutcome)>,
}

impl ProvisionSummary {
    fn record(&mut self, name: &'static str, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Recovered(warning) => println!("    {}: warning: {}", name, warning),
            other => println!("    {}: {}", name, other.label()),
        }
        self.steps.push((name, outcome));
    }

    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, outcome)| outcome)
    }
}

pub struct Provisioner {
    config: ProvisionerConfig,
    system: Arc<dyn SystemWrapper>,
    paths: PathRegistry,
}

impl Provisioner {
    pub fn new(config: ProvisionerConfig, system: Arc<dyn SystemWrapper>, paths: PathRegistry) -> Self {
        Provisioner {
            config,
            system,
            paths,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn run(&self) -> Result<ProvisionSummary> {
        let uid = self.system.effective_uid();
        if uid != 0 {
            return Err(ProvisionError::NotRoot(uid));
        }
        let _lock = RunLock::acquire(&self.config.lock_dir, TOOL_NAME)?;

        // a grant that could never validate must fail before anything changes
        let grant = SudoersGrant::new(
            self.config.lab_user.name.clone(),
            self.config.delivered_script(),
        )?;
        let system = self.system.as_ref();
        let mut summary = ProvisionSummary::default();

        println!("==> Ensuring lab user {}", self.config.lab_user.name);
        summary.record("user", user::ensure_user(&self.config, system)?);

        println!("==> Delivering {}", self.config.script_name());
        summary.record(
            "delivery",
            delivery::deliver_script(&self.config, system, &self.paths)?,
        );

        println!("==> Granting scoped sudo for {}", grant.command().display());
        summary.record("sudoers", sudoers::install_grant(&grant, system, &self.paths)?);

        println!("==> Writing login banners");
        let banners = render_banners(&self.config);
        summary.record("banners", banner::write_banners(&banners, &self.paths)?);

        println!("==> Configuring SSH banner");
        summary.record(
            "sshd",
            sshd::configure_ssh_banner(&self.config, &banners.pre_login, system, &self.paths)?,
        );

        log::info!("[Bootstrap] Provisioning complete for {}", self.config.lab_user.name);
        Ok(summary)
    }
}
