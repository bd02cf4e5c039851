//! Bootstrap provisioner entry point.

use anyhow::Context;
use splunk_lab::cli::{finish, report_failure};
use splunk_lab::config::ProvisionerConfig;
use splunk_lab::log_collector::init_logging;
use splunk_lab::provision::{Provisioner, TOOL_NAME};
use splunk_lab::system::{PathRegistry, SystemImpl};
use std::sync::Arc;

fn main() {
    let config = match ProvisionerConfig::from_env().context("Invalid provisioner environment") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: ERROR: {:#}", TOOL_NAME, e);
            std::process::exit(1);
        }
    };

    let logger = init_logging(&config.log_dir, TOOL_NAME);
    log::info!(
        "[Main] {} v{} (user {}, script {}, set_password={}, ssh_banner={})",
        TOOL_NAME,
        splunk_lab::VERSION,
        config.lab_user.name,
        config.script_src.display(),
        config.set_password,
        config.configure_ssh_banner
    );

    let system = match SystemImpl::new().context("Failed to initialize host access") {
        Ok(system) => system,
        Err(e) => {
            log::error!("[Main] {:#}", e);
            finish(&logger, 1);
        }
    };

    let provisioner = Provisioner::new(config, Arc::new(system), PathRegistry::host());
    let code = match provisioner.run() {
        Ok(_) => {
            println!("Lab VM is ready. Log in as {}.", provisioner.config().lab_user.name);
            0
        }
        Err(e) => report_failure(TOOL_NAME, &e),
    };
    finish(&logger, code);
}
