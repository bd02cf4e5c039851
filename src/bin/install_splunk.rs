//! Installer sequencer entry point.

use anyhow::Context;
use splunk_lab::cli::{finish, report_failure};
use splunk_lab::config::{loader, SequencerConfig, DEFAULT_SEQUENCER_CONFIG};
use splunk_lab::log_collector::init_logging;
use splunk_lab::orchestrator::{Sequencer, TOOL_NAME};
use splunk_lab::system::SystemImpl;
use std::path::Path;
use std::sync::Arc;

fn load_config() -> anyhow::Result<SequencerConfig> {
    loader::load_or_default(Path::new(DEFAULT_SEQUENCER_CONFIG))
        .with_context(|| format!("Failed to load {}", DEFAULT_SEQUENCER_CONFIG))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: ERROR: {:#}", TOOL_NAME, e);
            std::process::exit(1);
        }
    };

    let logger = init_logging(&config.log_dir, TOOL_NAME);
    log::info!(
        "[Main] {} v{} (install_dir {}, service user {})",
        TOOL_NAME,
        splunk_lab::VERSION,
        config.install_dir.display(),
        config.service_user
    );

    let system = match SystemImpl::new().context("Failed to initialize host access") {
        Ok(system) => system,
        Err(e) => {
            log::error!("[Main] {:#}", e);
            finish(&logger, 1);
        }
    };

    let code = match Sequencer::new(config, Arc::new(system)).run().await {
        Ok(_) => {
            println!("Splunk lab setup complete.");
            0
        }
        Err(e) => report_failure(TOOL_NAME, &e),
    };
    finish(&logger, code);
}
