//! Step 4: one-time sample data ingestion.

use super::file_name_from_url;
use crate::config::SequencerConfig;
use crate::error::Result;
use crate::models::{CommandSpec, StepOutcome};
use crate::orchestrator::checkpoint::StepLedger;
use crate::orchestrator::executor::require_success;
use crate::orchestrator::state::SequencerStep;
use crate::system::SystemWrapper;
use std::fs;
use std::path::Path;

/// `splunk add oneshot` for `file`, tagged with the configured metadata.
pub fn oneshot_command(config: &SequencerConfig, file: &Path) -> CommandSpec {
    let meta = &config.ingest;
    CommandSpec::new(config.splunk_bin().to_string_lossy().to_string())
        .arg("add")
        .arg("oneshot")
        .path_arg(file)
        .arg("-index")
        .arg(meta.index.clone())
        .arg("-sourcetype")
        .arg(meta.sourcetype.clone())
        .arg("-rename-source")
        .arg(meta.source.clone())
        .arg("-host")
        .arg(meta.host.clone())
        .arg("-auth")
        .secret_arg(format!("{}:{}", config.admin_user, config.admin_password))
        .run_as(config.service_user.clone())
}

pub async fn ingest_sample(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
    ledger: &mut StepLedger,
) -> Result<StepOutcome> {
    if ledger.is_completed(SequencerStep::IngestSample) {
        log::info!("[Install] [INGEST] Ledger says the dataset was already uploaded");
        return Ok(StepOutcome::Skipped("sample data already ingested".to_string()));
    }

    let dataset_dir = config.dataset_dir();
    fs::create_dir_all(&dataset_dir)?;
    let dataset = dataset_dir.join(file_name_from_url(&config.dataset_url)?);

    system
        .download(config.dataset_url.clone(), dataset.clone())
        .await?;
    system.set_owner(&dataset_dir, &config.service_identity().owner_spec(), true)?;

    let output = system
        .run_long(
            oneshot_command(config, &dataset),
            "Uploading tutorial data".to_string(),
        )
        .await?;
    require_success("ingest", output)?;

    ledger.mark_completed(SequencerStep::IngestSample)?;
    Ok(StepOutcome::Done)
}
