//! Step 2: install-or-reuse.
//!
//! Guard: `<install_dir>/bin/splunk` exists. A reused install only gets its
//! service account and ownership normalized. A fresh install downloads the
//! package, installs it, seeds admin credentials and performs the first start
//! under the service identity.

use super::{file_name_from_url, start_command};
use crate::config::SequencerConfig;
use crate::error::{ConfigError, ProvisionError, Result};
use crate::hardware::gib_to_bytes;
use crate::models::{CommandSpec, PackageFormat, StepOutcome};
use crate::orchestrator::checkpoint::StepLedger;
use crate::orchestrator::executor::require_success;
use crate::orchestrator::state::SequencerStep;
use crate::system::{files, SystemWrapper};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub async fn install_or_reuse(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
    ledger: &mut StepLedger,
) -> Result<StepOutcome> {
    let identity = config.service_identity();

    if config.splunk_bin().exists() {
        log::info!(
            "[Install] [REUSE] {} present, skipping installation",
            config.splunk_bin().display()
        );
        ensure_service_account(config, system)?;
        system.set_owner(&config.install_dir, &identity.owner_spec(), true)?;

        if first_start_pending(config, ledger) {
            log::warn!(
                "[Install] [REUSE] Admin account was never created, repeating first start"
            );
            return complete_first_start(config, system, ledger).await;
        }
        return Ok(StepOutcome::Skipped(format!(
            "already installed at {}",
            config.install_dir.display()
        )));
    }

    let package_name = file_name_from_url(&config.package_url)?;
    let format = PackageFormat::from_file_name(&package_name).ok_or_else(|| {
        ConfigError::ValidationFailed(format!(
            "Unsupported package type '{}': expected .deb, .rpm or .tgz",
            package_name
        ))
    })?;
    let install_parent = install_parent(config);

    check_free_space(config, system, &install_parent)?;

    fs::create_dir_all(&config.work_dir)?;
    let package = config.work_dir.join(&package_name);
    let bytes = system
        .download(config.package_url.clone(), package.clone())
        .await?;
    log::info!("[Install] [DOWNLOAD] {} ({} bytes)", package.display(), bytes);

    if format == PackageFormat::Tarball {
        fs::create_dir_all(&install_parent)?;
    }
    let installed = system
        .run_long(
            format.install_command(&package, &install_parent),
            "Installing Splunk package".to_string(),
        )
        .await;
    remove_quietly(&package);
    require_success("install", installed?)?;

    ensure_service_account(config, system)?;
    system.set_owner(&config.install_dir, &identity.owner_spec(), true)?;

    complete_first_start(config, system, ledger).await
}

/// A present binary whose first start never finished: the step is not in the
/// ledger and no admin account database exists yet.
fn first_start_pending(config: &SequencerConfig, ledger: &StepLedger) -> bool {
    !ledger.is_completed(SequencerStep::InstallOrReuse) && !config.passwd_file().exists()
}

/// Seed the admin credentials, start once as the service identity and enable
/// boot-start. The seed never outlives this function.
async fn complete_first_start(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
    ledger: &mut StepLedger,
) -> Result<StepOutcome> {
    write_seed_file(config, system)?;

    let started = match system
        .run_long(start_command(config), "Starting Splunk (first run)".to_string())
        .await
    {
        Ok(output) => require_success("first start", output),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = started {
        remove_quietly(&config.seed_file());
        return Err(e);
    }

    let outcome = enable_boot_start(config, system);
    remove_quietly(&config.seed_file());

    ledger.mark_completed(SequencerStep::InstallOrReuse)?;
    Ok(outcome)
}

/// Directory the package unpacks into (`/opt` for `/opt/splunk`).
fn install_parent(config: &SequencerConfig) -> PathBuf {
    config
        .install_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Warn and ask before installing onto a nearly full filesystem.
fn check_free_space(
    config: &SequencerConfig,
    system: &dyn SystemWrapper,
    target: &Path,
) -> Result<()> {
    let free = match system.free_space_bytes(target) {
        Ok(free) => free,
        Err(e) => {
            log::warn!("[Install] [DISK] Free space probe failed ({}), continuing", e);
            return Ok(());
        }
    };

    let threshold = gib_to_bytes(config.min_free_gb);
    if free >= threshold {
        return Ok(());
    }

    let free_gib = free as f64 / gib_to_bytes(1) as f64;
    log::warn!(
        "[Install] [DISK] Only {:.1} GiB free on {} (recommended: {} GiB)",
        free_gib,
        target.display(),
        config.min_free_gb
    );
    let prompt = format!(
        "Only {:.1} GiB free under {} (recommended {} GiB). Continue anyway?",
        free_gib,
        target.display(),
        config.min_free_gb
    );
    if !system.confirm(&prompt) {
        return Err(ProvisionError::Declined);
    }
    Ok(())
}

/// Create the service account if it does not exist yet.
fn ensure_service_account(config: &SequencerConfig, system: &dyn SystemWrapper) -> Result<()> {
    let identity = config.service_identity();
    if system.user_exists(&identity.user) {
        return Ok(());
    }

    log::info!("[Install] [ACCOUNT] Creating service account {}", identity.user);
    let spec = CommandSpec::new("useradd")
        .arg("--system")
        .arg("--user-group")
        .arg("--home-dir")
        .path_arg(&config.install_dir)
        .arg("--shell")
        .arg("/bin/bash")
        .arg(identity.user.clone());
    require_success("create service account", system.run(&spec)?)?;
    Ok(())
}

/// Seed file content consumed by the first start.
pub fn seed_contents(config: &SequencerConfig) -> String {
    format!(
        "[user_info]\nUSERNAME = {}\nPASSWORD = {}\n",
        config.admin_user, config.admin_password
    )
}

fn write_seed_file(config: &SequencerConfig, system: &dyn SystemWrapper) -> Result<()> {
    let seed = config.seed_file();
    files::write_atomic(&seed, seed_contents(config).as_bytes(), 0o600)?;
    system.set_owner(&seed, &config.service_identity().owner_spec(), false)?;
    log::info!("[Install] [SEED] Wrote {}", seed.display());
    Ok(())
}

/// Best-effort start-on-boot integration. Runs as root because it writes
/// init integration outside the install directory.
fn enable_boot_start(config: &SequencerConfig, system: &dyn SystemWrapper) -> StepOutcome {
    let spec = CommandSpec::new(config.splunk_bin().to_string_lossy().to_string())
        .arg("enable")
        .arg("boot-start")
        .arg("-user")
        .arg(config.service_user.clone())
        .arg("-systemd-managed")
        .arg("0")
        .arg("--accept-license")
        .arg("--answer-yes")
        .arg("--no-prompt");

    let reason = match system.run(&spec) {
        Ok(output) if output.success() => return StepOutcome::Done,
        Ok(output) => format!(
            "boot-start exited with {:?}: {}",
            output.code,
            output.first_line().unwrap_or("")
        ),
        Err(e) => e.user_message(),
    };
    log::warn!("[Install] [BOOT] Could not enable boot-start: {}", reason);
    StepOutcome::Recovered(reason)
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("[Install] [CLEANUP] Removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("[Install] [CLEANUP] Could not remove {}: {}", path.display(), e),
    }
}
