//! Config validation.

use super::{ProvisionerConfig, SequencerConfig};
use crate::error::ConfigError;
use crate::models::PackageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

// useradd's portable name rule, capped at 32 characters
static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("Invalid username regex"));

/// Validate a POSIX account name.
pub fn validate_username(name: &str) -> Result<(), ConfigError> {
    if !USERNAME_REGEX.is_match(name) {
        return Err(ConfigError::ValidationFailed(format!(
            "Invalid account name '{}': use lowercase letters, digits, '_' or '-'",
            name
        )));
    }
    Ok(())
}

fn validate_absolute(label: &str, path: &Path) -> Result<(), ConfigError> {
    if !path.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be an absolute path, got: {}",
            label,
            path.display()
        )));
    }
    Ok(())
}

fn validate_url(label: &str, url: &str) -> Result<(), ConfigError> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be an http(s) URL, got: {}",
            label, url
        )));
    }
    Ok(())
}

pub fn validate_sequencer_config(config: &SequencerConfig) -> Result<(), ConfigError> {
    validate_username(&config.service_user)?;
    validate_absolute("install_dir", &config.install_dir)?;
    validate_absolute("work_dir", &config.work_dir)?;
    validate_absolute("log_dir", &config.log_dir)?;
    validate_absolute("lock_dir", &config.lock_dir)?;
    validate_url("package_url", &config.package_url)?;
    validate_url("dataset_url", &config.dataset_url)?;

    let package_name = config
        .package_url
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .rsplit('/')
        .next()
        .unwrap_or("");
    if PackageFormat::from_file_name(package_name).is_none() {
        return Err(ConfigError::ValidationFailed(format!(
            "package_url must point at a .deb, .rpm or .tgz package, got: {}",
            config.package_url
        )));
    }

    if config.install_dir.parent().is_none() {
        return Err(ConfigError::ValidationFailed(
            "install_dir cannot be the filesystem root".to_string(),
        ));
    }
    if config.allowed_arches.is_empty() {
        return Err(ConfigError::ValidationFailed(
            "allowed_arches cannot be empty".to_string(),
        ));
    }
    if config.admin_user.is_empty() || config.admin_password.is_empty() {
        return Err(ConfigError::ValidationFailed(
            "admin credentials cannot be empty".to_string(),
        ));
    }
    if config.web_port == 0 {
        return Err(ConfigError::ValidationFailed(
            "web_port must be non-zero".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_provisioner_config(config: &ProvisionerConfig) -> Result<(), ConfigError> {
    validate_username(&config.lab_user.name)?;

    if config.lab_user.password.contains('\n') || config.lab_user.password.contains(':') {
        // chpasswd reads `user:password` lines
        return Err(ConfigError::ValidationFailed(
            "LAB_PASS cannot contain ':' or newlines".to_string(),
        ));
    }
    if config.script_src.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "SPLUNK_SCRIPT_SRC cannot be empty".to_string(),
        ));
    }
    Ok(())
}
