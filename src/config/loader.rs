//! Config file loader and environment override resolution.

use super::{ProvisionerConfig, SequencerConfig};
use crate::config::validator;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Load sequencer config from a TOML file.
pub fn load_config_from_file(path: &Path) -> Result<SequencerConfig, ConfigError> {
    validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: SequencerConfig = toml::from_str(&content)?;
    validator::validate_sequencer_config(&config)?;
    Ok(config)
}

/// Load the sequencer config, falling back to defaults when the file is absent.
///
/// A file that exists but does not parse or validate is still an error.
pub fn load_or_default(path: &Path) -> Result<SequencerConfig, ConfigError> {
    match load_config_from_file(path) {
        Ok(config) => {
            log::info!("[Config] Loaded installer settings from {}", path.display());
            Ok(config)
        }
        Err(ConfigError::FileNotFound(_)) => {
            log::debug!("[Config] {} absent, using built-in defaults", path.display());
            Ok(SequencerConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Validate config path (.toml extension required).
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension() {
        Some(ext) if ext == "toml" => Ok(()),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .toml extension, got .{}",
            ext.to_string_lossy()
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .toml extension".to_string(),
        )),
    }
}

/// Parse a `0`/`1` flag value.
fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

impl ProvisionerConfig {
    /// Resolve provisioner settings from environment-style lookups.
    ///
    /// Recognized keys: `LAB_USER`, `LAB_PASS`, `SPLUNK_SCRIPT_SRC`,
    /// `SET_PASSWORD`, `CONFIGURE_SSH_BANNER`. Empty values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = ProvisionerConfig::default();

        if let Some(user) = get("LAB_USER") {
            config.lab_user.name = user;
        }
        if let Some(pass) = get("LAB_PASS") {
            config.lab_user.password = pass;
        }
        if let Some(src) = get("SPLUNK_SCRIPT_SRC") {
            config.script_src = PathBuf::from(src);
        }
        if let Some(flag) = get("SET_PASSWORD") {
            config.set_password = parse_flag("SET_PASSWORD", &flag)?;
        }
        if let Some(flag) = get("CONFIGURE_SSH_BANNER") {
            config.configure_ssh_banner = parse_flag("CONFIGURE_SSH_BANNER", &flag)?;
        }

        validator::validate_provisioner_config(&config)?;
        Ok(config)
    }

    /// Resolve provisioner settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_defaults() {
        let cfg = ProvisionerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, ProvisionerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ProvisionerConfig::from_lookup(lookup_from(&[
            ("LAB_USER", "student1"),
            ("LAB_PASS", "pw-123"),
            ("SPLUNK_SCRIPT_SRC", "/srv/lab/InstallSplunk.sh"),
            ("SET_PASSWORD", "0"),
            ("CONFIGURE_SSH_BANNER", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.lab_user.name, "student1");
        assert_eq!(cfg.lab_user.password, "pw-123");
        assert_eq!(cfg.script_src, PathBuf::from("/srv/lab/InstallSplunk.sh"));
        assert!(!cfg.set_password);
        assert!(!cfg.configure_ssh_banner);
        assert_eq!(
            cfg.delivered_script(),
            PathBuf::from("/home/student1/InstallSplunk.sh")
        );
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let result = ProvisionerConfig::from_lookup(lookup_from(&[("SET_PASSWORD", "yes")]));
        assert!(matches!(result, Err(ConfigError::InvalidFlag { .. })));
    }

    #[test]
    fn test_invalid_user_rejected() {
        let result = ProvisionerConfig::from_lookup(lookup_from(&[("LAB_USER", "bad user")]));
        assert!(matches!(result, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = load_or_default(&temp_dir.path().join("installer.toml")).unwrap();
        assert_eq!(cfg, SequencerConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installer.toml");
        fs::write(
            &path,
            "min_free_gb = 20\nallowed_arches = [\"x86_64\", \"aarch64\"]\n\n[ingest]\nindex = \"lab\"\n",
        )
        .unwrap();

        let cfg = load_config_from_file(&path).unwrap();
        assert_eq!(cfg.min_free_gb, 20);
        assert_eq!(cfg.allowed_arches.len(), 2);
        assert_eq!(cfg.ingest.index, "lab");
        assert_eq!(cfg.ingest.sourcetype, "lab_tutorial");
        assert_eq!(cfg.service_user, "splunk");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installer.toml");
        fs::write(&path, "min_free_gb = [[").unwrap();
        assert!(matches!(
            load_or_default(&path),
            Err(ConfigError::InvalidToml(_))
        ));
    }

    #[test]
    fn test_validate_config_path_extension() {
        assert!(validate_config_path(Path::new("/etc/splunk-lab/installer.toml")).is_ok());
        assert!(validate_config_path(Path::new("installer.json")).is_err());
        assert!(validate_config_path(Path::new("installer")).is_err());
        assert!(validate_config_path(Path::new("")).is_err());
    }
}
