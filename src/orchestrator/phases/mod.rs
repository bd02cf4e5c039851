//! Sequencer phases, one module per step.
//!
//! - **arch**: allow-list gate, fatal before anything is downloaded
//! - **install**: install-or-reuse, service account, seed credentials, first start
//! - **service**: status check with a single start attempt
//! - **ingest**: ledger-guarded one-shot upload of the sample dataset
//! - **access**: URL and credential banner, never fails
//!
//! Each phase takes the resolved config and the host seam explicitly and
//! returns a [`StepOutcome`](crate::models::StepOutcome).

pub mod access;
pub mod arch;
pub mod ingest;
pub mod install;
pub mod service;

use crate::config::SequencerConfig;
use crate::error::ConfigError;
use crate::models::CommandSpec;

/// Last path segment of a download URL, without query or fragment.
pub fn file_name_from_url(url: &str) -> Result<String, ConfigError> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");
    if name.is_empty() || name.contains(':') {
        return Err(ConfigError::ValidationFailed(format!(
            "Cannot derive a file name from URL: {}",
            url
        )));
    }
    Ok(name.to_string())
}

/// `splunk start` with the non-interactive license flags, as the service identity.
pub fn start_command(config: &SequencerConfig) -> CommandSpec {
    CommandSpec::new(config.splunk_bin().to_string_lossy().to_string())
        .arg("start")
        .arg("--accept-license")
        .arg("--answer-yes")
        .arg("--no-prompt")
        .run_as(config.service_user.clone())
}

/// `splunk status` as the service identity; exit 0 means running.
pub fn status_command(config: &SequencerConfig) -> CommandSpec {
    CommandSpec::new(config.splunk_bin().to_string_lossy().to_string())
        .arg("status")
        .run_as(config.service_user.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.com/a/splunk-9.2.1-amd64.deb").unwrap(),
            "splunk-9.2.1-amd64.deb"
        );
        assert_eq!(
            file_name_from_url("https://example.com/tutorialdata.zip?dl=1#x").unwrap(),
            "tutorialdata.zip"
        );
        assert!(file_name_from_url("https://").is_err());
    }

    #[test]
    fn test_platform_commands_run_as_service_user() {
        let config = SequencerConfig::default();
        let start = start_command(&config);
        assert_eq!(start.run_as.as_deref(), Some("splunk"));
        assert!(start.args.contains(&"--accept-license".to_string()));
        assert_eq!(
            status_command(&config).argv(),
            vec!["sudo", "-u", "splunk", "-H", "--", "/opt/splunk/bin/splunk", "status"]
        );
    }
}
