//! Unified error type hierarchy for Splunk Lab provisioning
//!
//! Provides structured error handling with HostError, ConfigError, ProvisionError
//! and AppError. ProvisionError carries the exit-code mapping used by both binaries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Host probing errors (architecture, disk, network facts).
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Architecture detection failed: {0}")]
    ArchDetectionFailed(String),

    #[error("Disk space probe failed for {0}")]
    DiskProbeFailed(String),

    #[error("Identity lookup failed: {0}")]
    IdentityLookupFailed(String),

    #[error("IO error during host probing: {0}")]
    IoError(#[from] io::Error),
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Config serialization failed: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value '{value}' for {name}: expected 0 or 1")]
    InvalidFlag { name: String, value: String },

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Run-level errors for the sequencer and the provisioner.
///
/// Every variant maps to a process exit code through [`ProvisionError::exit_code`].
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("This program must be run as root (effective uid {0})")]
    NotRoot(u32),

    #[error("Unsupported CPU architecture '{arch}' (allowed: {allowed})")]
    UnsupportedArch { arch: String, allowed: String },

    #[error("Source script not found at {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Elevation policy rejected: {0}")]
    PolicyRejected(String),

    #[error("Another run is in progress (lock held on {})", .0.display())]
    LockHeld(PathBuf),

    #[error("Installation declined by operator")]
    Declined,

    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed {
        step: String,
        code: i32,
        tail: Vec<String>,
    },

    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Service did not reach running state: {0}")]
    ServiceNotRunning(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Command(#[from] AppError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProvisionError {
    /// Exit status for the process when this error ends a run.
    ///
    /// Step failures propagate the child's own status; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProvisionError::StepFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// Voluntary stops are reported to the operator without an error banner.
    pub fn is_voluntary(&self) -> bool {
        matches!(self, ProvisionError::Declined)
    }

    /// Captured output tail, if this error came from a failed child process.
    pub fn output_tail(&self) -> &[String] {
        match self {
            ProvisionError::StepFailed { tail, .. } => tail,
            _ => &[],
        }
    }
}

/// OS command error with a user-facing message.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// OS command failed to launch or reported failure (useradd, visudo, chpasswd)
    #[error("Command '{cmd}' failed: {reason}")]
    OsCommand { cmd: String, reason: String },

    /// File I/O error (read/write/delete)
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid input (e.g., user name with shell chars)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Get a user-facing error message suitable for the terminal
    pub fn user_message(&self) -> String {
        match self {
            AppError::OsCommand { cmd, reason } => {
                format!("Failed to execute '{}': {}", cmd, reason)
            }
            AppError::Io(msg) => format!("File operation failed: {}", msg),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

/// Top-level result type for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_propagates_child_code() {
        let err = ProvisionError::StepFailed {
            step: "install".to_string(),
            code: 42,
            tail: vec!["dpkg: error".to_string()],
        };
        assert_eq!(err.exit_code(), 42);
        assert_eq!(err.output_tail(), &["dpkg: error".to_string()]);
    }

    #[test]
    fn test_signal_terminated_step_maps_to_one() {
        let err = ProvisionError::StepFailed {
            step: "start".to_string(),
            code: 0,
            tail: vec![],
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_fatal_preconditions_exit_one() {
        assert_eq!(ProvisionError::NotRoot(1000).exit_code(), 1);
        assert_eq!(
            ProvisionError::SourceMissing(PathBuf::from("./InstallSplunk.sh")).exit_code(),
            1
        );
        assert_eq!(ProvisionError::PolicyRejected("syntax".into()).exit_code(), 1);
    }

    #[test]
    fn test_declined_is_voluntary() {
        assert!(ProvisionError::Declined.is_voluntary());
        assert_eq!(ProvisionError::Declined.exit_code(), 1);
        assert!(!ProvisionError::NotRoot(0).is_voluntary());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidFlag {
            name: "SET_PASSWORD".to_string(),
            value: "yes".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'yes' for SET_PASSWORD: expected 0 or 1"
        );
    }

    #[test]
    fn test_app_error_user_message() {
        let err = AppError::OsCommand {
            cmd: "visudo -cf".to_string(),
            reason: "exit status 1".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Failed to execute 'visudo -cf': exit status 1"
        );
    }
}
