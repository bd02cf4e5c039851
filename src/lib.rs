//! Splunk Lab provisioning
//!
//! Library behind two root-only command-line tools that prepare a single-VM
//! Splunk lab:
//!
//! - `install_splunk`: the installer sequencer (architecture gate, install or
//!   reuse, ensure running, one-time sample ingestion, access info)
//! - `lab_bootstrap`: the bootstrap provisioner (lab user, script delivery,
//!   scoped sudo grant, login banners, sshd banner)
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy and exit-code mapping
//! - **models**: Core data types (command specs, outcomes, identities)
//! - **config**: Configuration structs, TOML loader, env overrides, validation
//! - **hardware**: Host fact probes (architecture, free space, primary IPv4)
//! - **system**: Host seam (`SystemWrapper`), path registry, locks, file helpers
//! - **orchestrator**: Installer sequencer, step ledger, child-process executor
//! - **provision**: Bootstrap provisioner operations
//! - **log_collector**: Background-thread run log wired into the `log` facade

// Core foundational modules
pub mod error;
pub mod models;

pub mod config;
pub mod hardware;
pub mod system;

// Robust, decoupled logging system
pub mod log_collector;

pub mod orchestrator;
pub mod provision;

pub mod cli;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{init_logging, LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, ConfigError, HostError, ProvisionError, Result};

pub use models::{
    CommandOutput, CommandSpec, LabUser, PackageFormat, ServiceIdentity, StepOutcome,
};

pub use config::{ProvisionerConfig, SequencerConfig};
pub use orchestrator::{RunSummary, Sequencer, SequencerStep, StepLedger, StepState};
pub use provision::{ProvisionSummary, Provisioner};
pub use system::{PathRegistry, SystemImpl, SystemWrapper};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
