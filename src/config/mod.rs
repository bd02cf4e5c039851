//! Configuration module for the lab tools.
//!
//! Both binaries resolve their configuration exactly once at startup into an
//! explicit struct and pass it down; nothing below `main` reads the
//! environment or global state.
//!
//! # Module Structure
//!
//! - `loader`: Loads the optional sequencer TOML file and resolves provisioner env overrides
//! - `validator`: Validates user names, paths and thresholds before any step runs

pub mod loader;
pub mod validator;

use crate::models::{LabUser, ServiceIdentity};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the optional sequencer configuration file.
pub const DEFAULT_SEQUENCER_CONFIG: &str = "/etc/splunk-lab/installer.toml";

pub const DEFAULT_INSTALL_DIR: &str = "/opt/splunk";
pub const DEFAULT_SERVICE_USER: &str = "splunk";
pub const DEFAULT_PACKAGE_URL: &str = "https://download.splunk.com/products/splunk/releases/9.2.1/linux/splunk-9.2.1-78803f08aabb-linux-2.6-amd64.deb";
pub const DEFAULT_DATASET_URL: &str =
    "https://docs.splunk.com/images/Tutorial/tutorialdata.zip";
pub const DEFAULT_WORK_DIR: &str = "/tmp/splunk_lab";
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "SplunkLab123!";

pub const DEFAULT_LAB_USER: &str = "splunk";
pub const DEFAULT_LAB_PASS: &str = "Splunk@Lab1";
pub const DEFAULT_SCRIPT_SRC: &str = "./InstallSplunk.sh";

/// Labels attached to the one-shot sample upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestMetadata {
    pub index: String,
    pub sourcetype: String,
    pub source: String,
    pub host: String,
}

impl Default for IngestMetadata {
    fn default() -> Self {
        IngestMetadata {
            index: "main".to_string(),
            sourcetype: "lab_tutorial".to_string(),
            source: "tutorialdata.zip".to_string(),
            host: "lab-webserver".to_string(),
        }
    }
}

/// Installer sequencer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Platform install directory; `<install_dir>/bin/splunk` is the install guard
    pub install_dir: PathBuf,
    /// Service account the platform runs under
    pub service_user: String,
    pub package_url: String,
    pub dataset_url: String,
    /// Working directory for downloads, the dataset and the step ledger
    pub work_dir: PathBuf,
    /// Architectures the package supports (`uname -m` spelling)
    pub allowed_arches: Vec<String>,
    /// Below this much free space the operator is asked to confirm
    pub min_free_gb: u64,
    pub admin_user: String,
    pub admin_password: String,
    pub web_port: u16,
    pub ingest: IngestMetadata,
    pub log_dir: PathBuf,
    pub lock_dir: PathBuf,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        SequencerConfig {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            service_user: DEFAULT_SERVICE_USER.to_string(),
            package_url: DEFAULT_PACKAGE_URL.to_string(),
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            allowed_arches: vec!["x86_64".to_string()],
            min_free_gb: 5,
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            web_port: 8000,
            ingest: IngestMetadata::default(),
            log_dir: PathBuf::from("/var/log/splunk-lab"),
            lock_dir: PathBuf::from("/run/splunk-lab"),
        }
    }
}

impl SequencerConfig {
    pub fn service_identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(self.service_user.clone())
    }

    /// Absolute path of the platform CLI.
    pub fn splunk_bin(&self) -> PathBuf {
        self.install_dir.join("bin").join("splunk")
    }

    /// One-time credential seed consumed on first start.
    pub fn seed_file(&self) -> PathBuf {
        self.install_dir
            .join("etc")
            .join("system")
            .join("local")
            .join("user-seed.conf")
    }

    /// Admin account database written by the first successful start.
    pub fn passwd_file(&self) -> PathBuf {
        self.install_dir.join("etc").join("passwd")
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.work_dir.join("dataset")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.work_dir.join("steps.toml")
    }
}

/// Bootstrap provisioner settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionerConfig {
    pub lab_user: LabUser,
    /// Installer delivered into the lab user's home
    pub script_src: PathBuf,
    /// Reset the lab password on every run
    pub set_password: bool,
    /// Manage the sshd pre-login banner
    pub configure_ssh_banner: bool,
    pub log_dir: PathBuf,
    pub lock_dir: PathBuf,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        ProvisionerConfig {
            lab_user: LabUser {
                name: DEFAULT_LAB_USER.to_string(),
                password: DEFAULT_LAB_PASS.to_string(),
            },
            script_src: PathBuf::from(DEFAULT_SCRIPT_SRC),
            set_password: true,
            configure_ssh_banner: true,
            log_dir: PathBuf::from("/var/log/splunk-lab"),
            lock_dir: PathBuf::from("/run/splunk-lab"),
        }
    }
}

impl ProvisionerConfig {
    /// File name the script keeps once delivered.
    pub fn script_name(&self) -> String {
        self.script_src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "InstallSplunk.sh".to_string())
    }

    /// Absolute delivered path, the only command the elevation grant allows.
    pub fn delivered_script(&self) -> PathBuf {
        self.lab_user.home_dir().join(self.script_name())
    }
}
