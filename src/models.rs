//! Core data types for Splunk Lab provisioning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Normalize an architecture string to the kernel's `uname -m` spelling.
///
/// Package tooling reports `amd64`/`arm64`; the allow-list is written in
/// `x86_64`/`aarch64` form.
pub fn normalize_arch(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "amd64" | "x86-64" => "x86_64".to_string(),
        "arm64" => "aarch64".to_string(),
        other => other.to_string(),
    }
}

/// Dedicated unprivileged account the platform runs under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub user: String,
    pub group: String,
}

impl ServiceIdentity {
    pub fn new(user: impl Into<String>) -> Self {
        let user = user.into();
        ServiceIdentity {
            group: user.clone(),
            user,
        }
    }

    /// `user:group` form used by chown.
    pub fn owner_spec(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }
}

/// Lab login account created by the provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabUser {
    pub name: String,
    pub password: String,
}

impl LabUser {
    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from("/home").join(&self.name)
    }
}

/// Outcome of a single step.
///
/// Fatal conditions are `Err(ProvisionError)`; everything a step can survive
/// is expressed here so best-effort work never turns into an error by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step performed its work.
    Done,
    /// A guard showed the work was already complete.
    Skipped(String),
    /// The step completed but a best-effort part failed and was logged.
    Recovered(String),
    /// Nothing to do and nothing worth logging (feature disabled).
    Ignored,
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Done => "done",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Recovered(_) => "done with warnings",
            StepOutcome::Ignored => "not applicable",
        }
    }
}

/// Package container understood by the OS installer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageFormat {
    Deb,
    Rpm,
    Tarball,
}

impl PackageFormat {
    /// Detect the format from the package file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".deb") {
            Some(PackageFormat::Deb)
        } else if lower.ends_with(".rpm") {
            Some(PackageFormat::Rpm)
        } else if lower.ends_with(".tgz") || lower.ends_with(".tar.gz") {
            Some(PackageFormat::Tarball)
        } else {
            None
        }
    }

    /// Command that installs `package`; tarballs unpack into `install_parent`.
    pub fn install_command(&self, package: &Path, install_parent: &Path) -> CommandSpec {
        match self {
            PackageFormat::Deb => CommandSpec::new("dpkg").arg("-i").path_arg(package),
            PackageFormat::Rpm => CommandSpec::new("rpm")
                .arg("-i")
                .arg("--replacepkgs")
                .path_arg(package),
            PackageFormat::Tarball => CommandSpec::new("tar")
                .arg("-xzf")
                .path_arg(package)
                .arg("-C")
                .path_arg(install_parent),
        }
    }
}

/// A command to execute, optionally under another identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Identity the command must run as; `None` runs as the caller.
    pub run_as: Option<String>,
    /// Data written to the child's stdin (passwords for chpasswd).
    pub stdin: Option<String>,
    /// Indices into `args` that must never be echoed to logs or the terminal.
    secret_args: Vec<usize>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            run_as: None,
            stdin: None,
            secret_args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }

    /// Add an argument that is redacted from every display form.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Run the command under `user` via `sudo -u`, never as the caller.
    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    /// Final argv including the identity switch.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 6);
        if let Some(user) = &self.run_as {
            argv.extend([
                "sudo".to_string(),
                "-u".to_string(),
                user.clone(),
                "-H".to_string(),
                "--".to_string(),
            ]);
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Display form with secret arguments masked.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        if let Some(user) = &self.run_as {
            parts.push(format!("sudo -u {} -H --", user));
        }
        parts.push(self.program.clone());
        for (idx, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&idx) {
                parts.push("****".to_string());
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    /// Combined stdout and stderr lines.
    pub lines: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last `n` captured lines.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(n);
        self.lines[start..].to_vec()
    }

    /// First non-empty line, trimmed.
    pub fn first_line(&self) -> Option<&str> {
        self.lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}
