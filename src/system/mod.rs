/// System module: host command execution, identity lookups and file plumbing
///
/// Everything that touches the host goes through [`SystemWrapper`] so the
/// sequencer and provisioner can be driven against a recording double in
/// tests. File writes use [`PathRegistry`] for the same reason.

pub mod download;
pub mod files;
pub mod lock;
pub mod paths;

pub use lock::RunLock;
pub use paths::PathRegistry;

use crate::error::{AppError, HostError, ProvisionError};
use crate::hardware;
use crate::models::{CommandOutput, CommandSpec};
use futures::future::BoxFuture;
use nix::unistd::{Group, User};
use std::io::{self, BufRead, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Host operations used by both binaries.
///
/// Implementations must never run a command through a shell; every argument
/// reaches the child verbatim.
pub trait SystemWrapper: Send + Sync {
    /// Effective uid of this process.
    fn effective_uid(&self) -> u32;

    /// Host CPU architecture in `uname -m` spelling.
    fn host_arch(&self) -> Result<String, HostError>;

    /// Free bytes on the filesystem that holds (or would hold) `path`.
    fn free_space_bytes(&self, path: &Path) -> Result<u64, HostError>;

    fn user_exists(&self, name: &str) -> bool;

    fn group_exists(&self, name: &str) -> bool;

    /// Run a short command to completion and capture its output.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, AppError>;

    /// Run a long command, streaming output into the log while a progress
    /// indicator is shown on interactive terminals.
    fn run_long(
        &self,
        spec: CommandSpec,
        label: String,
    ) -> BoxFuture<'static, Result<CommandOutput, AppError>>;

    /// Download `url` to `dest`, returning the byte count.
    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'static, Result<u64, ProvisionError>>;

    /// `chown [-R] owner path`.
    fn set_owner(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), AppError>;

    /// Ask the operator a yes/no question; anything but yes is a no.
    fn confirm(&self, prompt: &str) -> bool;

    /// Best-effort primary IPv4 address.
    fn primary_ipv4(&self) -> Option<Ipv4Addr>;
}

/// Interpret an operator's answer to a yes/no prompt.
///
/// Only `y`/`yes` (any case, surrounding whitespace ignored) confirm.
pub fn parse_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Production implementation of [`SystemWrapper`].
pub struct SystemImpl {
    client: reqwest::Client,
}

impl SystemImpl {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("splunk-lab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::InvalidInput(format!("HTTP client setup failed: {}", e)))?;
        Ok(SystemImpl { client })
    }

    /// Fallback identity lookup through NSS when the direct query errors.
    fn getent(database: &str, key: &str) -> bool {
        Command::new("getent")
            .arg(database)
            .arg(key)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl SystemWrapper for SystemImpl {
    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }

    fn host_arch(&self) -> Result<String, HostError> {
        hardware::detect_arch()
    }

    fn free_space_bytes(&self, path: &Path) -> Result<u64, HostError> {
        hardware::free_space_bytes(path)
    }

    fn user_exists(&self, name: &str) -> bool {
        match User::from_name(name) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("[System] [IDENTITY] passwd lookup for {} failed: {}", name, e);
                Self::getent("passwd", name)
            }
        }
    }

    fn group_exists(&self, name: &str) -> bool {
        match Group::from_name(name) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::warn!("[System] [IDENTITY] group lookup for {} failed: {}", name, e);
                Self::getent("group", name)
            }
        }
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, AppError> {
        let argv = spec.argv();
        log::info!("[System] [EXEC] {}", spec);

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| AppError::OsCommand {
            cmd: spec.display(),
            reason: e.to_string(),
        })?;

        if let Some(data) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(data.as_bytes())?;
                // closing stdin lets the child see EOF
            }
        }

        let output = child.wait_with_output().map_err(|e| AppError::OsCommand {
            cmd: spec.display(),
            reason: e.to_string(),
        })?;

        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string),
        );
        for line in &lines {
            log::debug!("[System] [OUT] {}", line);
        }

        let code = output.status.code();
        log::info!("[System] [EXEC] {} exited with {:?}", spec.program, code);
        Ok(CommandOutput { code, lines })
    }

    fn run_long(
        &self,
        spec: CommandSpec,
        label: String,
    ) -> BoxFuture<'static, Result<CommandOutput, AppError>> {
        Box::pin(async move { crate::orchestrator::executor::run_captured(&spec, &label).await })
    }

    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'static, Result<u64, ProvisionError>> {
        let client = self.client.clone();
        Box::pin(async move { download::fetch_to_file(&client, &url, &dest).await })
    }

    fn set_owner(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), AppError> {
        let mut spec = CommandSpec::new("chown");
        if recursive {
            spec = spec.arg("-R");
        }
        let spec = spec.arg(owner).path_arg(path);
        let output = self.run(&spec)?;
        if !output.success() {
            return Err(AppError::OsCommand {
                cmd: spec.display(),
                reason: output
                    .first_line()
                    .unwrap_or("non-zero exit status")
                    .to_string(),
            });
        }
        Ok(())
    }

    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => {
                println!();
                false
            }
            Ok(_) => parse_confirmation(&answer),
        }
    }

    fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        hardware::primary_ipv4()
    }
}
