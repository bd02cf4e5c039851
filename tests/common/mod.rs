//! Recording host double shared by the integration tests.

#![allow(dead_code)]

use futures::future::{self, BoxFuture};
use splunk_lab::error::{AppError, HostError, ProvisionError};
use splunk_lab::models::{CommandOutput, CommandSpec};
use splunk_lab::system::SystemWrapper;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct MockSystem {
    pub uid: u32,
    pub arch: String,
    pub free_bytes: u64,
    pub confirm_answer: bool,
    /// Where a mock package install drops `bin/splunk`
    pub install_dir: Option<PathBuf>,
    /// Whether `splunk start` brings the service up
    pub start_brings_up: bool,
    pub users: Mutex<HashSet<String>>,
    pub groups: HashSet<String>,
    pub running: Mutex<bool>,
    /// Whether the admin seed was on disk at each `splunk start`
    pub seed_at_start: Mutex<Vec<bool>>,
    /// Substring of a command's display form -> exit code to return
    pub failures: Mutex<HashMap<String, i32>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSystem {
    pub fn new() -> Self {
        MockSystem {
            uid: 0,
            arch: "x86_64".to_string(),
            free_bytes: 100 * 1024 * 1024 * 1024,
            confirm_answer: false,
            install_dir: None,
            start_brings_up: true,
            users: Mutex::new(HashSet::new()),
            groups: ["sudo".to_string()].into_iter().collect(),
            running: Mutex::new(false),
            seed_at_start: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, pattern: &str, code: i32) {
        self.failures
            .lock()
            .unwrap()
            .insert(pattern.to_string(), code);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn called(&self, needle: &str) -> bool {
        self.calls().iter().any(|c| c.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }

    fn failure_for(&self, display: &str) -> Option<i32> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| display.contains(pattern.as_str()))
            .map(|(_, code)| *code)
    }

    fn respond(&self, spec: &CommandSpec) -> CommandOutput {
        let display = spec.display();
        if let Some(code) = self.failure_for(&display) {
            return CommandOutput {
                code: Some(code),
                lines: vec![format!("mock failure: {}", display)],
            };
        }

        let program = Path::new(&spec.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match program.as_str() {
            "useradd" => {
                if let Some(name) = spec.args.last() {
                    self.users.lock().unwrap().insert(name.clone());
                }
            }
            "dpkg" | "rpm" | "tar" => {
                if let Some(dir) = &self.install_dir {
                    let bin = dir.join("bin");
                    fs::create_dir_all(&bin).unwrap();
                    fs::create_dir_all(dir.join("etc/system/local")).unwrap();
                    fs::write(bin.join("splunk"), "#!/bin/sh\n").unwrap();
                }
            }
            "splunk" if spec.args.first().map(String::as_str) == Some("status") => {
                let running = *self.running.lock().unwrap();
                return CommandOutput {
                    code: Some(if running { 0 } else { 3 }),
                    lines: vec![if running {
                        "splunkd is running".to_string()
                    } else {
                        "splunkd is not running.".to_string()
                    }],
                };
            }
            "splunk" if spec.args.first().map(String::as_str) == Some("start") => {
                // <install_dir>/bin/splunk -> <install_dir>
                let home = Path::new(&spec.program).parent().and_then(Path::parent);
                if let Some(home) = home {
                    let seed = home.join("etc/system/local/user-seed.conf");
                    let seeded = seed.exists();
                    self.seed_at_start.lock().unwrap().push(seeded);
                    if seeded {
                        fs::write(home.join("etc/passwd"), ":admin:x:\n").unwrap();
                    }
                }
                if self.start_brings_up {
                    *self.running.lock().unwrap() = true;
                }
            }
            _ => {}
        }

        CommandOutput {
            code: Some(0),
            lines: vec![],
        }
    }
}

impl SystemWrapper for MockSystem {
    fn effective_uid(&self) -> u32 {
        self.uid
    }

    fn host_arch(&self) -> Result<String, HostError> {
        Ok(self.arch.clone())
    }

    fn free_space_bytes(&self, _path: &Path) -> Result<u64, HostError> {
        Ok(self.free_bytes)
    }

    fn user_exists(&self, name: &str) -> bool {
        self.users.lock().unwrap().contains(name)
    }

    fn group_exists(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, AppError> {
        self.record(format!("run: {}", spec.display()));
        Ok(self.respond(spec))
    }

    fn run_long(
        &self,
        spec: CommandSpec,
        label: String,
    ) -> BoxFuture<'static, Result<CommandOutput, AppError>> {
        self.record(format!("run_long[{}]: {}", label, spec.display()));
        let output = self.respond(&spec);
        Box::pin(future::ready(Ok(output)))
    }

    fn download(&self, url: String, dest: PathBuf) -> BoxFuture<'static, Result<u64, ProvisionError>> {
        self.record(format!("download: {}", url));
        let result: Result<u64, ProvisionError> = (|| {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, b"payload")?;
            Ok(7)
        })();
        Box::pin(future::ready(result))
    }

    fn set_owner(&self, path: &Path, owner: &str, recursive: bool) -> Result<(), AppError> {
        self.record(format!(
            "chown{} {} {}",
            if recursive { " -R" } else { "" },
            owner,
            path.display()
        ));
        Ok(())
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.record(format!("confirm: {}", prompt));
        self.confirm_answer
    }

    fn primary_ipv4(&self) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::new(10, 0, 0, 5))
    }
}
