//! Child-process execution for long-running steps.
//!
//! Package installs, first starts and uploads run as a child whose combined
//! output is captured line by line into the run log. While the child runs an
//! interactive terminal gets a low-frequency spinner; a non-interactive one
//! gets nothing. Polling drives only the spinner and never affects the result.

use crate::error::{AppError, ProvisionError};
use crate::models::{CommandOutput, CommandSpec};
use std::io::{IsTerminal, Write};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Lines of captured output surfaced when a step fails.
pub const TAIL_LINES: usize = 120;

/// How long output is still collected once the child has exited.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spinner redraw period.
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(250);

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Terminal progress indicator.
pub struct Spinner {
    label: String,
    frame: usize,
    enabled: bool,
}

impl Spinner {
    /// Spinner that only draws when stdout is a terminal.
    pub fn for_stdout(label: &str) -> Self {
        Self::new(label, std::io::stdout().is_terminal())
    }

    pub fn new(label: &str, enabled: bool) -> Self {
        Spinner {
            label: label.to_string(),
            frame: 0,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current frame text, advancing to the next frame.
    pub fn next_frame(&mut self) -> String {
        let ch = SPINNER_FRAMES[self.frame % SPINNER_FRAMES.len()];
        self.frame = self.frame.wrapping_add(1);
        format!("{} {}", ch, self.label)
    }

    pub fn tick(&mut self) {
        if !self.enabled {
            return;
        }
        let frame = self.next_frame();
        let mut out = std::io::stdout();
        let _ = write!(out, "\r{}", frame);
        let _ = out.flush();
    }

    /// Erase the spinner line.
    pub fn clear(&self) {
        if !self.enabled {
            return;
        }
        let width = self.label.len() + 2;
        let mut out = std::io::stdout();
        let _ = write!(out, "\r{}\r", " ".repeat(width));
        let _ = out.flush();
    }
}

/// Run `spec` to completion, capturing stdout and stderr into one line list.
pub async fn run_captured(spec: &CommandSpec, label: &str) -> Result<CommandOutput, AppError> {
    let argv = spec.argv();
    log::info!("[Exec] [START] {}: {}", label, spec);

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| AppError::OsCommand {
        cmd: spec.display(),
        reason: format!("failed to spawn: {}", e),
    })?;

    if let (Some(data), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
        stdin.write_all(data.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let stdout = child.stdout.take().ok_or_else(|| AppError::OsCommand {
        cmd: spec.display(),
        reason: "failed to capture stdout".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| AppError::OsCommand {
        cmd: spec.display(),
        reason: "failed to capture stderr".to_string(),
    })?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_closed = false;
    let mut stderr_closed = false;

    let mut spinner = Spinner::for_stdout(label);
    let mut ticker = tokio::time::interval(SPINNER_INTERVAL);
    let mut lines = Vec::new();

    // The result is the child's exit, not pipe EOF: a daemon forked by the
    // child may keep the pipes open indefinitely.
    let status = loop {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => {
                absorb_line(label, "", line, &mut lines, &mut stdout_closed);
            }
            line = stderr_lines.next_line(), if !stderr_closed => {
                absorb_line(label, "[STDERR] ", line, &mut lines, &mut stderr_closed);
            }
            status = child.wait() => {
                break status.map_err(|e| AppError::OsCommand {
                    cmd: spec.display(),
                    reason: e.to_string(),
                })?;
            }
            _ = ticker.tick(), if spinner.is_enabled() => {
                spinner.tick();
            }
        }
    };

    let drain = tokio::time::sleep(DRAIN_GRACE);
    tokio::pin!(drain);
    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => {
                absorb_line(label, "", line, &mut lines, &mut stdout_closed);
            }
            line = stderr_lines.next_line(), if !stderr_closed => {
                absorb_line(label, "[STDERR] ", line, &mut lines, &mut stderr_closed);
            }
            _ = &mut drain => {
                log::debug!("[Exec] [{}] Output still open after exit, detaching", label);
                break;
            }
        }
    }
    spinner.clear();

    let code = status.code();
    log::info!("[Exec] [END] {} exited with {:?} ({} lines)", label, code, lines.len());
    Ok(CommandOutput { code, lines })
}

fn absorb_line(
    label: &str,
    tag: &str,
    line: std::io::Result<Option<String>>,
    lines: &mut Vec<String>,
    closed: &mut bool,
) {
    match line {
        Ok(Some(line)) => {
            log::debug!("[Exec] [{}] {}{}", label, tag, line);
            lines.push(line);
        }
        Ok(None) => *closed = true,
        Err(e) => {
            log::warn!("[Exec] [{}] {}read error: {}", label, tag, e);
            *closed = true;
        }
    }
}

/// Turn a non-zero exit into a step failure carrying the output tail.
pub fn require_success(step: &str, output: CommandOutput) -> Result<CommandOutput, ProvisionError> {
    if output.success() {
        return Ok(output);
    }
    Err(ProvisionError::StepFailed {
        step: step.to_string(),
        code: output.code.unwrap_or(1),
        tail: output.tail(TAIL_LINES),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captured_collects_both_streams() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo one; echo two >&2; echo three");
        let output = run_captured(&spec, "test").await.unwrap();
        assert!(output.success());
        assert_eq!(output.lines.len(), 3);
        assert!(output.lines.contains(&"two".to_string()));
    }

    #[tokio::test]
    async fn test_run_captured_reports_exit_code() {
        let spec = CommandSpec::new("sh").arg("-c").arg("exit 7");
        let output = run_captured(&spec, "test").await.unwrap();
        assert_eq!(output.code, Some(7));
    }

    #[tokio::test]
    async fn test_run_captured_feeds_stdin() {
        let spec = CommandSpec::new("cat").stdin("hello\n");
        let output = run_captured(&spec, "test").await.unwrap();
        assert_eq!(output.lines, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let spec = CommandSpec::new("/nonexistent/splunk");
        assert!(run_captured(&spec, "test").await.is_err());
    }

    #[tokio::test]
    async fn test_returns_on_exit_while_grandchild_holds_pipes() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("sleep 5 & echo started");
        let begun = std::time::Instant::now();
        let output = run_captured(&spec, "test").await.unwrap();
        assert!(begun.elapsed() < Duration::from_secs(3));
        assert!(output.success());
        assert_eq!(output.lines, vec!["started".to_string()]);
    }

    #[tokio::test]
    async fn test_output_after_exit_race_is_kept() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("for i in 1 2 3 4 5; do echo $i; done; exit 4");
        let output = run_captured(&spec, "test").await.unwrap();
        assert_eq!(output.code, Some(4));
        assert_eq!(output.lines.len(), 5);
    }

    #[test]
    fn test_require_success_tail() {
        let output = CommandOutput {
            code: Some(2),
            lines: (0..300).map(|i| i.to_string()).collect(),
        };
        match require_success("install", output) {
            Err(ProvisionError::StepFailed { step, code, tail }) => {
                assert_eq!(step, "install");
                assert_eq!(code, 2);
                assert_eq!(tail.len(), TAIL_LINES);
                assert_eq!(tail.last().unwrap(), "299");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_signal_exit_maps_to_one() {
        let output = CommandOutput {
            code: None,
            lines: vec![],
        };
        assert!(matches!(
            require_success("start", output),
            Err(ProvisionError::StepFailed { code: 1, .. })
        ));
    }

    #[test]
    fn test_spinner_frames_cycle() {
        let mut spinner = Spinner::new("Installing", false);
        assert_eq!(spinner.next_frame(), "| Installing");
        assert_eq!(spinner.next_frame(), "/ Installing");
        spinner.next_frame();
        spinner.next_frame();
        assert_eq!(spinner.next_frame(), "| Installing");
        // disabled spinner never draws
        spinner.tick();
        spinner.clear();
    }
}
