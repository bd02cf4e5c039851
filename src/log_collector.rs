//! Decoupled logging pipeline for provisioning runs.
//!
//! ```text
//! log::info!/warn!/error!
//!     |
//! [LogCollector] (log::Log impl, non-blocking)
//!     | (crossbeam channel)
//!     v
//! [DiskPersister thread] -> <log_dir>/<ts>_<tool>.log
//! ```
//!
//! Warnings and errors are mirrored to stderr immediately so the operator
//! sees them even when the log directory cannot be created. Every record
//! reaches the persister, including the command output that the terminal
//! only shows as a spinner.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        }
    }

    fn render(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// File name for a run log: `<YYYYmmdd_HHMMSS>_<tool>.log`.
pub fn session_file_name(tool: &str) -> String {
    format!("{}_{}.log", Local::now().format("%Y%m%d_%H%M%S"), tool)
}

/// Unified logger that persists every record and mirrors problems to stderr.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    /// Session log file; `None` when running stderr-only
    log_path: Option<PathBuf>,
    /// Records at or above this level are echoed to stderr
    echo_level: Level,
}

impl LogCollector {
    /// Create a collector writing to a fresh session file under `log_dir`.
    pub fn new(log_dir: &Path, tool: &str) -> Result<Self, String> {
        fs::create_dir_all(log_dir)
            .map_err(|e| format!("Failed to create log dir {}: {}", log_dir.display(), e))?;
        let log_path = log_dir.join(session_file_name(tool));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file {}: {}", log_path.display(), e))?;

        Ok(Self::spawn(Some(file), Some(log_path)))
    }

    /// Collector that only mirrors to stderr; used when the log dir is unusable.
    pub fn stderr_only() -> Self {
        Self::spawn(None, None)
    }

    fn spawn(file: Option<File>, log_path: Option<PathBuf>) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: the provisioner has no runtime and
        // the sequencer's runtime is current-thread.
        std::thread::spawn(move || {
            let mut file = file;
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        if let Some(f) = file.as_mut() {
                            if f.write_all(line.render().as_bytes()).is_err() {
                                eprintln!("[Log] Write failed, continuing on stderr only");
                                file = None;
                            }
                        }
                    }
                    LogMessage::Flush(done) => {
                        if let Some(f) = file.as_mut() {
                            let _ = f.flush();
                            let _ = f.sync_data();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        LogCollector {
            tx,
            log_path,
            echo_level: Level::Warn,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Send a log line (non-blocking).
    pub fn log_line(&self, line: LogLine) {
        if line.level <= self.echo_level {
            eprintln!("[{}] {}", line.level, line.message);
        }
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, level: Level, message: impl Into<String>) {
        self.log_line(LogLine::new(level, message.into()));
    }

    /// Block until everything sent so far is on disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))?;
        Ok(())
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // debug chatter from dependencies (hyper, reqwest) stays out of the file
        metadata.level() <= Level::Info
            || (metadata.level() <= Level::Debug && metadata.target().starts_with("splunk_lab"))
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.log_str(record.level(), record.args().to_string());
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}

/// Install the process-wide logger for `tool`.
///
/// A log directory that cannot be created is not fatal: the run continues
/// with stderr mirroring only. Returns a handle for the final flush.
pub fn init_logging(log_dir: &Path, tool: &str) -> LogCollector {
    let collector = match LogCollector::new(log_dir, tool) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("[Log] {}; continuing without a log file", e);
            LogCollector::stderr_only()
        }
    };

    if log::set_boxed_logger(Box::new(collector.clone())).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    } else {
        eprintln!("[Log] A logger is already installed; keeping it");
    }

    if let Some(path) = collector.log_path() {
        log::debug!("[Log] [INIT] Session log: {}", path.display());
    }
    collector
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_file_name() {
        let name = session_file_name("lab_bootstrap");
        assert!(name.ends_with("_lab_bootstrap.log"));
        assert_eq!(name.len(), "YYYYmmdd_HHMMSS".len() + "_lab_bootstrap.log".len());
    }

    #[test]
    fn test_collector_persists_lines() {
        let temp_dir = TempDir::new().unwrap();
        let collector = LogCollector::new(temp_dir.path(), "install_splunk").unwrap();

        for i in 0..500 {
            collector.log_str(Level::Info, format!("line {}", i));
        }
        collector.wait_for_empty().unwrap();

        let content = fs::read_to_string(collector.log_path().unwrap()).unwrap();
        assert_eq!(content.lines().count(), 500);
        assert!(content.contains("[INFO] line 499"));
    }

    #[test]
    fn test_unwritable_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(LogCollector::new(&blocker.join("logs"), "x").is_err());
    }

    #[test]
    fn test_init_logging_routes_log_macros() {
        let temp_dir = TempDir::new().unwrap();
        let collector = init_logging(temp_dir.path(), "lab_bootstrap");

        log::info!("[Test] routed through the facade");
        collector.wait_for_empty().unwrap();

        let content = fs::read_to_string(collector.log_path().unwrap()).unwrap();
        assert!(content.contains("[INFO] [Test] routed through the facade"));
    }

    #[test]
    fn test_stderr_only_flushes() {
        let collector = LogCollector::stderr_only();
        collector.log_str(Level::Debug, "dropped quietly");
        assert!(collector.log_path().is_none());
        assert!(collector.wait_for_empty().is_ok());
    }
}
