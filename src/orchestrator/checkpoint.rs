//! Durable step ledger.
//!
//! A small TOML table of `step = "not_started" | "completed"` persisted in the
//! work directory. An entry flips to `completed` only after its step fully
//! succeeded, and the file is replaced atomically so a crash mid-write never
//! leaves a half-written ledger.

use super::state::{SequencerStep, StepState};
use crate::error::{ConfigError, ProvisionError};
use crate::system::files;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    steps: BTreeMap<String, StepState>,
}

/// Step ledger bound to its backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLedger {
    path: PathBuf,
    file: LedgerFile,
}

impl StepLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    ///
    /// An unreadable or corrupt ledger is logged and treated as empty, which
    /// at worst repeats a one-time step.
    pub fn load(path: &Path) -> Self {
        let file = match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<LedgerFile>(&content) {
                Ok(file) => file,
                Err(e) => {
                    log::warn!(
                        "[Ledger] {} is corrupt ({}), starting from an empty ledger",
                        path.display(),
                        e
                    );
                    LedgerFile::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => {
                log::warn!("[Ledger] Cannot read {} ({}), starting empty", path.display(), e);
                LedgerFile::default()
            }
        };

        StepLedger {
            path: path.to_path_buf(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self, step: SequencerStep) -> StepState {
        self.file
            .steps
            .get(step.as_str())
            .copied()
            .unwrap_or_default()
    }

    pub fn is_completed(&self, step: SequencerStep) -> bool {
        self.state(step).is_completed()
    }

    /// Record `step` as completed and persist immediately.
    pub fn mark_completed(&mut self, step: SequencerStep) -> Result<(), ProvisionError> {
        self.file
            .steps
            .insert(step.as_str().to_string(), StepState::Completed);
        self.save()?;
        log::info!("[Ledger] {} = completed", step.as_str());
        Ok(())
    }

    fn save(&self) -> Result<(), ProvisionError> {
        let content = toml::to_string(&self.file).map_err(ConfigError::from)?;
        files::write_atomic(&self.path, content.as_bytes(), 0o644)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_ledger_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = StepLedger::load(&temp_dir.path().join("steps.toml"));
        for step in SequencerStep::ALL {
            assert_eq!(ledger.state(step), StepState::NotStarted);
        }
    }

    #[test]
    fn test_mark_completed_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("work").join("steps.toml");
        let mut ledger = StepLedger::load(&path);
        ledger.mark_completed(SequencerStep::IngestSample).unwrap();

        let reloaded = StepLedger::load(&path);
        assert!(reloaded.is_completed(SequencerStep::IngestSample));
        assert!(!reloaded.is_completed(SequencerStep::InstallOrReuse));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("ingest = \"completed\""));
    }

    #[test]
    fn test_corrupt_ledger_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("steps.toml");
        fs::write(&path, "steps = 42").unwrap();
        let ledger = StepLedger::load(&path);
        assert!(!ledger.is_completed(SequencerStep::IngestSample));
    }
}
