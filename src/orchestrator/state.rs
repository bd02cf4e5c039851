//! Sequencer step identifiers and persisted step state.

use serde::{Deserialize, Serialize};

/// The sequencer's fixed, ordered steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SequencerStep {
    /// Host architecture must be in the allow-list
    ArchGate,
    /// Install the platform, or reuse an existing install
    InstallOrReuse,
    /// Platform service must report running
    EnsureRunning,
    /// One-time upload of the sample dataset
    IngestSample,
    /// Print the access URL and credentials
    AccessInfo,
}

impl SequencerStep {
    pub const ALL: [SequencerStep; 5] = [
        SequencerStep::ArchGate,
        SequencerStep::InstallOrReuse,
        SequencerStep::EnsureRunning,
        SequencerStep::IngestSample,
        SequencerStep::AccessInfo,
    ];

    /// Ledger key for this step.
    pub fn as_str(&self) -> &'static str {
        match self {
            SequencerStep::ArchGate => "arch",
            SequencerStep::InstallOrReuse => "install",
            SequencerStep::EnsureRunning => "service",
            SequencerStep::IngestSample => "ingest",
            SequencerStep::AccessInfo => "access",
        }
    }

    /// Operator-facing step title.
    pub fn title(&self) -> &'static str {
        match self {
            SequencerStep::ArchGate => "Checking CPU architecture",
            SequencerStep::InstallOrReuse => "Installing Splunk Enterprise",
            SequencerStep::EnsureRunning => "Ensuring Splunk is running",
            SequencerStep::IngestSample => "Ingesting tutorial data",
            SequencerStep::AccessInfo => "Access information",
        }
    }

    /// 1-based position in the run.
    pub fn number(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == key)
    }
}

/// Persisted completion state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    #[default]
    NotStarted,
    Completed,
}

impl StepState {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepState::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_and_numbers() {
        let numbers: Vec<usize> = SequencerStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(SequencerStep::ArchGate < SequencerStep::InstallOrReuse);
    }

    #[test]
    fn test_keys_round_trip() {
        for step in SequencerStep::ALL {
            assert_eq!(SequencerStep::from_key(step.as_str()), Some(step));
        }
        assert_eq!(SequencerStep::from_key("bogus"), None);
    }

    #[test]
    fn test_default_state() {
        assert_eq!(StepState::default(), StepState::NotStarted);
        assert!(StepState::Completed.is_completed());
    }
}
