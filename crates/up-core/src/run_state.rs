//! Run state for one alignment invocation
//!
//! Tracks the installed baseline, the high-water mark reached so far and
//! which steps were executed or skipped. Nothing here is persisted; the
//! caller records the final high-water mark.

use crate::version::StepVersion;
use serde::{Deserialize, Serialize};

/// Overrides that change which steps are eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForceOverride {
    /// Replay every step from this version onwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<StepVersion>,

    /// Replay the newest step when the run would otherwise leave it untouched
    #[serde(default)]
    pub last: bool,
}

impl ForceOverride {
    /// Effective baseline: lowered to just before `from` when forcing
    pub fn baseline(&self, installed: StepVersion) -> StepVersion {
        match self.from {
            Some(from) => from.before(),
            None => installed,
        }
    }
}

/// State of a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Version installed before the run started
    pub installed: StepVersion,

    /// Baseline actually used for step selection
    pub baseline: StepVersion,

    /// High-water mark: version of the most recently executed step
    pub applied: StepVersion,

    /// True once any step has executed
    pub updated: bool,

    /// Overrides in effect for this run
    pub force: ForceOverride,

    /// Steps executed, in execution order
    pub executed: Vec<StepVersion>,

    /// Steps skipped as already applied
    pub skipped: Vec<StepVersion>,
}

impl RunState {
    /// Create a run state for the given installed version
    pub fn new(installed: StepVersion, force: ForceOverride) -> Self {
        Self {
            installed,
            baseline: force.baseline(installed),
            applied: installed,
            updated: false,
            force,
            executed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Whether a step is newer than the baseline
    pub fn is_pending(&self, version: StepVersion) -> bool {
        version > self.baseline
    }

    /// Record that a step ran successfully
    pub fn mark_executed(&mut self, version: StepVersion) {
        self.applied = version;
        self.updated = true;
        self.executed.push(version);
    }

    /// Record that a step was skipped
    pub fn mark_skipped(&mut self, version: StepVersion) {
        self.skipped.push(version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_uses_installed_baseline() {
        let state = RunState::new(StepVersion::new(2023, 1), ForceOverride::default());
        assert_eq!(state.baseline, StepVersion::new(2023, 1));
        assert_eq!(state.applied, StepVersion::new(2023, 1));
        assert!(!state.updated);
        assert!(state.is_pending(StepVersion::new(2023, 2)));
        assert!(!state.is_pending(StepVersion::new(2023, 1)));
    }

    #[test]
    fn test_force_from_lowers_baseline() {
        let force = ForceOverride {
            from: Some(StepVersion::new(2020, 5)),
            last: false,
        };
        let state = RunState::new(StepVersion::new(2023, 1), force);
        assert!(state.is_pending(StepVersion::new(2020, 5)));
        assert!(!state.is_pending(StepVersion::new(2020, 4)));
    }

    #[test]
    fn test_mark_executed_advances_high_water() {
        let mut state = RunState::new(StepVersion::new(2023, 1), ForceOverride::default());
        state.mark_executed(StepVersion::new(2023, 2));
        assert!(state.updated);
        assert_eq!(state.applied, StepVersion::new(2023, 2));
        assert_eq!(state.executed, vec![StepVersion::new(2023, 2)]);
    }
}
