//! Restoration run states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a restoration run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Importing,
    ManifestLoaded,
    Reconstructing,
    Validating,
    Exporting,
    Succeeded,
    Degraded,
    Failed,
}

impl RunState {
    /// Whether the run ends in this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Degraded | Self::Failed)
    }

    /// Whether moving from `self` to `next` is legal.
    ///
    /// The forward path is strictly linear. Every non-terminal state may
    /// fall back to `Degraded` or `Failed`, and a degraded run fails when
    /// the fallback copy cannot be written.
    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::{
            Degraded, Exporting, Failed, Idle, Importing, ManifestLoaded, Reconstructing,
            Succeeded, Validating,
        };
        match (self, next) {
            (Idle, Importing)
            | (Importing, ManifestLoaded)
            | (ManifestLoaded, Reconstructing)
            | (Reconstructing, Validating)
            | (Validating, Exporting)
            | (Exporting, Succeeded)
            | (Degraded, Failed) => true,
            (from, Degraded | Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Importing => "importing",
            Self::ManifestLoaded => "manifest_loaded",
            Self::Reconstructing => "reconstructing",
            Self::Validating => "validating",
            Self::Exporting => "exporting",
            Self::Succeeded => "succeeded",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RunState; 9] = [
        RunState::Idle,
        RunState::Importing,
        RunState::ManifestLoaded,
        RunState::Reconstructing,
        RunState::Validating,
        RunState::Exporting,
        RunState::Succeeded,
        RunState::Degraded,
        RunState::Failed,
    ];

    #[test]
    fn test_forward_path() {
        let path = &ALL[..7];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!RunState::Idle.can_transition_to(RunState::Reconstructing));
        assert!(!RunState::Validating.can_transition_to(RunState::Importing));
    }

    #[test]
    fn test_fallbacks() {
        for state in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(state.can_transition_to(RunState::Degraded));
            assert!(state.can_transition_to(RunState::Failed));
        }
        assert!(RunState::Degraded.can_transition_to(RunState::Failed));
        assert!(!RunState::Succeeded.can_transition_to(RunState::Degraded));
        assert!(!RunState::Failed.can_transition_to(RunState::Degraded));
        assert!(!RunState::Degraded.can_transition_to(RunState::Succeeded));
    }
}
