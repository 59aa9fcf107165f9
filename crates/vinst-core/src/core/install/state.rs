use std::fmt;

use serde::Serialize;

use super::errors::InstallError;

/// Progress of one install run. Ordered; phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallPhase {
    Created,
    EnvironmentReady,
    DependenciesInstalled,
    RootInstalled,
    Linked,
    Done,
}

impl InstallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::EnvironmentReady => "environment-ready",
            Self::DependenciesInstalled => "dependencies-installed",
            Self::RootInstalled => "root-installed",
            Self::Linked => "linked",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    Active(InstallPhase),
    Failed { phase: InstallPhase, reason: String },
}

impl Default for InstallState {
    fn default() -> Self {
        Self::Active(InstallPhase::Created)
    }
}

impl InstallState {
    /// Last phase reached, or the phase a failed run aborted in.
    pub fn phase(&self) -> InstallPhase {
        match self {
            Self::Active(phase) | Self::Failed { phase, .. } => *phase,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Moves to `next`. Phases may be skipped but never repeated or revisited,
    /// and a failed run stays failed.
    pub fn advance(&mut self, next: InstallPhase) -> Result<(), InstallError> {
        match self {
            Self::Active(current) if next > *current => {
                *current = next;
                Ok(())
            }
            _ => Err(InstallError::InvalidTransition {
                from: self.phase(),
                to: next,
            }),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        let phase = self.phase();
        *self = Self::Failed {
            phase,
            reason: reason.into(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_phase_in_order() {
        let mut state = InstallState::default();
        for next in [
            InstallPhase::EnvironmentReady,
            InstallPhase::DependenciesInstalled,
            InstallPhase::RootInstalled,
            InstallPhase::Linked,
            InstallPhase::Done,
        ] {
            state.advance(next).expect("forward transition");
            assert_eq!(state.phase(), next);
        }
    }

    #[test]
    fn skipping_forward_is_allowed() {
        let mut state = InstallState::default();
        state.advance(InstallPhase::Done).expect("skip to done");
        assert_eq!(state.phase(), InstallPhase::Done);
    }

    #[test]
    fn backwards_and_repeated_transitions_are_rejected() {
        let mut state = InstallState::Active(InstallPhase::RootInstalled);
        let err = state
            .advance(InstallPhase::EnvironmentReady)
            .expect_err("backwards");
        assert!(matches!(
            err,
            InstallError::InvalidTransition {
                from: InstallPhase::RootInstalled,
                to: InstallPhase::EnvironmentReady
            }
        ));
        assert!(state.advance(InstallPhase::RootInstalled).is_err());
        assert_eq!(state.phase(), InstallPhase::RootInstalled);
    }

    #[test]
    fn failure_is_terminal() {
        let mut state = InstallState::Active(InstallPhase::EnvironmentReady);
        state.fail("pip exploded");
        assert!(state.is_failed());
        assert_eq!(state.phase(), InstallPhase::EnvironmentReady);
        assert!(state.advance(InstallPhase::Done).is_err());
        assert_eq!(
            state,
            InstallState::Failed {
                phase: InstallPhase::EnvironmentReady,
                reason: "pip exploded".into()
            }
        );
    }
}
