//! Worker lifecycle states.
//!
//! ```text
//! parsed -> installing -> installed -> activating -> activated
//!               |             |                         |
//!               +-------------+------> redundant <------+
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::manager::OfflineCacheManager;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// One worker instance: a manager bound to a generation, plus its state.
pub(crate) struct Worker {
    pub(crate) id: u64,
    pub(crate) state: WorkerState,
    pub(crate) skip_waiting: bool,
    pub(crate) manager: Arc<OfflineCacheManager>,
}

impl Worker {
    pub(crate) fn new(id: u64, manager: OfflineCacheManager, skip_waiting: bool) -> Self {
        Self { id, state: WorkerState::Parsed, skip_waiting, manager: Arc::new(manager) }
    }

    pub(crate) fn version(&self) -> &str {
        self.manager.names().version()
    }

    pub(crate) fn transition(&mut self, next: WorkerState) -> Result<(), Error> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "worker {} ({}) cannot go from {} to {}",
                self.id,
                self.version(),
                self.state,
                next
            )));
        }
        tracing::info!(worker = self.id, version = %self.version(), from = %self.state, to = %next, "worker state change");
        self.state = next;
        Ok(())
    }

    pub(crate) fn info(&self) -> WorkerInfo {
        WorkerInfo { id: self.id, version: self.version().to_string(), state: self.state }
    }
}

/// Serializable view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerInfo {
    pub id: u64,
    pub version: String,
    pub state: WorkerState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkerState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Parsed.can_transition_to(Installing));
        assert!(Installing.can_transition_to(Installed));
        assert!(Installed.can_transition_to(Activating));
        assert!(Activating.can_transition_to(Activated));
    }

    #[test]
    fn test_redundant_is_terminal() {
        for next in [Parsed, Installing, Installed, Activating, Activated, Redundant] {
            assert!(!Redundant.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_skipping_install() {
        assert!(!Parsed.can_transition_to(Activated));
        assert!(!Installing.can_transition_to(Activating));
        assert!(!Activated.can_transition_to(Installing));
    }

    #[test]
    fn test_display() {
        assert_eq!(Installed.to_string(), "installed");
        assert_eq!(serde_json::to_string(&Activated).unwrap(), "\"activated\"");
    }
}
