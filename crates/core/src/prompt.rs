//! Deferred install-prompt state.
//!
//! The platform fires an install-prompt event once; the page defers it and
//! replays it when the user presses the install button. The controller owns
//! that deferred prompt so exactly one button handler can consume it.

use std::sync::Mutex;
use std::sync::PoisonError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured install prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredPrompt {
    pub platforms: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl DeferredPrompt {
    pub fn new(platforms: Vec<String>) -> Self {
        Self { platforms, captured_at: Utc::now() }
    }
}

/// The user's answer to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOutcome {
    Accepted,
    Dismissed,
}

#[derive(Debug, Default)]
struct PromptState {
    deferred: Option<DeferredPrompt>,
    last_outcome: Option<PromptOutcome>,
    installed: bool,
}

#[derive(Debug, Default)]
pub struct InstallPromptController {
    state: Mutex<PromptState>,
}

impl InstallPromptController {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PromptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Defer a prompt. Returns whether the install button should be shown.
    /// A later capture replaces an earlier one that was never used.
    pub fn capture(&self, prompt: DeferredPrompt) -> bool {
        let mut state = self.state();
        if state.installed {
            return false;
        }
        state.deferred = Some(prompt);
        true
    }

    /// Hand the prompt to a button handler. Only the first caller gets it.
    pub fn take(&self) -> Option<DeferredPrompt> {
        let mut state = self.state();
        state.deferred.take()
    }

    /// Record the user's answer; the button is hidden either way.
    pub fn resolve(&self, outcome: PromptOutcome) {
        let mut state = self.state();
        state.deferred = None;
        state.last_outcome = Some(outcome);
        drop(state);
        tracing::info!(?outcome, "install prompt resolved");
    }

    /// The app was installed; never offer the prompt again.
    pub fn mark_installed(&self) {
        let mut state = self.state();
        state.installed = true;
        state.deferred = None;
    }

    pub fn button_visible(&self) -> bool {
        let state = self.state();
        !state.installed && state.deferred.is_some()
    }

    pub fn last_outcome(&self) -> Option<PromptOutcome> {
        self.state().last_outcome
    }

    pub fn is_installed(&self) -> bool {
        self.state().installed
    }
}
