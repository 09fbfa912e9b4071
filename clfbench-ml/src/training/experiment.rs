//! Lifecycle of one benchmark run.

use crate::error::MlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Loading,
    Splitting,
    /// Fitting and scoring the registry entry at `step`.
    Training { step: u64 },
    Closed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn allows(self, next: RunStatus) -> bool {
        use RunStatus::*;
        match (self, next) {
            (Idle, Loading) | (Loading, Splitting) => true,
            (Idle | Splitting, Training { step: 0 }) => true,
            (Training { step }, Training { step: to }) => to == step + 1,
            (Training { .. }, Closed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Splitting => f.write_str("splitting"),
            Self::Training { step } => write!(f, "training (step {step})"),
            Self::Closed => f.write_str("closed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A status change and when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub status: RunStatus,
    pub at: DateTime<Utc>,
}

/// Status of a run plus its transition history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    history: Vec<Transition>,
}

impl Default for RunState {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Idle,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }
}

impl RunState {
    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Move to `next`, rejecting changes the lifecycle does not allow.
    pub fn advance(&mut self, next: RunStatus) -> Result<(), MlError> {
        if !self.status.allows(next) {
            return Err(MlError::invalid_state(format!(
                "cannot move from {} to {next}",
                self.status
            )));
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        self.history.push(Transition { status: next, at: now });
        Ok(())
    }
}
