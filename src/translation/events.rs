/*!
 * Events and outcomes of a batch job.
 *
 * A running batch reports through a channel of `BatchEvent`s and ends with a
 * `BatchOutcome`. `CancelToken` is the owner's handle for stopping it early.
 */

use std::sync::Arc;
use tokio::sync::watch;

use crate::errors::ErrorKind;
use super::core::Mode;

/// Message emitted by a running batch, in completion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// A cue's text fields after its call succeeded
    RowUpdated {
        /// Position in the snapshot the batch was started with
        position: usize,
        translation: String,
        fixed_text: String,
    },

    /// Token usage of one successful call
    TokensAdded {
        prompt_tokens: u64,
        completion_tokens: u64,
    },

    /// Resolved calls so far out of the fixed total
    Progress {
        completed: usize,
        total: usize,
    },

    /// Terminal: the first failure, or cancellation
    BatchFailed {
        message: String,
        /// Resolved calls at the time of failure
        completed: usize,
    },

    /// Terminal: every call succeeded
    BatchCompleted {
        mode: Mode,
    },
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::BatchFailed { .. } | BatchEvent::BatchCompleted { .. })
    }
}

/// Terminal result of a batch job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed(Mode),
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Completed(_))
    }
}

/// Lifecycle of a batch job; terminal states are never left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Cloneable cancellation flag shared between a batch and its owner
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation; calls already in flight are left to finish
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as `self`, so this never resolves
            std::future::pending::<()>().await;
        }
    }
}
