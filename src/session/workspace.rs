/*!
 * Workspace: the single writer of the live cue store.
 *
 * This module handles:
 * - Taking the snapshot a batch runs on, after recording it for undo
 * - Applying batch events to the live store
 * - Manual edits and per-row restore
 * - Token and progress totals of the current batch
 */

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::subtitle_processor::{Cue, CueStore};
use crate::translation::{BatchEvent, BatchState, Mode, TokenUsageStats};

use super::history::History;

/// Live cue store plus everything needed to undo batches and edits
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Cues shown to and edited by the user
    store: CueStore,

    /// Snapshots taken before batches and edits
    history: History,

    /// Token totals of the current batch
    token_stats: TokenUsageStats,

    /// Last progress reported as `(completed, total)`
    progress: (usize, usize),

    /// State of the current batch, as seen through its events
    batch_state: BatchState,

    /// Message of the last failed batch
    last_error: Option<String>,
}

impl Workspace {
    pub fn new(store: CueStore) -> Self {
        Self {
            store,
            history: History::new(),
            token_stats: TokenUsageStats::new(),
            progress: (0, 0),
            batch_state: BatchState::Idle,
            last_error: None,
        }
    }

    /// Open a subtitle file; history starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(CueStore::from_srt_file(path)?))
    }

    pub fn store(&self) -> &CueStore {
        &self.store
    }

    pub fn cues(&self) -> &[Cue] {
        &self.store.cues
    }

    pub fn into_store(self) -> CueStore {
        self.store
    }

    pub fn source_file(&self) -> Option<&PathBuf> {
        self.store.source_file.as_ref()
    }

    pub fn token_stats(&self) -> &TokenUsageStats {
        &self.token_stats
    }

    pub fn progress(&self) -> (usize, usize) {
        self.progress
    }

    pub fn batch_state(&self) -> BatchState {
        self.batch_state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Record the current store for undo
    pub fn push_snapshot(&mut self) {
        self.history.push(self.store.snapshot());
    }

    /// Prepare a batch: record undo state, reset counters and return the snapshot to run on
    pub fn begin_batch(&mut self, mode: Mode, model: &str) -> Vec<Cue> {
        self.push_snapshot();
        self.token_stats = TokenUsageStats::with_model(model);
        self.progress = (0, self.store.len());
        self.batch_state = BatchState::Running;
        self.last_error = None;
        debug!("Workspace prepared {} batch over {} cues", mode, self.store.len());
        self.store.snapshot()
    }

    /// Apply one batch event to the live store and counters
    ///
    /// Returns false for a row update whose position does not exist.
    pub fn apply(&mut self, event: &BatchEvent) -> bool {
        match event {
            BatchEvent::RowUpdated { position, translation, fixed_text } => {
                let Some(cue) = self.store.cues.get_mut(*position) else {
                    warn!("Ignoring update for unknown row {}", position);
                    return false;
                };
                cue.translation = translation.clone();
                cue.fixed_text = fixed_text.clone();
            }
            BatchEvent::TokensAdded { prompt_tokens, completion_tokens } => {
                self.token_stats.add(*prompt_tokens, *completion_tokens);
            }
            BatchEvent::Progress { completed, total } => {
                self.progress = (*completed, *total);
            }
            BatchEvent::BatchFailed { message, completed } => {
                warn!("Batch failed after {} cues: {}", completed, message);
                self.batch_state = BatchState::Failed;
                self.last_error = Some(message.clone());
            }
            BatchEvent::BatchCompleted { mode } => {
                info!("{} batch completed, {}", mode, self.token_stats.summary());
                self.batch_state = BatchState::Completed;
            }
        }
        true
    }

    /// Restore the store recorded by the last snapshot
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(cues) => {
                self.store.cues = cues;
                info!("Undo: restored {} cues", self.store.len());
                true
            }
            None => {
                debug!("Nothing to undo");
                false
            }
        }
    }

    /// Return one row to the untranslated state
    pub fn restore_row(&mut self, position: usize) -> Result<()> {
        self.cue_mut(position)?.clear_translation();
        Ok(())
    }

    /// Replace a row's translation by hand; any fix of it is dropped
    pub fn edit_translation(&mut self, position: usize, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.push_snapshot();
        self.cue_mut(position)?.set_translation(text);
        Ok(())
    }

    pub fn edit_fixed_text(&mut self, position: usize, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.push_snapshot();
        self.cue_mut(position)?.set_fixed_text(text);
        Ok(())
    }

    fn cue_mut(&mut self, position: usize) -> Result<&mut Cue> {
        let len = self.store.len();
        self.store
            .cues
            .get_mut(position)
            .ok_or_else(|| anyhow!("Row {} out of range ({} cues)", position, len))
    }
}
