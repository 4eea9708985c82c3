/*!
 * Undo history of cue store snapshots.
 */

use log::debug;

use crate::subtitle_processor::Cue;

/// Snapshots kept when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Stack of full cue snapshots, newest last
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Vec<Cue>>,
    /// Oldest snapshots are dropped past this depth
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, snapshot: Vec<Cue>) {
        if self.snapshots.len() == self.limit {
            self.snapshots.remove(0);
            debug!("History full, dropped oldest snapshot");
        }
        self.snapshots.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<Vec<Cue>> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
