/*!
 * Workspace management for subtitle editing sessions.
 *
 * This module provides:
 * - The live cue store and the only code that mutates it
 * - Undo history of full snapshots
 * - Application of batch events
 */

pub mod history;
pub mod workspace;

// Re-export main types
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use workspace::Workspace;
