/*!
 * Subtitle translation using an OpenAI-compatible model service.
 *
 * This module is split into several submodules:
 *
 * - `core`: Translation client, modes and response normalization
 * - `batch`: Bounded-concurrency batch orchestration
 * - `events`: Batch events, outcomes and cancellation
 * - `prompts`: Swappable instruction strings and refusal markers
 */

// Re-export main types for easier usage
pub use self::batch::{BatchHandle, BatchTranslator};
pub use self::core::{normalize_response, ClientSettings, Mode, TokenUsageStats, TranslationClient, UnitResult};
pub use self::events::{BatchEvent, BatchOutcome, BatchState, CancelToken};
pub use self::prompts::PromptPolicy;

// Submodules
pub mod batch;
pub mod core;
pub mod events;
pub mod prompts;
