/*!
 * # SRTAI - subtitle translation with LLMs
 *
 * A Rust library for translating and polishing SRT subtitles through an
 * OpenAI-compatible chat completions API.
 *
 * ## Features
 *
 * - One model call per subtitle line, many lines in flight at once
 * - Two modes: `translate` into a target language, `fix` to polish a translation
 * - Fail-fast batches with cancellation and undo of a failed batch
 * - Tolerant response handling, including endpoints that answer with web pages
 * - Lossless SRT round-trip for untouched cues
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration file, validation, backup and restore
 * - `subtitle_processor`: Cue model and SRT codec
 * - `providers`: Client implementations for the model service:
 *   - `providers::openai`: OpenAI-compatible HTTP client
 *   - `providers::mock`: In-process provider for tests and benchmarks
 * - `translation`: Translation client and batch orchestration:
 *   - `translation::core`: Single calls and response normalization
 *   - `translation::batch`: Bounded-concurrency batches
 *   - `translation::events`: Batch events and cancellation
 *   - `translation::prompts`: Instruction strings and refusal markers
 * - `session`: Live cue store with undo history
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod translation;
pub mod session;
pub mod app_controller;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::{Config, ConfigStore};
pub use subtitle_processor::{Cue, CueState, CueStore};
pub use translation::{BatchEvent, BatchOutcome, BatchTranslator, Mode, TranslationClient};
pub use session::Workspace;
pub use errors::{AppError, ErrorKind, ProviderError, SubtitleError, TranslationError};
