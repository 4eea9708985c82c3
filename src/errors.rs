/*!
 * Error types for the srtai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Coarse failure classification surfaced to users and batch outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable configuration; a batch never starts
    InvalidConfig,
    /// The endpoint answered with a web page instead of API data
    MisconfiguredEndpoint,
    /// Network failure, timeout, HTTP error status or unreadable response
    TransportError,
    /// A subtitle block that could not be parsed
    MalformedInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidConfig => "invalid configuration",
            Self::MisconfiguredEndpoint => "misconfigured endpoint",
            Self::TransportError => "transport error",
            Self::MalformedInput => "malformed input",
        };
        f.write_str(name)
    }
}

/// Errors that can occur when talking to the model service
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The call did not finish within the per-call deadline
    #[error("Request timed out after {secs} seconds")]
    Timeout {
        /// Deadline that was exceeded
        secs: u64,
    },

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The endpoint returned an HTML document
    #[error("Received HTML instead of an API response - base URL or API key may be misconfigured")]
    MisconfiguredEndpoint,
}

impl ProviderError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MisconfiguredEndpoint => ErrorKind::MisconfiguredEndpoint,
            _ => ErrorKind::TransportError,
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A block could not be turned into a cue
    #[error("Malformed subtitle block at line {line}: {reason}")]
    MalformedBlock {
        /// 1-based line number where the block starts
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Reading or writing a subtitle file failed
    #[error("Subtitle file error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtitleError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Configuration is not usable for a batch
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the provider API
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The batch was cancelled by its owner
    #[error("cancelled")]
    Cancelled,
}

impl TranslationError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Provider(e) => e.kind(),
            Self::Cancelled => ErrorKind::TransportError,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
