//! Error types for wordpace
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! The transport surface (play/pause/reset/seek/rate/audio) is infallible by
//! design: out-of-range rates are clamped, empty text resolves to the Idle
//! state, and a missing cue provider degrades to silence. The only fallible
//! operations are configuration loading and validation.

use thiserror::Error;

/// Main error type for wordpace
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected input (e.g. empty or whitespace-only text)
    ///
    /// Never propagated out of the session controller; recorded as the
    /// last load rejection and resolved into the Idle state.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result type using wordpace Error
pub type Result<T> = std::result::Result<T, Error>;
