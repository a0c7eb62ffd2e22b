//! # Error Types
//!
//! This module defines all error types for the tonetoys engine.
//!
//! Input noise is never an error: the sanitizer drops what it does not know.
//! Sample load failures are swallowed by the audio engine (the note simply
//! does not sound). What remains are the conditions a caller must react to.
//!
//! ## Error Types
//! - `AudioBlocked` - the platform kept the output context suspended after an unlock attempt
//! - `AlreadyPlaying` - `start()` was called while a phrase is still active
//! - `Config` / `UnknownToy` - invalid YAML configuration or preset name
//! - `SampleLoad` - a note sample could not be read or decoded
//! - `Output` / `ContextClosed` - the audio output is gone
//!
//! ## Usage
//! ```rust
//! use tonetoys::ToyError;
//!
//! fn describe(err: &ToyError) -> &'static str {
//!     match err {
//!         ToyError::AudioBlocked => "tap to enable sound",
//!         ToyError::AlreadyPlaying => "already playing",
//!         _ => "something went wrong",
//!     }
//! }
//! assert_eq!(describe(&ToyError::AudioBlocked), "tap to enable sound");
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToyError {
    /// The audio output context did not leave its suspended state after an
    /// explicit resume. UI should offer a "tap to enable sound" affordance.
    ///
    /// # Example
    /// ```
    /// # use tonetoys::ToyError;
    /// assert_eq!(ToyError::AudioBlocked.to_string(), "Audio output is blocked until a user gesture");
    /// ```
    #[error("Audio output is blocked until a user gesture")]
    AudioBlocked,

    /// A phrase is already playing (or priming) on this controller.
    #[error("A phrase is already playing")]
    AlreadyPlaying,

    /// Invalid toy configuration.
    ///
    /// # Example
    /// ```
    /// # use tonetoys::ToyError;
    /// let err = ToyError::Config("step-ms must be positive".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: step-ms must be positive");
    /// ```
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No built-in preset with this name.
    #[error("Unknown toy: {0}")]
    UnknownToy(String),

    /// A note sample could not be loaded.
    #[error("Failed to load sample {label}: {message}")]
    SampleLoad { label: String, message: String },

    /// The audio output device failed.
    #[error("Audio output error: {0}")]
    Output(String),

    /// The output context has been closed and can no longer schedule audio.
    #[error("Audio context is closed")]
    ContextClosed,
}
