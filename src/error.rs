//! # Error Types
//!
//! This module defines all error types for the notation compiler and the playback engine.
//!
//! Errors raised while decoding text carry the offending input so callers can point
//! at the exact token that failed.
//!
//! ## Error Types
//! - `ParseError` - Malformed note, rest, duration or symbol-sequence text
//! - `RangeError` - Pitch, intensity or tempo outside its allowed bounds
//! - `InvalidDuration` / `InvalidArgument` - Illegal numeric arguments
//! - `NoSuchInstrument` / `CapacityExceeded` - Channel allocation failures
//! - `DeviceUnavailable` - The player cannot be used
//! - `MidiFile`, `Config`, `Io` - Persistence and configuration failures
//!
//! ## Usage
//! ```rust
//! use partitura::{Note, PartituraError};
//!
//! match "SOL#9".parse::<Note>() {
//!     Ok(note) => println!("pitch {}", note.pitch().number()),
//!     Err(PartituraError::RangeError(message)) => eprintln!("out of range: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartituraError {
    /// Malformed textual encoding.
    ///
    /// # Example
    /// ```
    /// # use partitura::PartituraError;
    /// let err = PartituraError::ParseError {
    ///     input: "DO:x".to_string(),
    ///     message: "invalid duration 'x'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error in 'DO:x': invalid duration 'x'");
    /// ```
    #[error("Parse error in '{input}': {message}")]
    ParseError { input: String, message: String },

    /// Pitch, intensity or bpm outside the allowed bounds.
    #[error("Value out of range: {0}")]
    RangeError(String),

    /// A duration that would be zero or negative.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// A non-positive or otherwise illegal numeric argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The channel allocator knows no instrument matching the requested name.
    #[error("No such instrument: {0}")]
    NoSuchInstrument(String),

    /// The device's channel table is full.
    ///
    /// # Example
    /// ```
    /// # use partitura::PartituraError;
    /// let err = PartituraError::CapacityExceeded { capacity: 16 };
    /// assert_eq!(err.to_string(), "Channel table full: at most 16 channels can be assigned");
    /// ```
    #[error("Channel table full: at most {capacity} channels can be assigned")]
    CapacityExceeded { capacity: usize },

    /// The player cannot be acquired or has been closed.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A Standard MIDI File could not be decoded or encoded.
    #[error("MIDI file error: {0}")]
    MidiFile(String),

    /// Invalid configuration values or YAML.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PartituraError {
    pub(crate) fn parse(input: &str, message: impl Into<String>) -> Self {
        PartituraError::ParseError {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PartituraError>;
