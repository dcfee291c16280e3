//! Error types

use thiserror::Error;

/// Invalid modem configuration
///
/// Returned by [`ModemBuilder::build()`](crate::ModemBuilder::build).
/// Configuration errors are fatal: no worker is started.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Baud rate is zero or too fast for the sampling rate
    #[error("unsupported baud rate: {0} Bd")]
    BaudRate(u32),

    /// Tone frequency outside the usable audio band
    #[error("unsupported {which} frequency: {freq} Hz")]
    Frequency {
        /// Which tone was rejected
        which: &'static str,
        /// Offending frequency
        freq: f32,
    },

    /// The audio backend cannot open the requested device
    #[error("unsupported audio device {device:?}: {reason}")]
    Device {
        /// Requested device index
        device: Option<usize>,
        /// Explanation from the backend
        reason: String,
    },

    /// The receive debug log cannot be opened
    #[error("unable to open receive debug log: {0}")]
    DebugLog(String),

    /// A worker thread could not be started
    #[error("unable to start {0} worker")]
    Worker(&'static str),
}

/// Audio stream failure
#[derive(Error, Debug)]
pub enum AudioError {
    /// The audio stream has ended
    #[error("audio stream closed")]
    Closed,

    /// Underlying I/O failure
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}
