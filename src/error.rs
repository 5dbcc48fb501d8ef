//! Error handling for the relay firmware
//!
//! This module defines the error type and a Result alias used throughout
//! the crate. Almost every failure in the sampling path is local: it is
//! logged and counted by the worker that hit it and never aborts a loop.
//! The only fatal condition is [`RelayError::TransportUnavailable`].

use thiserror::Error;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// A single chip exchange failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The chip transport could not be brought up at startup
    #[error("Chip transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Sending to, or bringing up, the host link failed
    #[error("Host link error: {0}")]
    HostLink(String),

    /// An inbound host frame could not be interpreted
    #[error("Host frame error: {0}")]
    Frame(#[from] FrameError),

    /// Errors related to configuration loading/saving/validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker thread panicked
    #[error("Thread '{0}' panicked")]
    Thread(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RelayError>,
    },
}

/// Reasons an inbound host frame is ignored
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer than two bytes: no opcode and payload
    #[error("frame of {len} byte(s) is too short")]
    TooShort { len: usize },

    /// Opcode not handled by the sampler
    #[error("unsupported opcode 0x{0:02X}")]
    UnsupportedOpcode(u8),

    /// Known opcode with too few payload bytes
    #[error("opcode 0x{opcode:02X} needs {needed} payload bytes, got {got}")]
    ShortPayload { opcode: u8, needed: usize, got: usize },

    /// Channel index outside the chip's channel range
    #[error("channel {0} out of range")]
    ChannelOutOfRange(u16),
}

impl RelayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RelayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error must halt the device
    pub fn is_fatal(&self) -> bool {
        match self {
            RelayError::TransportUnavailable(_) => true,
            RelayError::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
