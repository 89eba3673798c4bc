//! Error types for the detection pipeline
//!
//! Malformed input is rejected at the channel boundary with an `EventError`.
//! Nothing past the boundary can fail: the store and projector work on
//! already-typed data.

use serde_json::error::Category;
use thiserror::Error;

/// Rejection reasons for inbound detection events
#[derive(Debug, Error)]
pub enum EventError {
    /// Not parseable as JSON at all (syntax error or truncated line)
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Valid JSON that is not a detection event
    #[error("malformed detection event: {0}")]
    InvalidShape(#[source] serde_json::Error),

    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        match e.classify() {
            Category::Data => EventError::InvalidShape(e),
            Category::Syntax | Category::Eof | Category::Io => EventError::InvalidJson(e),
        }
    }
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Failures raised by event sources
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel closed")]
    ChannelClosed,
}
