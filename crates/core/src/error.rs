//! Error types for the text layer
//!
//! None of these escape the page layer as hard failures: callers log them and
//! carry on with a partially highlighted or partially aligned overlay.

use crate::config::ConfigError;
use std::fmt;

/// Why a match offset could not be mapped onto a span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFailure {
    /// The layer has no spans at all
    NoSpans,
    /// Offset is smaller than a previous one; the walk never backtracks
    OutOfOrder,
    /// Offset lies beyond the end of the page text
    PastEnd,
}

impl fmt::Display for MappingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            MappingFailure::NoSpans => "layer has no spans",
            MappingFailure::OutOfOrder => "offsets not ascending",
            MappingFailure::PastEnd => "offset past end of text",
        };
        f.write_str(reason)
    }
}

/// Errors raised inside the text layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextLayerError {
    #[error("could not find matching position for offset {offset}: {reason}")]
    Mapping {
        offset: usize,
        reason: MappingFailure,
    },

    #[error("span index {index} is out of range (layer has {count} spans)")]
    UnknownSpan { index: usize, count: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for text layer operations
pub type TextLayerResult<T> = Result<T, TextLayerError>;
