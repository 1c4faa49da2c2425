//! Error types for audio analysis.

use thiserror::Error;

/// Result type for audio analysis operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur during audio analysis.
///
/// Only the total absence of signal is fatal; a single window failing is
/// absorbed by the extractor, which substitutes a neutral window and moves on.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio signal to analyze")]
    NoSignal,

    #[error("window at {start:.2}s failed feature extraction: {reason}")]
    WindowExtraction { start: f64, reason: String },
}

impl AudioError {
    /// Create a window extraction error.
    pub fn window_extraction(start: f64, reason: impl Into<String>) -> Self {
        Self::WindowExtraction {
            start,
            reason: reason.into(),
        }
    }
}
