//! Error types for scene analysis.

use thiserror::Error;

use cliprank_audio::AudioError;
use cliprank_models::ConfigError;

/// Result type for scene analysis operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors surfaced to pipeline callers.
///
/// Per-unit failures (one window, one frame) are absorbed inside the stages
/// and degrade quality instead of surfacing here. Callers see either a scene
/// list or one of these fatal errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no visual signal to analyze")]
    NoVisualSignal,

    #[error("no audio signal to analyze")]
    NoAudioSignal,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AudioError> for SceneError {
    fn from(error: AudioError) -> Self {
        match error {
            AudioError::NoSignal => SceneError::NoAudioSignal,
            AudioError::WindowExtraction { .. } => SceneError::Internal(error.to_string()),
        }
    }
}

impl SceneError {
    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
