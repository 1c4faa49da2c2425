//! Audio feature extraction and change-point detection for ClipRank.
//!
//! This crate provides:
//! - Windowed feature extraction over mono PCM (energy, spectral descriptors,
//!   MFCCs via a mel filterbank, voice/music/silence classification,
//!   speaker-change probability)
//! - A deterministic audio change-point detector over the window sequence
//!   (distance peaks with prominence, class transitions, validation scoring,
//!   major/minor tiers, multi-scale mode)
//! - Heuristic auto-tuning of detection parameters from data statistics

pub mod changepoint;
pub mod classify;
pub mod error;
pub mod extractor;
pub mod mel;
pub mod spectrum;
pub mod tuning;

pub use changepoint::{
    compute_distances, ChangePointAnalysis, ChangePointDetector, ChangePointOptions,
    ChangePointStats, ClassSegment, DistanceSample,
};
pub use classify::{detect_speaker_change, AudioClassifier, RuleBasedClassifier};
pub use error::{AudioError, AudioResult};
pub use extractor::{aggregate_span, AudioFeatureExtractor, ShotAudioProfile};
pub use tuning::{auto_tune, TunedParameters};
