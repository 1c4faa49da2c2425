//! Shared data models for the ClipRank scene analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Audio feature windows (energy, spectral descriptors, MFCCs, classification)
//! - Visual boundaries and shots
//! - Audio change points
//! - Scene boundaries, scenes, and quality scores
//! - Pipeline configuration with fail-fast validation
//!
//! Every entity here is request-scoped: stages consume immutable inputs and
//! produce new outputs, nothing outlives one pipeline invocation.

pub mod audio;
pub mod changepoint;
pub mod config;
pub mod scene;
pub mod visual;

// Re-export common types
pub use audio::{
    AudioClass, AudioWindow, Classification, EnergyFeatures, SpectralFeatures, SpeakerChange,
    MFCC_COUNT,
};
pub use changepoint::{ChangeLevel, ChangePoint, ChangePointKind};
pub use config::{
    ClusterMethod, ConfigError, ConfigResult, DistanceMetric, LengthConstraints, Linkage,
    PeakDetection, PipelineConfig, SegmentationStrategy, WorkflowType,
};
pub use scene::{
    BoundarySource, QualityFactors, QualityGrade, Scene, SceneBoundary, SceneQuality, SceneType,
};
pub use visual::{Shot, VisualBoundary, VisualCues};
