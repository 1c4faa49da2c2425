//! Visual detection, shot clustering, fusion, and scene ranking for ClipRank.
//!
//! This crate provides:
//! - Visual shot boundary detection over sampled RGB frames
//! - Shot clustering into scenes (greedy, hierarchical, k-means) with
//!   auto-tuned weights and thresholds
//! - Visual-audio fusion of boundary streams with temporal-consistency
//!   smoothing and multi-pass refinement
//! - Scene post-processing, quality scoring, and ranking
//! - The [`pipeline::SceneDetector`] entry point tying the stages together

pub mod cluster;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod pipeline;
pub mod quality;
pub mod transcript;
pub mod visual;

pub use cluster::{
    build_shot_features, classify_scene_type, shot_similarity, ClusterAnalysis, ClusterOptions,
    ClusterStats, ShotClusterer, ShotFeatures,
};
pub use error::{SceneError, SceneResult};
pub use filter::{extract_tags, filter_scenes, is_noise, AudioCriteria, AudioTag};
pub use fusion::{
    BoundaryScorer, DecisionFeatures, FusionAnalysis, FusionEngine, FusionOptions, FusionStats,
    RuleBasedScorer, ShotCut,
};
pub use pipeline::{Diagnostics, PipelineInput, SceneAnalysis, SceneDetector};
pub use quality::{enforce_length_constraints, rank_scenes, QualityScorer};
pub use transcript::{segment_transcript, TranscriptSegment};
pub use visual::{FrameSequence, VisualAnalysis, VisualBoundaryDetector, VisualStats};
