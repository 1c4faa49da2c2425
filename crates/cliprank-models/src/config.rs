//! Pipeline configuration.
//!
//! Every knob is optional in spirit: fields left at their defaults (or `None`
//! for the nullable thresholds/weights) are auto-tuned from data statistics by
//! the stage that consumes them. Validation is fail-fast and happens before
//! any computation starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by fail-fast configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum scene length {min} must be below maximum {max}")]
    InvalidSceneLengths { min: f64, max: f64 },

    #[error("{name} must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("hop size {hop} must be positive and no larger than window size {window}")]
    InvalidWindowing { window: f64, hop: f64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

/// Metric used for inter-window feature distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Euclidean,
    Cosine,
    /// 60/40 blend of normalized Euclidean and cosine distance.
    Weighted,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::Weighted
    }
}

/// Peak detection threshold mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakDetection {
    /// Threshold derived from the distance signal (`mean + k * std`).
    Adaptive,
    /// The configured threshold is used as-is.
    Fixed,
}

impl Default for PeakDetection {
    fn default() -> Self {
        PeakDetection::Adaptive
    }
}

/// Shot clustering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
    /// Greedy in-order grouping by similarity to the current cluster's tail.
    Similarity,
    /// Agglomerative merging over a precomputed similarity matrix.
    Hierarchical,
    /// K-means over the combined feature vector with a seeded initializer.
    Kmeans,
}

impl Default for ClusterMethod {
    fn default() -> Self {
        ClusterMethod::Similarity
    }
}

/// Inter-cluster distance rule for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    Single,
    Average,
    Complete,
}

impl Default for Linkage {
    fn default() -> Self {
        Linkage::Average
    }
}

/// Which path turns boundaries and features into scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// Visual-first fusion of boundary and audio streams (default).
    Fusion,
    /// Shot clustering over combined visual+audio similarity.
    Clustering,
}

impl Default for SegmentationStrategy {
    fn default() -> Self {
        SegmentationStrategy::Fusion
    }
}

/// Target platform, selecting preset scene length constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Tiktok,
    Youtube,
    Instagram,
    General,
}

impl Default for WorkflowType {
    fn default() -> Self {
        WorkflowType::General
    }
}

/// Scene length constraints for a workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthConstraints {
    /// Minimum scene length in seconds.
    pub min_length: f64,
    /// Maximum scene length in seconds, unbounded when `None`.
    pub max_length: Option<f64>,
    /// Preferred length in seconds for duration-fit scoring.
    pub preferred_length: Option<f64>,
}

impl WorkflowType {
    /// Preset constraints per platform.
    pub fn constraints(&self) -> LengthConstraints {
        match self {
            WorkflowType::Tiktok => LengthConstraints {
                min_length: 1.0,
                max_length: Some(60.0),
                preferred_length: Some(15.0),
            },
            WorkflowType::Youtube => LengthConstraints {
                min_length: 5.0,
                max_length: Some(300.0),
                preferred_length: Some(60.0),
            },
            WorkflowType::Instagram => LengthConstraints {
                min_length: 1.0,
                max_length: Some(60.0),
                preferred_length: Some(30.0),
            },
            WorkflowType::General => LengthConstraints {
                min_length: 1.0,
                max_length: None,
                preferred_length: None,
            },
        }
    }
}

/// Full pipeline configuration.
///
/// Nullable fields (`threshold`, `min_distance`, `visual_weight`,
/// `audio_weight`, `similarity_threshold`) fall back to auto-tuning from the
/// observed feature statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Audio analysis window size in seconds (0.5-1.0 recommended).
    pub window_size: f64,
    /// Hop between window starts in seconds; `hop_size < window_size` gives
    /// overlapping windows.
    pub hop_size: f64,
    /// PCM sample rate in Hz.
    pub sample_rate: u32,

    /// Visual frame sensitivity: boundaries fire above this dissimilarity.
    pub sensitivity: f64,

    pub distance_metric: DistanceMetric,
    /// Change-point threshold; auto-tuned when `None`.
    pub threshold: Option<f64>,
    /// Minimum time between change points in seconds; auto-tuned when `None`.
    pub min_distance: Option<f64>,
    /// Smooth the distance signal with a centered moving average.
    pub smoothing: bool,
    /// Moving-average width in samples.
    pub smoothing_window: usize,
    pub peak_detection: PeakDetection,
    /// Repeat detection at aggregation scales {1, 2, 4} and merge.
    pub multi_scale: bool,
    /// Split surviving change points into major/minor tiers.
    pub hierarchical: bool,

    pub strategy: SegmentationStrategy,

    pub method: ClusterMethod,
    pub linkage: Linkage,
    /// Visual similarity weight; auto-tuned from feature variance when `None`.
    pub visual_weight: Option<f64>,
    /// Audio similarity weight; auto-tuned from feature variance when `None`.
    pub audio_weight: Option<f64>,
    /// Clustering similarity threshold; auto-tuned when `None`.
    pub similarity_threshold: Option<f64>,
    /// Retry clustering around the threshold and keep the most coherent run.
    pub optimize_coherence: bool,
    /// Try fine/medium/coarse thresholds and select by blended score.
    pub multi_resolution: bool,
    /// Nudge cluster boundaries onto nearby audio change maxima.
    pub refine_boundaries: bool,
    /// Seed for k-means centroid initialization.
    pub kmeans_seed: u64,

    /// Minimum scene length in seconds.
    pub min_scene_length: f64,
    /// Maximum scene length in seconds; workflow preset applies when `None`.
    pub max_scene_length: Option<f64>,

    /// Apply the rule-model scorer during fusion.
    pub use_ml: bool,
    /// Demote temporally isolated fusion decisions.
    pub temporal_consistency: bool,
    /// Auto-tune fusion thresholds from observed distances.
    pub adaptive_thresholds: bool,
    /// Calibrate boundary confidence from source agreement.
    pub confidence_calibration: bool,
    /// Require visual AND audio agreement instead of OR.
    pub require_both: bool,
    /// Maximum fusion refinement passes.
    pub refinement_passes: usize,

    pub workflow: WorkflowType,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 0.5,
            hop_size: 0.25,
            sample_rate: 44_100,
            sensitivity: 0.3,
            distance_metric: DistanceMetric::default(),
            threshold: None,
            min_distance: None,
            smoothing: true,
            smoothing_window: 3,
            peak_detection: PeakDetection::default(),
            multi_scale: false,
            hierarchical: false,
            strategy: SegmentationStrategy::default(),
            method: ClusterMethod::default(),
            linkage: Linkage::default(),
            visual_weight: None,
            audio_weight: None,
            similarity_threshold: None,
            optimize_coherence: true,
            multi_resolution: false,
            refine_boundaries: true,
            kmeans_seed: 0,
            min_scene_length: 2.0,
            max_scene_length: None,
            use_ml: true,
            temporal_consistency: true,
            adaptive_thresholds: true,
            confidence_calibration: true,
            require_both: false,
            refinement_passes: 3,
            workflow: WorkflowType::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration, failing fast before any computation.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_size <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "window_size",
                value: self.window_size,
            });
        }
        if self.hop_size <= 0.0 || self.hop_size > self.window_size {
            return Err(ConfigError::InvalidWindowing {
                window: self.window_size,
                hop: self.hop_size,
            });
        }
        if self.min_scene_length <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "min_scene_length",
                value: self.min_scene_length,
            });
        }
        if let Some(max) = self.effective_constraints().max_length {
            if self.min_scene_length >= max {
                return Err(ConfigError::InvalidSceneLengths {
                    min: self.min_scene_length,
                    max,
                });
            }
        }
        for (name, weight) in [
            ("visual_weight", self.visual_weight),
            ("audio_weight", self.audio_weight),
            ("similarity_threshold", self.similarity_threshold),
        ] {
            if let Some(value) = weight {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::WeightOutOfRange { name, value });
                }
            }
        }
        if !(0.0..=1.0).contains(&self.sensitivity) {
            return Err(ConfigError::WeightOutOfRange {
                name: "sensitivity",
                value: self.sensitivity,
            });
        }
        Ok(())
    }

    /// Length constraints after overlaying explicit bounds on the workflow
    /// preset.
    pub fn effective_constraints(&self) -> LengthConstraints {
        let preset = self.workflow.constraints();
        LengthConstraints {
            min_length: self.min_scene_length.max(preset.min_length),
            max_length: self.max_scene_length.or(preset.max_length),
            preferred_length: preset.preferred_length,
        }
    }

    /// Builder-style setter for the segmentation strategy.
    pub fn with_strategy(mut self, strategy: SegmentationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder-style setter for the workflow preset.
    pub fn with_workflow(mut self, workflow: WorkflowType) -> Self {
        self.workflow = workflow;
        self
    }

    /// Builder-style setter for the clustering method.
    pub fn with_method(mut self, method: ClusterMethod) -> Self {
        self.method = method;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_scene_lengths_fail_fast() {
        let config = PipelineConfig {
            min_scene_length: 90.0,
            max_scene_length: Some(60.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSceneLengths { .. })
        ));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let config = PipelineConfig {
            visual_weight: Some(1.4),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn test_hop_larger_than_window_rejected() {
        let config = PipelineConfig {
            window_size: 0.5,
            hop_size: 0.75,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindowing { .. })
        ));
    }

    #[test]
    fn test_workflow_presets() {
        let tiktok = WorkflowType::Tiktok.constraints();
        assert!((tiktok.preferred_length.unwrap() - 15.0).abs() < 1e-9);
        let general = WorkflowType::General.constraints();
        assert!(general.max_length.is_none());
    }

    #[test]
    fn test_explicit_max_overrides_preset() {
        let config = PipelineConfig {
            workflow: WorkflowType::Tiktok,
            max_scene_length: Some(30.0),
            ..Default::default()
        };
        let constraints = config.effective_constraints();
        assert!((constraints.max_length.unwrap() - 30.0).abs() < 1e-9);
    }
}
