//! The scene analysis pipeline.
//!
//! One invocation processes one complete video: visual boundary detection and
//! audio feature extraction run over the same media, audio change points are
//! derived from the window sequence, and either the clustering path or the
//! fusion path (config-selected) turns the streams into scenes, which are
//! then length-constrained, quality-scored, and ranked.
//!
//! Collaborators (classifier, boundary scorer) are injected through the
//! constructor; there are no hidden globals.

use std::sync::Arc;

use tracing::{info, warn};

use cliprank_audio::{
    aggregate_span, auto_tune, compute_distances, AudioClassifier, AudioFeatureExtractor,
    ChangePointAnalysis, ChangePointDetector, ChangePointOptions, ChangePointStats, ClassSegment,
    DistanceSample, ShotAudioProfile,
};
use cliprank_models::{
    AudioWindow, ChangePoint, PeakDetection, PipelineConfig, Scene, SceneBoundary,
    SegmentationStrategy, Shot, VisualBoundary,
};

use crate::cluster::{classify_scene_type, ClusterOptions, ClusterStats, ShotClusterer};
use crate::error::{SceneError, SceneResult};
use crate::fusion::{BoundaryScorer, FusionDecision, FusionEngine, FusionOptions, FusionStats};
use crate::quality::{enforce_length_constraints, rank_scenes, QualityScorer};
use crate::transcript::{segment_transcript, TranscriptSegment};
use crate::visual::{FrameSequence, VisualBoundaryDetector, VisualStats};

/// Decoded media handed to one pipeline invocation by the external decoder.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInput<'a> {
    /// Mono PCM samples for the full audio track.
    pub samples: &'a [f32],
    /// RGB frames sampled at a fixed rate for the full video.
    pub frames: &'a FrameSequence,
    /// Total duration in seconds.
    pub duration: f64,
    /// Optional plain-text transcript for semantic segmentation.
    pub transcript: Option<&'a str>,
}

/// Per-stage diagnostic statistics, returned alongside the scenes for
/// observability.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub visual: VisualStats,
    pub visual_boundaries: Vec<VisualBoundary>,
    pub window_count: usize,
    pub change_points: Vec<ChangePoint>,
    pub distance_series: Vec<DistanceSample>,
    pub class_segments: Vec<ClassSegment>,
    pub change_point_stats: ChangePointStats,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub cluster: Option<ClusterStats>,
    pub fusion: Option<FusionStats>,
    pub fusion_decisions: Vec<FusionDecision>,
    pub scene_boundaries: Vec<SceneBoundary>,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct SceneAnalysis {
    /// Final scenes, ranked best-first by quality.
    pub scenes: Vec<Scene>,
    /// Aggregated audio profile per scene, parallel to `scenes`.
    pub scene_profiles: Vec<ShotAudioProfile>,
    pub diagnostics: Diagnostics,
}

/// The scene detection pipeline.
pub struct SceneDetector {
    config: PipelineConfig,
    classifier: Option<Arc<dyn AudioClassifier>>,
    scorer: Option<Arc<dyn BoundaryScorer>>,
}

impl SceneDetector {
    /// Create a detector, validating the configuration fail-fast.
    pub fn new(config: PipelineConfig) -> SceneResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            classifier: None,
            scorer: None,
        })
    }

    /// Substitute a custom audio classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn AudioClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Substitute a custom boundary scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn BoundaryScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Run the full pipeline over one video's decoded media.
    ///
    /// Returns a non-empty, ranked scene list for any positive-duration input
    /// with usable signal, or a single typed fatal error.
    pub fn detect(&self, input: &PipelineInput<'_>) -> SceneResult<SceneAnalysis> {
        if input.duration <= 0.0 {
            return Err(SceneError::internal("non-positive duration"));
        }

        // Visual and audio feature passes over the same media.
        let visual_detector = VisualBoundaryDetector::new(self.config.sensitivity);
        let visual = visual_detector.detect(input.frames, input.duration)?;

        let mut extractor = AudioFeatureExtractor::from_config(&self.config);
        if let Some(classifier) = &self.classifier {
            extractor = extractor.with_classifier(classifier.clone());
        }
        let windows = extractor.extract(input.samples)?;

        // Change-point detection, auto-tuning unset thresholds from the data.
        let change_analysis = self.detect_change_points(&windows);

        let shots = Shot::from_boundaries(&visual.boundaries, input.duration);
        let transcript_segments = input
            .transcript
            .map(|text| segment_transcript(text, input.duration))
            .unwrap_or_default();

        let mut diagnostics = Diagnostics {
            visual: visual.statistics.clone(),
            visual_boundaries: visual.boundaries.clone(),
            window_count: windows.len(),
            change_points: change_analysis.change_points.clone(),
            distance_series: change_analysis.distances.clone(),
            class_segments: change_analysis.segments.clone(),
            change_point_stats: change_analysis.statistics.clone(),
            transcript_segments: transcript_segments.clone(),
            ..Default::default()
        };

        // Segmentation: clustering path or fusion path over the same inputs.
        let mut scenes = match self.config.strategy {
            SegmentationStrategy::Clustering => {
                let clusterer = ShotClusterer::new(ClusterOptions::from_config(&self.config));
                let analysis = clusterer.cluster(&shots, &windows);
                diagnostics.cluster = Some(analysis.statistics.clone());
                analysis.scenes
            }
            SegmentationStrategy::Fusion => {
                let mut engine = FusionEngine::new(FusionOptions::from_config(&self.config));
                if let Some(scorer) = &self.scorer {
                    engine = engine.with_scorer(scorer.clone());
                }
                let analysis = engine.fuse(
                    &visual.boundaries,
                    &windows,
                    &change_analysis.change_points,
                    &transcript_segments,
                    input.duration,
                );
                diagnostics.fusion = Some(analysis.statistics.clone());
                diagnostics.fusion_decisions = analysis.decisions.clone();
                diagnostics.scene_boundaries = analysis.scene_boundaries.clone();
                let mut scenes =
                    scenes_from_boundaries(&analysis.scene_boundaries, &shots, input.duration);
                for scene in scenes.iter_mut() {
                    let profile = aggregate_span(&windows, scene.start, scene.end);
                    scene.scene_type =
                        classify_scene_type(&profile, mean_shot_change(&shots, scene));
                }
                scenes
            }
        };

        // Post-processing: length constraints, quality scoring, ranking.
        let constraints = self.config.effective_constraints();
        scenes = enforce_length_constraints(scenes, &constraints);
        if scenes.is_empty() {
            warn!("Segmentation produced no scenes, falling back to the full clip");
            let mut scene = Scene::new(0.0, input.duration, 0.5, shots.len().max(1));
            let profile = aggregate_span(&windows, 0.0, input.duration);
            scene.scene_type = classify_scene_type(&profile, mean_shot_change(&shots, &scene));
            scenes.push(scene);
        }

        let quality_scorer = QualityScorer::new(constraints);
        for scene in scenes.iter_mut() {
            let profile = aggregate_span(&windows, scene.start, scene.end);
            let visual_change = mean_shot_change(&shots, scene);
            scene.quality = Some(quality_scorer.score(scene, &profile, visual_change));
        }
        rank_scenes(&mut scenes);

        let scene_profiles = scenes
            .iter()
            .map(|scene| aggregate_span(&windows, scene.start, scene.end))
            .collect();

        info!(
            scenes = scenes.len(),
            windows = windows.len(),
            visual_boundaries = diagnostics.visual_boundaries.len(),
            change_points = diagnostics.change_points.len(),
            strategy = ?self.config.strategy,
            "Scene analysis completed"
        );

        Ok(SceneAnalysis {
            scenes,
            scene_profiles,
            diagnostics,
        })
    }

    /// Run change-point detection, auto-tuning unset parameters.
    ///
    /// Auto-tuned thresholds are absolute values derived from the distance
    /// signal, so they run under fixed-mode peak detection.
    fn detect_change_points(&self, windows: &[AudioWindow]) -> ChangePointAnalysis {
        let mut options = ChangePointOptions::from_config(&self.config);

        if self.config.threshold.is_none() || self.config.min_distance.is_none() {
            let raw = compute_distances(windows, self.config.distance_metric);
            let tuned = auto_tune(&raw, windows);
            if self.config.threshold.is_none() {
                options.threshold = Some(tuned.threshold);
                options.peak_detection = PeakDetection::Fixed;
            }
            if self.config.min_distance.is_none() {
                options.min_distance = Some(tuned.min_distance);
            }
        }

        ChangePointDetector::new(options).detect(windows)
    }
}

/// Convert an ordered boundary stream into contiguous scene spans over
/// `[0, duration]`.
fn scenes_from_boundaries(
    boundaries: &[SceneBoundary],
    shots: &[Shot],
    duration: f64,
) -> Vec<Scene> {
    if boundaries.is_empty() {
        return vec![Scene::new(0.0, duration, 0.5, shots.len().max(1))];
    }

    let mut scenes = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0.0;
    for boundary in boundaries {
        if boundary.timestamp <= start {
            continue;
        }
        scenes.push(span_scene(start, boundary.timestamp, boundary.confidence, shots));
        start = boundary.timestamp;
    }
    if duration > start {
        scenes.push(span_scene(start, duration, 0.7, shots));
    }
    scenes
}

fn span_scene(start: f64, end: f64, confidence: f64, shots: &[Shot]) -> Scene {
    let shot_count = shots
        .iter()
        .filter(|shot| shot.start >= start && shot.start < end)
        .count()
        .max(1);
    Scene::new(start, end, confidence, shot_count)
}

/// Mean transition magnitude of the shots inside a scene's span.
fn mean_shot_change(shots: &[Shot], scene: &Scene) -> f64 {
    let members: Vec<&Shot> = shots
        .iter()
        .filter(|shot| shot.start >= scene.start && shot.start < scene.end)
        .collect();
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|shot| shot.confidence).sum::<f64>() / members.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliprank_models::BoundarySource;

    fn boundary(t: f64, confidence: f64) -> SceneBoundary {
        SceneBoundary {
            timestamp: t,
            confidence,
            sources: vec![BoundarySource::Visual],
            visual_change: confidence,
            audio_distance: 0.0,
            audio_class_change: 0.0,
            score: 0.0,
            temporally_consistent: true,
        }
    }

    #[test]
    fn test_scenes_from_boundaries_cover_duration() {
        let shots = Shot::from_boundaries(&[], 30.0);
        let boundaries = vec![boundary(10.0, 0.8), boundary(20.0, 0.9)];
        let scenes = scenes_from_boundaries(&boundaries, &shots, 30.0);

        assert_eq!(scenes.len(), 3);
        assert!(scenes[0].start.abs() < 1e-9);
        assert!((scenes[2].end - 30.0).abs() < 1e-9);
        let total: f64 = scenes.iter().map(|s| s.duration).sum();
        assert!((total - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_boundaries_yield_full_clip_scene() {
        let shots = Shot::from_boundaries(&[], 12.0);
        let scenes = scenes_from_boundaries(&[], &shots, 12.0);
        assert_eq!(scenes.len(), 1);
        assert!((scenes[0].duration - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = PipelineConfig {
            min_scene_length: 90.0,
            max_scene_length: Some(60.0),
            ..Default::default()
        };
        assert!(SceneDetector::new(config).is_err());
    }
}
