//! Visual-audio fusion of boundary streams.
//!
//! The default (non-clustering) path: every visual boundary is checked
//! against the audio just before and after it, accepted via OR (or AND when
//! `require_both`), scored by a pluggable rule model, smoothed for temporal
//! consistency, calibrated, and refined over multiple passes that drop weak
//! boundaries, merge near-duplicates, and backfill audio-only change points.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use cliprank_audio::aggregate_span;
use cliprank_models::{
    AudioWindow, BoundarySource, ChangePoint, PipelineConfig, SceneBoundary, VisualBoundary,
};

use crate::transcript::TranscriptSegment;

/// Seconds of audio compared on each side of a boundary.
const DEFAULT_AUDIO_WINDOW: f64 = 1.0;
/// Boundaries closer than this merge during refinement.
const MERGE_DISTANCE: f64 = 1.0;
/// Refinement drops boundaries at or below this confidence.
const CONFIDENCE_FLOOR: f64 = 0.4;
/// Mean-confidence gain below which refinement stops.
const MIN_CONFIDENCE_GAIN: f64 = 0.05;
/// Confidence multiplier for backfilled audio-only boundaries.
const AUDIO_ONLY_DISCOUNT: f64 = 0.7;

/// Fusion options.
#[derive(Debug, Clone)]
pub struct FusionOptions {
    /// Audio distance threshold; auto-tuned when `None`.
    pub audio_threshold: Option<f64>,
    /// Visual confidence threshold; auto-tuned when `None`.
    pub visual_threshold: Option<f64>,
    /// Classification-change threshold.
    pub class_change_threshold: f64,
    /// Require visual AND audio agreement instead of OR.
    pub require_both: bool,
    /// Apply the rule-model scorer.
    pub use_ml: bool,
    /// Demote temporally isolated decisions.
    pub temporal_consistency: bool,
    /// Derive thresholds from observed statistics.
    pub adaptive_thresholds: bool,
    /// Calibrate confidence from source agreement.
    pub confidence_calibration: bool,
    /// Maximum refinement passes.
    pub refinement_passes: usize,
    /// Seconds of audio compared around each boundary.
    pub audio_window: f64,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            audio_threshold: None,
            visual_threshold: None,
            class_change_threshold: 0.5,
            require_both: false,
            use_ml: true,
            temporal_consistency: true,
            adaptive_thresholds: true,
            confidence_calibration: true,
            refinement_passes: 3,
            audio_window: DEFAULT_AUDIO_WINDOW,
        }
    }
}

impl FusionOptions {
    /// Build options from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            audio_threshold: None,
            visual_threshold: None,
            class_change_threshold: 0.5,
            require_both: config.require_both,
            use_ml: config.use_ml,
            temporal_consistency: config.temporal_consistency,
            adaptive_thresholds: config.adaptive_thresholds,
            confidence_calibration: config.confidence_calibration,
            refinement_passes: config.refinement_passes,
            audio_window: DEFAULT_AUDIO_WINDOW,
        }
    }
}

/// Inputs to the boundary scorer for one decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionFeatures {
    pub visual_change: f64,
    pub audio_distance: f64,
    pub class_change_magnitude: f64,
    pub has_class_change: bool,
    /// Both modalities crossed their thresholds.
    pub both_agree: bool,
    /// Exactly one modality crossed its threshold.
    pub disagreement: bool,
}

/// Pluggable boundary scoring model.
///
/// The default implementation is rule-based; a trained model can be swapped
/// in without changing the pipeline contract.
pub trait BoundaryScorer: Send + Sync {
    /// Score a decision in `[0, 1]`.
    fn score(&self, features: &DecisionFeatures) -> f64;
}

/// Default rule-based scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer;

impl BoundaryScorer for RuleBasedScorer {
    fn score(&self, features: &DecisionFeatures) -> f64 {
        let mut score: f64 = 0.0;
        if features.both_agree {
            score += 0.4;
        }
        if features.visual_change > 0.6 {
            score += 0.2;
        }
        if features.audio_distance > 0.4 {
            score += 0.2;
        }
        if features.has_class_change && features.class_change_magnitude > 0.6 {
            score += 0.2;
        }
        if features.disagreement {
            score -= 0.1;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Diagnostic record of one fusion decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionDecision {
    pub timestamp: f64,
    pub visual_change: f64,
    pub audio_distance: f64,
    pub class_change: f64,
    pub is_scene_boundary: bool,
    pub confidence: f64,
    pub ml_score: f64,
    pub temporally_consistent: bool,
}

/// A boundary demoted to a plain shot cut.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotCut {
    pub timestamp: f64,
    pub visual_change: f64,
    pub audio_distance: f64,
}

/// Fusion statistics for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionStats {
    pub audio_threshold: f64,
    pub visual_threshold: f64,
    pub class_change_threshold: f64,
    pub scene_boundaries: usize,
    pub shot_cuts: usize,
    pub refinement_passes_run: usize,
}

/// Result of one fusion run.
#[derive(Debug, Clone, Default)]
pub struct FusionAnalysis {
    pub scene_boundaries: Vec<SceneBoundary>,
    pub shot_cuts: Vec<ShotCut>,
    pub decisions: Vec<FusionDecision>,
    pub statistics: FusionStats,
}

/// Visual-audio fusion engine.
pub struct FusionEngine {
    options: FusionOptions,
    scorer: Arc<dyn BoundaryScorer>,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(FusionOptions::default())
    }
}

impl FusionEngine {
    pub fn new(options: FusionOptions) -> Self {
        Self {
            options,
            scorer: Arc::new(RuleBasedScorer),
        }
    }

    /// Substitute a custom boundary scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn BoundaryScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Fuse visual boundaries with the audio streams into scene boundaries.
    pub fn fuse(
        &self,
        boundaries: &[VisualBoundary],
        windows: &[AudioWindow],
        change_points: &[ChangePoint],
        transcript: &[TranscriptSegment],
        duration: f64,
    ) -> FusionAnalysis {
        if boundaries.is_empty() {
            return FusionAnalysis::default();
        }

        let comparisons: Vec<AudioComparison> = boundaries
            .iter()
            .map(|b| compare_audio_context(b.timestamp, windows, self.options.audio_window))
            .collect();

        let thresholds = self.resolve_thresholds(boundaries, &comparisons);
        debug!(
            audio_threshold = thresholds.audio,
            visual_threshold = thresholds.visual,
            class_change_threshold = thresholds.class_change,
            boundaries = boundaries.len(),
            "Fusing visual and audio boundaries"
        );

        let mut decisions = self.initial_decisions(boundaries, &comparisons, &thresholds);
        if self.options.temporal_consistency {
            apply_temporal_consistency(&mut decisions);
        }

        let mut scene_boundaries = Vec::new();
        let mut shot_cuts = Vec::new();
        for decision in &decisions {
            if decision.accepted {
                scene_boundaries.push(decision.to_scene_boundary());
            } else {
                shot_cuts.push(ShotCut {
                    timestamp: decision.timestamp,
                    visual_change: decision.visual_change,
                    audio_distance: decision.audio_distance,
                });
            }
        }

        if self.options.confidence_calibration {
            for boundary in scene_boundaries.iter_mut() {
                calibrate(boundary, transcript);
            }
        }

        let passes_run = self.refine_multi_pass(&mut scene_boundaries, change_points);

        scene_boundaries.retain(|b| b.timestamp > 0.0 && b.timestamp < duration);
        scene_boundaries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let statistics = FusionStats {
            audio_threshold: thresholds.audio,
            visual_threshold: thresholds.visual,
            class_change_threshold: thresholds.class_change,
            scene_boundaries: scene_boundaries.len(),
            shot_cuts: shot_cuts.len(),
            refinement_passes_run: passes_run,
        };

        info!(
            scene_boundaries = statistics.scene_boundaries,
            shot_cuts = statistics.shot_cuts,
            passes = passes_run,
            "Visual-audio fusion completed"
        );

        FusionAnalysis {
            scene_boundaries,
            shot_cuts,
            decisions: decisions.iter().map(Decision::to_diagnostic).collect(),
            statistics,
        }
    }

    /// Resolve thresholds: explicit values win, then adaptive tuning, then
    /// fixed defaults.
    fn resolve_thresholds(
        &self,
        boundaries: &[VisualBoundary],
        comparisons: &[AudioComparison],
    ) -> Thresholds {
        let tuned = if self.options.adaptive_thresholds {
            Some(auto_tune_thresholds(boundaries, comparisons))
        } else {
            None
        };

        Thresholds {
            audio: self
                .options
                .audio_threshold
                .or(tuned.as_ref().map(|t| t.audio))
                .unwrap_or(0.3),
            visual: self
                .options
                .visual_threshold
                .or(tuned.as_ref().map(|t| t.visual))
                .unwrap_or(0.5),
            class_change: tuned
                .as_ref()
                .map(|t| t.class_change)
                .unwrap_or(self.options.class_change_threshold),
        }
    }

    fn initial_decisions(
        &self,
        boundaries: &[VisualBoundary],
        comparisons: &[AudioComparison],
        thresholds: &Thresholds,
    ) -> Vec<Decision> {
        boundaries
            .iter()
            .zip(comparisons.iter())
            .map(|(boundary, comparison)| {
                let visual_pass = boundary.confidence > thresholds.visual;
                let audio_pass = comparison.distance > thresholds.audio
                    || comparison.class_change > thresholds.class_change;
                let mut accepted = if self.options.require_both {
                    visual_pass && audio_pass
                } else {
                    visual_pass || audio_pass
                };

                let audio_strength = comparison.distance.max(comparison.class_change);
                let detector_confidence = match (visual_pass, audio_pass) {
                    (true, true) => boundary.confidence.max(audio_strength),
                    (true, false) => boundary.confidence,
                    (false, true) => audio_strength,
                    (false, false) => boundary.confidence.min(audio_strength),
                };

                let features = DecisionFeatures {
                    visual_change: boundary.confidence,
                    audio_distance: comparison.distance,
                    class_change_magnitude: comparison.class_change,
                    has_class_change: comparison.class_change > 0.0,
                    both_agree: visual_pass && audio_pass,
                    disagreement: visual_pass != audio_pass,
                };

                let mut ml_score = 0.0;
                let confidence = if self.options.use_ml {
                    ml_score = self.scorer.score(&features);
                    if ml_score > 0.6 {
                        accepted = true;
                    }
                    detector_confidence * 0.7 + ml_score * 0.3
                } else {
                    detector_confidence
                };

                Decision {
                    timestamp: boundary.timestamp,
                    visual_change: boundary.confidence,
                    audio_distance: comparison.distance,
                    class_change: comparison.class_change,
                    visual_pass,
                    audio_pass,
                    accepted,
                    confidence,
                    ml_score,
                    temporally_consistent: true,
                }
            })
            .collect()
    }

    /// Iterative refinement: drop weak boundaries, merge near-duplicates,
    /// backfill audio-only change points. Each pass depends on the previous
    /// pass's output, so this stays sequential.
    fn refine_multi_pass(
        &self,
        boundaries: &mut Vec<SceneBoundary>,
        change_points: &[ChangePoint],
    ) -> usize {
        let mut passes = 0;
        while passes < self.options.refinement_passes {
            let before_count = boundaries.len();
            let before_mean = mean_confidence(boundaries);

            boundaries.retain(|b| b.confidence > CONFIDENCE_FLOOR);
            merge_nearby_boundaries(boundaries);
            backfill_audio_only(boundaries, change_points);
            boundaries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

            passes += 1;
            let gain = mean_confidence(boundaries) - before_mean;
            if boundaries.len() == before_count && gain <= MIN_CONFIDENCE_GAIN {
                break;
            }
        }
        passes
    }
}

struct Thresholds {
    audio: f64,
    visual: f64,
    class_change: f64,
}

struct Decision {
    timestamp: f64,
    visual_change: f64,
    audio_distance: f64,
    class_change: f64,
    visual_pass: bool,
    audio_pass: bool,
    accepted: bool,
    confidence: f64,
    ml_score: f64,
    temporally_consistent: bool,
}

impl Decision {
    fn sources(&self) -> Vec<BoundarySource> {
        let mut sources = Vec::new();
        if self.visual_pass {
            sources.push(BoundarySource::Visual);
        }
        if self.audio_pass {
            sources.push(BoundarySource::Audio);
        }
        if sources.is_empty() {
            // Resurrected by the scorer; attribute to the stronger modality.
            sources.push(if self.visual_change >= self.audio_distance.max(self.class_change) {
                BoundarySource::Visual
            } else {
                BoundarySource::Audio
            });
        }
        sources
    }

    fn to_scene_boundary(&self) -> SceneBoundary {
        SceneBoundary {
            timestamp: self.timestamp,
            confidence: self.confidence.clamp(0.0, 1.0),
            sources: self.sources(),
            visual_change: self.visual_change,
            audio_distance: self.audio_distance,
            audio_class_change: self.class_change,
            score: self.ml_score,
            temporally_consistent: self.temporally_consistent,
        }
    }

    fn to_diagnostic(&self) -> FusionDecision {
        FusionDecision {
            timestamp: self.timestamp,
            visual_change: self.visual_change,
            audio_distance: self.audio_distance,
            class_change: self.class_change,
            is_scene_boundary: self.accepted,
            confidence: self.confidence,
            ml_score: self.ml_score,
            temporally_consistent: self.temporally_consistent,
        }
    }
}

struct AudioComparison {
    distance: f64,
    class_change: f64,
}

/// Compare aggregated audio features just before and after `timestamp`.
fn compare_audio_context(
    timestamp: f64,
    windows: &[AudioWindow],
    audio_window: f64,
) -> AudioComparison {
    let before = aggregate_span(windows, timestamp - audio_window, timestamp);
    let after = aggregate_span(windows, timestamp, timestamp + audio_window);

    if before.window_count == 0 || after.window_count == 0 {
        return AudioComparison {
            distance: 0.0,
            class_change: 0.0,
        };
    }

    let energy_delta = (before.energy - after.energy).abs().min(1.0);
    let centroid_delta = ((before.centroid - after.centroid).abs() / 4000.0).min(1.0);
    let mfcc_delta: f64 = before
        .mfccs
        .iter()
        .zip(after.mfccs.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    let mfcc_delta = (mfcc_delta / 10.0).min(1.0);

    let class_diff = before.classification.voice - after.classification.voice;
    let music_diff = before.classification.music - after.classification.music;
    let silence_diff = before.classification.silence - after.classification.silence;
    let class_change =
        ((class_diff.abs() + music_diff.abs() + silence_diff.abs()) / 2.0).min(1.0);

    AudioComparison {
        distance: energy_delta * 0.4 + centroid_delta * 0.3 + mfcc_delta * 0.3,
        class_change,
    }
}

struct TunedThresholds {
    audio: f64,
    visual: f64,
    class_change: f64,
}

/// Derive thresholds from observed distances and boundary confidences
/// (`mean + 0.5 * std` pattern, clamped to sane ranges).
fn auto_tune_thresholds(
    boundaries: &[VisualBoundary],
    comparisons: &[AudioComparison],
) -> TunedThresholds {
    let distances: Vec<f64> = comparisons.iter().map(|c| c.distance).collect();
    let (mean_distance, std_distance) = mean_std(&distances);
    let audio = (mean_distance + 0.5 * std_distance).clamp(0.2, 0.5);

    let confidences: Vec<f64> = boundaries.iter().map(|b| b.confidence).collect();
    let (mean_visual, _) = mean_std(&confidences);
    let visual = (mean_visual * 0.8).clamp(0.3, 0.7);

    let class_changes: Vec<f64> = comparisons
        .iter()
        .map(|c| c.class_change)
        .filter(|&c| c > 0.0)
        .collect();
    let class_change = if class_changes.is_empty() {
        0.5
    } else {
        let (mean_class, _) = mean_std(&class_changes);
        mean_class.clamp(0.3, 0.7)
    };

    TunedThresholds {
        audio,
        visual,
        class_change,
    }
}

/// Demote accepted decisions that disagree with both neighbors (outlier
/// suppression). Neighbor agreement is evaluated against the pre-pass flags.
fn apply_temporal_consistency(decisions: &mut [Decision]) {
    let accepted: Vec<bool> = decisions.iter().map(|d| d.accepted).collect();
    for i in 0..decisions.len() {
        let prev = if i > 0 { Some(accepted[i - 1]) } else { None };
        let next = accepted.get(i + 1).copied();
        let (Some(prev), Some(next)) = (prev, next) else {
            continue;
        };

        let isolated = accepted[i] != prev && accepted[i] != next;
        if isolated && accepted[i] {
            decisions[i].accepted = false;
            decisions[i].confidence *= 0.7;
            decisions[i].temporally_consistent = false;
        } else if isolated {
            decisions[i].temporally_consistent = false;
        }
    }
}

/// Calibrate a boundary's confidence from source agreement and transcript
/// support.
fn calibrate(boundary: &mut SceneBoundary, transcript: &[TranscriptSegment]) {
    let mut confidence = boundary.confidence;

    if boundary.is_multi_source() {
        confidence *= 1.15;
    } else if boundary.sources.len() == 1 {
        confidence *= 0.9;
    }
    if boundary.temporally_consistent {
        confidence *= 1.1;
    }
    if boundary.score > 0.7 {
        confidence *= 1.1;
    }

    let transcript_support = transcript
        .iter()
        .skip(1)
        .any(|segment| (segment.start - boundary.timestamp).abs() < MERGE_DISTANCE);
    if transcript_support {
        confidence *= 1.1;
        if !boundary.sources.contains(&BoundarySource::Transcript) {
            boundary.sources.push(BoundarySource::Transcript);
        }
    }

    boundary.confidence = confidence.clamp(0.0, 1.0);
}

/// Merge boundaries within [`MERGE_DISTANCE`] into one, averaging timestamps
/// by confidence and unioning sources.
fn merge_nearby_boundaries(boundaries: &mut Vec<SceneBoundary>) {
    if boundaries.is_empty() {
        return;
    }
    let mut merged: Vec<SceneBoundary> = Vec::with_capacity(boundaries.len());
    for boundary in boundaries.drain(..) {
        let Some(last) = merged.last_mut() else {
            merged.push(boundary);
            continue;
        };
        if boundary.timestamp - last.timestamp >= MERGE_DISTANCE {
            merged.push(boundary);
            continue;
        }

        let total = last.confidence + boundary.confidence;
        let timestamp = if total > 0.0 {
            (last.timestamp * last.confidence + boundary.timestamp * boundary.confidence) / total
        } else {
            (last.timestamp + boundary.timestamp) / 2.0
        };
        last.timestamp = timestamp;
        last.confidence = last.confidence.max(boundary.confidence);
        last.visual_change = last.visual_change.max(boundary.visual_change);
        last.audio_distance = last.audio_distance.max(boundary.audio_distance);
        last.audio_class_change = last.audio_class_change.max(boundary.audio_class_change);
        last.score = last.score.max(boundary.score);
        last.temporally_consistent |= boundary.temporally_consistent;
        for source in boundary.sources {
            if !last.sources.contains(&source) {
                last.sources.push(source);
            }
        }
    }
    *boundaries = merged;
}

/// Add audio change points not yet represented within [`MERGE_DISTANCE`] of
/// an existing boundary, at a confidence discount.
fn backfill_audio_only(boundaries: &mut Vec<SceneBoundary>, change_points: &[ChangePoint]) {
    for point in change_points {
        let represented = boundaries
            .iter()
            .any(|b| (b.timestamp - point.time).abs() < MERGE_DISTANCE);
        if represented {
            continue;
        }
        boundaries.push(SceneBoundary {
            timestamp: point.time,
            confidence: point.confidence * AUDIO_ONLY_DISCOUNT,
            sources: vec![BoundarySource::Audio],
            visual_change: 0.0,
            audio_distance: point.distance,
            audio_class_change: if point.is_class_transition() { 1.0 } else { 0.0 },
            score: 0.0,
            temporally_consistent: true,
        });
    }
}

fn mean_confidence(boundaries: &[SceneBoundary]) -> f64 {
    if boundaries.is_empty() {
        return 0.0;
    }
    boundaries.iter().map(|b| b.confidence).sum::<f64>() / boundaries.len() as f64
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliprank_models::{VisualCues, AudioWindow};

    fn boundary(t: f64, confidence: f64) -> VisualBoundary {
        VisualBoundary {
            timestamp: t,
            confidence,
            cues: VisualCues::default(),
        }
    }

    fn uniform_windows(duration: f64) -> Vec<AudioWindow> {
        let mut windows = Vec::new();
        let mut start = 0.0;
        while start + 0.5 <= duration {
            windows.push(AudioWindow::neutral(start, start + 0.5));
            start += 0.5;
        }
        windows
    }

    fn fixed_options(require_both: bool) -> FusionOptions {
        FusionOptions {
            audio_threshold: Some(0.3),
            visual_threshold: Some(0.5),
            require_both,
            adaptive_thresholds: false,
            temporal_consistency: false,
            confidence_calibration: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_require_both_suppresses_visual_only_boundary() {
        // Strong visual change with flat audio. With require_both the
        // boundary must NOT be emitted; without it, it must.
        let boundaries = vec![boundary(5.0, 0.9)];
        let windows = uniform_windows(10.0);

        let strict = FusionEngine::new(fixed_options(true));
        let analysis = strict.fuse(&boundaries, &windows, &[], &[], 10.0);
        assert!(analysis.scene_boundaries.is_empty());
        assert_eq!(analysis.shot_cuts.len(), 1);
        assert!((analysis.shot_cuts[0].timestamp - 5.0).abs() < 1e-9);

        let lenient = FusionEngine::new(fixed_options(false));
        let analysis = lenient.fuse(&boundaries, &windows, &[], &[], 10.0);
        assert_eq!(analysis.scene_boundaries.len(), 1);
        assert!((analysis.scene_boundaries[0].timestamp - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundaries_strictly_increasing_and_in_range() {
        let boundaries = vec![
            boundary(2.0, 0.8),
            boundary(6.0, 0.9),
            boundary(9.5, 0.7),
        ];
        let windows = uniform_windows(10.0);
        let engine = FusionEngine::new(fixed_options(false));
        let analysis = engine.fuse(&boundaries, &windows, &[], &[], 10.0);

        for pair in analysis.scene_boundaries.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        for b in &analysis.scene_boundaries {
            assert!(b.timestamp > 0.0 && b.timestamp < 10.0);
        }
    }

    #[test]
    fn test_nearby_boundaries_merge() {
        let boundaries = vec![boundary(5.0, 0.8), boundary(5.4, 0.6)];
        let windows = uniform_windows(10.0);
        let engine = FusionEngine::new(fixed_options(false));
        let analysis = engine.fuse(&boundaries, &windows, &[], &[], 10.0);

        assert_eq!(analysis.scene_boundaries.len(), 1);
        let merged = &analysis.scene_boundaries[0];
        // Confidence-weighted average sits between, closer to the stronger.
        assert!(merged.timestamp > 5.0 && merged.timestamp < 5.4);
        assert!(merged.timestamp < 5.2);
    }

    #[test]
    fn test_low_confidence_boundaries_dropped() {
        let boundaries = vec![boundary(3.0, 0.51), boundary(7.0, 0.9)];
        let windows = uniform_windows(10.0);
        // visual threshold 0.5: first passes barely; ml penalizes
        // disagreement, leaving its confidence under the refinement floor.
        let engine = FusionEngine::new(fixed_options(false));
        let analysis = engine.fuse(&boundaries, &windows, &[], &[], 10.0);
        assert_eq!(analysis.scene_boundaries.len(), 1);
        assert!((analysis.scene_boundaries[0].timestamp - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_audio_only_change_points_backfilled() {
        let boundaries = vec![boundary(2.0, 0.9)];
        let windows = uniform_windows(20.0);
        let change_points = vec![cliprank_models::ChangePoint {
            index: 30,
            time: 15.0,
            distance: 0.8,
            confidence: 0.9,
            kind: cliprank_models::ChangePointKind::DistancePeak,
            from_class: None,
            to_class: None,
            validation_score: None,
            level: None,
        }];
        let engine = FusionEngine::new(fixed_options(false));
        let analysis = engine.fuse(&boundaries, &windows, &change_points, &[], 20.0);

        assert_eq!(analysis.scene_boundaries.len(), 2);
        let backfilled = analysis
            .scene_boundaries
            .iter()
            .find(|b| (b.timestamp - 15.0).abs() < 1e-9)
            .expect("backfilled boundary");
        assert_eq!(backfilled.sources, vec![BoundarySource::Audio]);
        assert!((backfilled.confidence - 0.9 * AUDIO_ONLY_DISCOUNT).abs() < 1e-9);
    }

    #[test]
    fn test_temporal_outlier_demoted() {
        // Middle boundary accepted while both neighbors are rejected: an
        // isolated decision, demoted to a shot cut.
        let boundaries = vec![
            boundary(2.0, 0.2),
            boundary(5.0, 0.9),
            boundary(8.0, 0.2),
        ];
        let windows = uniform_windows(10.0);
        let options = FusionOptions {
            temporal_consistency: true,
            use_ml: false,
            confidence_calibration: false,
            adaptive_thresholds: false,
            audio_threshold: Some(0.3),
            visual_threshold: Some(0.5),
            ..Default::default()
        };
        let engine = FusionEngine::new(options);
        let analysis = engine.fuse(&boundaries, &windows, &[], &[], 10.0);
        assert!(analysis.scene_boundaries.is_empty());
        assert_eq!(analysis.shot_cuts.len(), 3);
    }

    #[test]
    fn test_rule_scorer_rewards_agreement() {
        let scorer = RuleBasedScorer;
        let agree = scorer.score(&DecisionFeatures {
            visual_change: 0.8,
            audio_distance: 0.5,
            class_change_magnitude: 0.0,
            has_class_change: false,
            both_agree: true,
            disagreement: false,
        });
        let disagree = scorer.score(&DecisionFeatures {
            visual_change: 0.8,
            audio_distance: 0.05,
            class_change_magnitude: 0.0,
            has_class_change: false,
            both_agree: false,
            disagreement: true,
        });
        assert!(agree > disagree);
        assert!((agree - 0.8).abs() < 1e-9);
        assert!((disagree - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_visual_boundaries_yield_empty_analysis() {
        let engine = FusionEngine::default();
        let analysis = engine.fuse(&[], &uniform_windows(5.0), &[], &[], 5.0);
        assert!(analysis.scene_boundaries.is_empty());
        assert!(analysis.shot_cuts.is_empty());
    }
}
