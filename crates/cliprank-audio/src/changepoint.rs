//! Audio change-point detection over the window sequence.
//!
//! The window sequence becomes an inter-window distance signal, optionally
//! smoothed, then peak-detected with prominence filtering. Independently,
//! dominant-class transitions are detected; both candidate lists merge into
//! scored change points, optionally validated and split into major/minor
//! tiers.
//!
//! This stage is a pure function of its input: identical window sequences
//! always yield identical output.

use serde::Serialize;
use tracing::debug;

use cliprank_models::{
    AudioClass, AudioWindow, ChangeLevel, ChangePoint, ChangePointKind, DistanceMetric,
    PeakDetection, PipelineConfig,
};

/// Weight applied to the first four MFCC coefficients in distances.
const MFCC_HEAD_WEIGHT: f64 = 2.0;
/// Weight applied to classification components in the Euclidean distance.
const CLASS_WEIGHT: f64 = 1.5;
/// Centroid normalizer in Hz.
const CENTROID_SCALE: f64 = 8000.0;
/// Bandwidth normalizer in Hz.
const BANDWIDTH_SCALE: f64 = 4000.0;
/// Rolloff normalizer in Hz.
const ROLLOFF_SCALE: f64 = 16_000.0;
/// ZCR is scaled up to a comparable magnitude.
const ZCR_SCALE: f64 = 10.0;
/// Euclidean distance normalizer inside the weighted metric.
const EUCLIDEAN_NORM: f64 = 5.0;

/// Peaks must stand this fraction of the threshold above their surroundings.
const PROMINENCE_FACTOR: f64 = 0.5;
/// Validation scores below this are discarded.
const VALIDATION_FLOOR: f64 = 0.3;
/// Validation factor weights: distance magnitude, local contrast, temporal
/// consistency, classification confidence, feature consistency.
const VALIDATION_WEIGHTS: [f64; 5] = [0.3, 0.2, 0.2, 0.2, 0.1];
/// Aggregation factors for multi-scale detection.
const MULTI_SCALE_FACTORS: [usize; 3] = [1, 2, 4];

/// Options for one detection run.
#[derive(Debug, Clone)]
pub struct ChangePointOptions {
    pub metric: DistanceMetric,
    /// Adaptive mode: the `k` in `mean + k * std`. Fixed mode: the absolute
    /// threshold. Defaults to 0.3 when unset.
    pub threshold: Option<f64>,
    /// Minimum time between accepted change points, in seconds.
    pub min_distance: Option<f64>,
    pub peak_detection: PeakDetection,
    pub detect_class_transitions: bool,
    pub smoothing: bool,
    pub smoothing_window: usize,
    pub multi_scale: bool,
    /// Score surviving points on five factors and drop weak ones.
    pub validate: bool,
    /// Split surviving points into major/minor tiers.
    pub hierarchical: bool,
    /// Hop between windows, used to convert seconds to index gaps.
    pub hop_size: f64,
}

impl Default for ChangePointOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Weighted,
            threshold: None,
            min_distance: None,
            peak_detection: PeakDetection::Adaptive,
            detect_class_transitions: true,
            smoothing: true,
            smoothing_window: 3,
            multi_scale: false,
            validate: true,
            hierarchical: false,
            hop_size: 0.25,
        }
    }
}

impl ChangePointOptions {
    /// Build options from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            metric: config.distance_metric,
            threshold: config.threshold,
            min_distance: config.min_distance,
            peak_detection: config.peak_detection,
            detect_class_transitions: true,
            smoothing: config.smoothing,
            smoothing_window: config.smoothing_window,
            multi_scale: config.multi_scale,
            validate: true,
            hierarchical: config.hierarchical,
            hop_size: config.hop_size,
        }
    }

    fn threshold_value(&self) -> f64 {
        self.threshold.unwrap_or(0.3)
    }

    fn min_distance_value(&self) -> f64 {
        self.min_distance.unwrap_or(0.5)
    }

    fn min_index_gap(&self) -> usize {
        ((self.min_distance_value() / self.hop_size).round() as usize).max(1)
    }
}

/// One sample of the diagnostic distance series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceSample {
    pub index: usize,
    pub time: f64,
    pub distance: f64,
    pub raw_distance: f64,
    pub is_peak: bool,
}

/// A run of consecutive windows sharing one dominant class.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSegment {
    pub start: f64,
    pub end: f64,
    pub class: AudioClass,
    pub confidence: f64,
    pub window_count: usize,
}

/// Summary statistics for one detection run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePointStats {
    pub mean_distance: f64,
    pub std_distance: f64,
    pub max_distance: f64,
    pub total_points: usize,
    pub distance_peaks: usize,
    pub class_transitions: usize,
    pub mean_confidence: f64,
}

/// Full output of one detection run.
#[derive(Debug, Clone, Default)]
pub struct ChangePointAnalysis {
    pub change_points: Vec<ChangePoint>,
    pub distances: Vec<DistanceSample>,
    pub segments: Vec<ClassSegment>,
    pub statistics: ChangePointStats,
}

/// Audio change-point detector.
#[derive(Debug, Clone, Default)]
pub struct ChangePointDetector {
    options: ChangePointOptions,
}

impl ChangePointDetector {
    pub fn new(options: ChangePointOptions) -> Self {
        Self { options }
    }

    /// Detect change points in a window sequence.
    pub fn detect(&self, windows: &[AudioWindow]) -> ChangePointAnalysis {
        if windows.len() < 2 {
            return ChangePointAnalysis::default();
        }
        let opts = &self.options;

        let raw = compute_distances(windows, opts.metric);
        let distances = if opts.smoothing {
            smooth_signal(&raw, opts.smoothing_window)
        } else {
            raw.clone()
        };

        let gap = opts.min_index_gap();
        let mut points: Vec<ChangePoint> = if opts.multi_scale {
            self.detect_multi_scale(&distances, windows)
        } else {
            detect_peaks(&distances, opts.threshold_value(), gap, opts.peak_detection)
                .into_iter()
                .map(|peak| peak.into_change_point(windows))
                .collect()
        };

        let segments = if opts.detect_class_transitions {
            let (segments, transitions) = classify_segments(windows, &distances);
            points.extend(transitions);
            segments
        } else {
            Vec::new()
        };

        points.sort_by(|a, b| a.index.cmp(&b.index).then(b.confidence.total_cmp(&a.confidence)));
        let mut points = merge_nearby(points, gap);

        if opts.validate {
            points = validate_points(points, &distances, windows);
        }
        if opts.hierarchical {
            assign_levels(&mut points);
        }

        let peak_indices: Vec<usize> = points.iter().map(|p| p.index).collect();
        let distance_samples: Vec<DistanceSample> = distances
            .iter()
            .enumerate()
            .map(|(i, &d)| DistanceSample {
                index: i,
                time: windows[i].start,
                distance: d,
                raw_distance: raw[i],
                is_peak: peak_indices.contains(&(i + 1)),
            })
            .collect();

        let statistics = compute_stats(&distances, &points);
        debug!(
            windows = windows.len(),
            change_points = points.len(),
            segments = segments.len(),
            mean_distance = statistics.mean_distance,
            "Audio change-point detection completed"
        );

        ChangePointAnalysis {
            change_points: points,
            distances: distance_samples,
            segments,
            statistics,
        }
    }

    /// Repeat detection at aggregation factors {1, 2, 4}, taking the max
    /// distance per aggregated bucket, and merge results across scales.
    fn detect_multi_scale(&self, distances: &[f64], windows: &[AudioWindow]) -> Vec<ChangePoint> {
        let opts = &self.options;
        let gap = opts.min_index_gap();
        let mut all = Vec::new();

        for &scale in &MULTI_SCALE_FACTORS {
            let aggregated = aggregate_max(distances, scale);
            let threshold = opts.threshold_value() / scale as f64;
            let peaks = detect_peaks(&aggregated, threshold, gap, opts.peak_detection);
            for peak in peaks {
                let mapped = Peak {
                    index: (peak.index * scale).min(distances.len() - 1),
                    ..peak
                };
                all.push(mapped.into_change_point(windows));
            }
        }

        all.sort_by(|a, b| a.index.cmp(&b.index).then(b.confidence.total_cmp(&a.confidence)));
        merge_nearby(all, gap)
    }
}

/// Inter-window distances: `distances[i]` is the distance between windows
/// `i` and `i + 1`.
pub fn compute_distances(windows: &[AudioWindow], metric: DistanceMetric) -> Vec<f64> {
    windows
        .windows(2)
        .map(|pair| match metric {
            DistanceMetric::Euclidean => euclidean_distance(&pair[0], &pair[1]),
            DistanceMetric::Cosine => cosine_distance(&pair[0], &pair[1]),
            DistanceMetric::Weighted => weighted_distance(&pair[0], &pair[1]),
        })
        .collect()
}

/// Weighted, normalized Euclidean distance over energy, spectral descriptors,
/// MFCCs (first four weighted double), and classification.
fn euclidean_distance(a: &AudioWindow, b: &AudioWindow) -> f64 {
    let mut sum = 0.0;
    let mut weight = 0.0;

    let mut push = |delta: f64, w: f64| {
        sum += w * delta * delta;
        weight += w;
    };

    push(a.energy.value - b.energy.value, 1.0);
    push(
        (a.spectral.centroid - b.spectral.centroid) / CENTROID_SCALE,
        1.0,
    );
    push(
        (a.spectral.bandwidth - b.spectral.bandwidth) / BANDWIDTH_SCALE,
        1.0,
    );
    push((a.spectral.zcr - b.spectral.zcr) * ZCR_SCALE, 1.0);

    for (i, (ma, mb)) in a
        .spectral
        .mfccs
        .iter()
        .zip(b.spectral.mfccs.iter())
        .enumerate()
    {
        let w = if i < 4 { MFCC_HEAD_WEIGHT } else { 1.0 };
        push(ma - mb, w);
    }

    push(a.classification.voice - b.classification.voice, CLASS_WEIGHT);
    push(a.classification.music - b.classification.music, CLASS_WEIGHT);
    push(
        a.classification.silence - b.classification.silence,
        CLASS_WEIGHT,
    );

    (sum / weight).sqrt()
}

/// Cosine distance (1 - cosine similarity) over the full feature vector.
fn cosine_distance(a: &AudioWindow, b: &AudioWindow) -> f64 {
    let va = feature_vector(a);
    let vb = feature_vector(b);

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in va.iter().zip(vb.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// 60/40 blend of the normalized Euclidean and cosine distances.
fn weighted_distance(a: &AudioWindow, b: &AudioWindow) -> f64 {
    let euclidean = (euclidean_distance(a, b) / EUCLIDEAN_NORM).min(1.0);
    let cosine = cosine_distance(a, b);
    euclidean * 0.6 + cosine * 0.4
}

fn feature_vector(window: &AudioWindow) -> Vec<f64> {
    let mut vector = Vec::with_capacity(10 + window.spectral.mfccs.len());
    vector.push(window.energy.value);
    vector.push(window.energy.rms / 60.0);
    vector.push(window.energy.peak / 60.0);
    vector.push(window.spectral.centroid / CENTROID_SCALE);
    vector.push(window.spectral.bandwidth / BANDWIDTH_SCALE);
    vector.push(window.spectral.rolloff / ROLLOFF_SCALE);
    vector.push(window.spectral.zcr * ZCR_SCALE);
    vector.push(window.spectral.flux);
    vector.extend_from_slice(&window.spectral.mfccs);
    vector.push(window.classification.voice);
    vector.push(window.classification.music);
    vector.push(window.classification.silence);
    vector
}

/// Centered moving average over the distance signal.
pub fn smooth_signal(distances: &[f64], window_size: usize) -> Vec<f64> {
    if distances.is_empty() || window_size < 2 {
        return distances.to_vec();
    }
    let half = window_size / 2;
    (0..distances.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(distances.len() - 1);
            let slice = &distances[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

struct Peak {
    /// Index into the distance signal; the change point lands at window
    /// `index + 1`.
    index: usize,
    distance: f64,
    confidence: f64,
}

impl Peak {
    fn into_change_point(self, windows: &[AudioWindow]) -> ChangePoint {
        let window_index = (self.index + 1).min(windows.len() - 1);
        ChangePoint {
            index: window_index,
            time: windows[window_index].start,
            distance: self.distance,
            confidence: self.confidence,
            kind: ChangePointKind::DistancePeak,
            from_class: None,
            to_class: None,
            validation_score: None,
            level: None,
        }
    }
}

/// Local-maxima peak detection with prominence filtering.
fn detect_peaks(distances: &[f64], threshold: f64, gap: usize, mode: PeakDetection) -> Vec<Peak> {
    if distances.len() < 3 {
        return Vec::new();
    }

    let effective_threshold = match mode {
        PeakDetection::Adaptive => {
            let (mean, std) = mean_std(distances);
            mean + threshold * std
        }
        PeakDetection::Fixed => threshold,
    };

    let mut peaks: Vec<Peak> = Vec::new();
    for i in 1..distances.len() - 1 {
        let d = distances[i];
        if d <= distances[i - 1] || d <= distances[i + 1] || d <= effective_threshold {
            continue;
        }
        if let Some(last) = peaks.last() {
            if i - last.index < gap {
                continue;
            }
        }
        let prominence = peak_prominence(distances, i);
        if prominence < effective_threshold * PROMINENCE_FACTOR {
            continue;
        }
        peaks.push(Peak {
            index: i,
            distance: d,
            confidence: peak_confidence(d, effective_threshold, prominence),
        });
    }
    peaks
}

/// Height of a peak above the higher of its two neighboring local minima.
fn peak_prominence(distances: &[f64], peak: usize) -> f64 {
    let value = distances[peak];

    let mut left_min = value;
    for i in (0..peak).rev() {
        if distances[i] >= value {
            break;
        }
        left_min = left_min.min(distances[i]);
    }

    let mut right_min = value;
    for &d in &distances[peak + 1..] {
        if d >= value {
            break;
        }
        right_min = right_min.min(d);
    }

    (value - left_min.max(right_min)).max(0.0)
}

fn peak_confidence(distance: f64, threshold: f64, prominence: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.5;
    }
    let distance_score = ((distance - threshold) / threshold).clamp(0.0, 1.0);
    let prominence_score = (prominence / threshold).clamp(0.0, 1.0);
    distance_score * 0.6 + prominence_score * 0.4
}

/// Collapse consecutive same-class windows into segments and emit a
/// transition change point at every class boundary.
fn classify_segments(
    windows: &[AudioWindow],
    distances: &[f64],
) -> (Vec<ClassSegment>, Vec<ChangePoint>) {
    let mut segments = Vec::new();
    let mut transitions = Vec::new();

    let (first_class, first_conf) = windows[0].classification.dominant();
    let mut current = ClassSegment {
        start: windows[0].start,
        end: windows[0].end,
        class: first_class,
        confidence: first_conf,
        window_count: 1,
    };

    for (i, window) in windows.iter().enumerate().skip(1) {
        let (class, confidence) = window.classification.dominant();
        if class == current.class {
            current.end = window.end;
            current.confidence = current.confidence.max(confidence);
            current.window_count += 1;
        } else {
            transitions.push(ChangePoint {
                index: i,
                time: window.start,
                distance: distances.get(i - 1).copied().unwrap_or(0.0),
                confidence: (current.confidence + confidence) / 2.0,
                kind: ChangePointKind::ClassTransition,
                from_class: Some(current.class),
                to_class: Some(class),
                validation_score: None,
                level: None,
            });
            segments.push(current);
            current = ClassSegment {
                start: window.start,
                end: window.end,
                class,
                confidence,
                window_count: 1,
            };
        }
    }
    segments.push(current);

    (segments, transitions)
}

/// Merge candidates closer than `gap` windows, keeping the higher-confidence
/// one and preserving class-transition metadata from either side.
fn merge_nearby(points: Vec<ChangePoint>, gap: usize) -> Vec<ChangePoint> {
    let mut merged: Vec<ChangePoint> = Vec::with_capacity(points.len());
    for point in points {
        let Some(last) = merged.last_mut() else {
            merged.push(point);
            continue;
        };
        if point.index - last.index >= gap {
            merged.push(point);
            continue;
        }

        let (mut winner, loser) = if point.confidence > last.confidence {
            (point, last.clone())
        } else {
            (last.clone(), point)
        };
        winner.confidence = winner.confidence.max(loser.confidence);
        winner.distance = winner.distance.max(loser.distance);
        if winner.from_class.is_none() && loser.kind == ChangePointKind::ClassTransition {
            winner.from_class = loser.from_class;
            winner.to_class = loser.to_class;
        }
        *last = winner;
    }
    merged
}

/// Score each point on five factors and drop those below the floor.
fn validate_points(
    points: Vec<ChangePoint>,
    distances: &[f64],
    windows: &[AudioWindow],
) -> Vec<ChangePoint> {
    let max_distance = distances.iter().fold(0.0f64, |m, &d| m.max(d)).max(1e-9);

    points
        .into_iter()
        .filter_map(|mut point| {
            let dist_idx = point.index.saturating_sub(1);
            let factors = [
                point.distance / max_distance,
                local_contrast(distances, dist_idx),
                temporal_consistency(distances, dist_idx),
                point.confidence,
                feature_consistency(windows, point.index),
            ];
            let score: f64 = factors
                .iter()
                .zip(VALIDATION_WEIGHTS.iter())
                .map(|(f, w)| f * w)
                .sum::<f64>()
                .min(1.0);

            if score > VALIDATION_FLOOR {
                point.validation_score = Some(score);
                Some(point)
            } else {
                None
            }
        })
        .collect()
}

/// How much the peak stands above its local mean, in `[0, 1]`.
fn local_contrast(distances: &[f64], index: usize) -> f64 {
    const WINDOW: usize = 5;
    if index < WINDOW || index + WINDOW >= distances.len() {
        return 0.5;
    }
    let peak = distances[index];
    let slice = &distances[index - WINDOW..=index + WINDOW];
    let mean = slice.iter().sum::<f64>() / slice.len() as f64;
    if peak <= mean {
        return 0.0;
    }
    (((peak - mean) / (peak + mean + 0.01)) * 2.0).min(1.0)
}

/// Fraction of the neighborhood that is also elevated.
fn temporal_consistency(distances: &[f64], index: usize) -> f64 {
    const WINDOW: usize = 3;
    if index < WINDOW || index + WINDOW >= distances.len() {
        return 0.5;
    }
    let peak = distances[index];
    let slice = &distances[index - WINDOW..=index + WINDOW];
    slice.iter().filter(|&&d| d > peak * 0.7).count() as f64 / slice.len() as f64
}

/// Agreement between the two windows straddling the point; large feature
/// jumps lower this factor.
fn feature_consistency(windows: &[AudioWindow], index: usize) -> f64 {
    if index == 0 || index >= windows.len() {
        return 0.5;
    }
    let prev = &windows[index - 1];
    let curr = &windows[index];
    let energy_diff = (prev.energy.value - curr.energy.value).abs();
    let centroid_diff = (prev.spectral.centroid - curr.spectral.centroid).abs() / BANDWIDTH_SCALE;
    let class_diff = prev.classification.difference(&curr.classification);
    1.0 - ((energy_diff + centroid_diff + class_diff) / 3.0).min(1.0)
}

/// Split points into major/minor tiers at `mean + 0.5 * std` of confidences.
fn assign_levels(points: &mut [ChangePoint]) {
    if points.is_empty() {
        return;
    }
    let confidences: Vec<f64> = points.iter().map(|p| p.confidence).collect();
    let (mean, std) = mean_std(&confidences);
    let threshold = mean + 0.5 * std;
    for point in points.iter_mut() {
        point.level = Some(if point.confidence >= threshold {
            ChangeLevel::Major
        } else {
            ChangeLevel::Minor
        });
    }
}

/// Max-pool the distance signal by `scale`.
fn aggregate_max(distances: &[f64], scale: usize) -> Vec<f64> {
    if scale <= 1 {
        return distances.to_vec();
    }
    distances
        .chunks(scale)
        .map(|chunk| chunk.iter().fold(f64::MIN, |m, &d| m.max(d)))
        .collect()
}

fn compute_stats(distances: &[f64], points: &[ChangePoint]) -> ChangePointStats {
    let (mean, std) = mean_std(distances);
    let max = distances.iter().fold(0.0f64, |m, &d| m.max(d));
    let mean_confidence = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.confidence).sum::<f64>() / points.len() as f64
    };
    ChangePointStats {
        mean_distance: mean,
        std_distance: std,
        max_distance: max,
        total_points: points.len(),
        distance_peaks: points
            .iter()
            .filter(|p| p.kind == ChangePointKind::DistancePeak)
            .count(),
        class_transitions: points.iter().filter(|p| p.is_class_transition()).count(),
        mean_confidence,
    }
}

pub(crate) fn mean_std(values: &[f64]) -> (f64, f64) {
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
    use cliprank_models::{
        Classification, EnergyFeatures, SpectralFeatures, SpeakerChange, MFCC_COUNT,
    };

    fn window(start: f64, energy: f64, classification: Classification) -> AudioWindow {
        AudioWindow {
            start,
            end: start + 0.5,
            energy: EnergyFeatures {
                rms: -60.0 + energy * 60.0,
                peak: -55.0 + energy * 55.0,
                mean_volume: -60.0 + energy * 60.0,
                value: energy,
                is_silence: energy < 0.1,
            },
            spectral: SpectralFeatures {
                centroid: 500.0 + energy * 3000.0,
                bandwidth: 800.0,
                rolloff: 8000.0,
                zcr: 0.05,
                flux: 0.0,
                mfccs: [energy; MFCC_COUNT],
            },
            classification,
            speaker_change: SpeakerChange::none(),
        }
    }

    fn silence() -> Classification {
        Classification {
            voice: 0.1,
            music: 0.1,
            silence: 0.8,
        }
    }

    fn voice() -> Classification {
        Classification {
            voice: 0.8,
            music: 0.1,
            silence: 0.1,
        }
    }

    #[test]
    fn test_fewer_than_two_windows_yields_empty_analysis() {
        let detector = ChangePointDetector::default();
        let analysis = detector.detect(&[window(0.0, 0.5, voice())]);
        assert!(analysis.change_points.is_empty());
        assert!(analysis.distances.is_empty());
    }

    #[test]
    fn test_class_transition_detected_with_classes() {
        // A silence window followed by a voice window must produce a
        // class transition near index 1 with confidence > 0.5.
        let windows = vec![window(0.0, 0.1, silence()), window(0.5, 0.9, voice())];
        let detector = ChangePointDetector::new(ChangePointOptions {
            validate: false,
            smoothing: false,
            ..Default::default()
        });
        let analysis = detector.detect(&windows);

        let transition = analysis
            .change_points
            .iter()
            .find(|p| p.is_class_transition())
            .expect("expected a class transition");
        assert_eq!(transition.index, 1);
        assert_eq!(transition.from_class, Some(AudioClass::Silence));
        assert_eq!(transition.to_class, Some(AudioClass::Voice));
        assert!(transition.confidence > 0.5);
    }

    #[test]
    fn test_uniform_windows_produce_no_points() {
        let windows: Vec<AudioWindow> = (0..20)
            .map(|i| window(i as f64 * 0.5, 0.5, voice()))
            .collect();
        let detector = ChangePointDetector::default();
        let analysis = detector.detect(&windows);
        assert!(analysis.change_points.is_empty());
        assert_eq!(analysis.segments.len(), 1);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let windows: Vec<AudioWindow> = (0..40)
            .map(|i| {
                let energy = if i % 13 == 0 { 0.9 } else { 0.2 + (i % 3) as f64 * 0.05 };
                let class = if i < 20 { silence() } else { voice() };
                window(i as f64 * 0.5, energy, class)
            })
            .collect();
        let detector = ChangePointDetector::new(ChangePointOptions {
            hierarchical: true,
            multi_scale: true,
            ..Default::default()
        });

        let a = detector.detect(&windows);
        let b = detector.detect(&windows);
        let a_json = serde_json::to_string(&a.change_points).unwrap();
        let b_json = serde_json::to_string(&b.change_points).unwrap();
        assert_eq!(a_json, b_json);
    }

    #[test]
    fn test_peak_prominence() {
        let signal = [0.1, 0.2, 0.9, 0.3, 0.1];
        let prominence = peak_prominence(&signal, 2);
        // Higher neighboring minimum is 0.2 on the left.
        assert!((prominence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_is_centered_average() {
        let smoothed = smooth_signal(&[0.0, 3.0, 0.0], 3);
        assert!((smoothed[1] - 1.0).abs() < 1e-9);
        assert!((smoothed[0] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_distance_spike_becomes_peak() {
        let mut windows: Vec<AudioWindow> = (0..30)
            .map(|i| window(i as f64 * 0.5, 0.3, voice()))
            .collect();
        // One abrupt feature jump mid-sequence, decaying afterwards so the
        // leading distance is a strict local maximum.
        windows[15] = window(7.5, 0.95, voice());
        windows[16] = window(8.0, 0.65, voice());
        let detector = ChangePointDetector::new(ChangePointOptions {
            smoothing: false,
            validate: false,
            detect_class_transitions: false,
            ..Default::default()
        });
        let analysis = detector.detect(&windows);
        assert!(
            analysis
                .change_points
                .iter()
                .any(|p| p.kind == ChangePointKind::DistancePeak && (p.index as i64 - 15).abs() <= 1),
            "expected a distance peak near index 15, got {:?}",
            analysis.change_points
        );
    }

    #[test]
    fn test_hierarchical_levels_assigned() {
        let windows: Vec<AudioWindow> = (0..30)
            .map(|i| {
                let class = if i % 10 < 5 { voice() } else { silence() };
                window(i as f64 * 0.5, 0.5, class)
            })
            .collect();
        let detector = ChangePointDetector::new(ChangePointOptions {
            hierarchical: true,
            ..Default::default()
        });
        let analysis = detector.detect(&windows);
        assert!(!analysis.change_points.is_empty());
        assert!(analysis.change_points.iter().all(|p| p.level.is_some()));
    }

    #[test]
    fn test_merge_keeps_higher_confidence() {
        let windows = vec![
            window(0.0, 0.1, silence()),
            window(0.5, 0.9, voice()),
            window(1.0, 0.9, voice()),
        ];
        let detector = ChangePointDetector::new(ChangePointOptions {
            validate: false,
            ..Default::default()
        });
        let analysis = detector.detect(&windows);
        // Candidates within the min gap collapse into one point.
        for pair in analysis.change_points.windows(2) {
            assert!(pair[1].index - pair[0].index >= 2);
        }
    }
}
