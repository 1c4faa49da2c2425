//! Shot clustering into scenes over combined visual+audio similarity.
//!
//! Three interchangeable strategies (greedy, hierarchical-agglomerative,
//! k-means) run over per-shot feature vectors. Weights and the similarity
//! threshold auto-tune from feature variance when unset; optional searches
//! retry nearby thresholds and keep the most coherent clustering.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use cliprank_audio::{aggregate_span, ShotAudioProfile};
use cliprank_models::{
    AudioClass, AudioWindow, ClusterMethod, Linkage, PipelineConfig, Scene, SceneType, Shot,
};

/// Audio similarity component weights: energy, centroid, classification, MFCC.
const ENERGY_SIM_WEIGHT: f64 = 0.2;
const CENTROID_SIM_WEIGHT: f64 = 0.2;
const CLASS_SIM_WEIGHT: f64 = 0.3;
const MFCC_SIM_WEIGHT: f64 = 0.3;

/// Centroid closeness normalizer in Hz.
const CENTROID_SIM_SCALE: f64 = 4000.0;
/// MFCC closeness normalizer.
const MFCC_SIM_SCALE: f64 = 10.0;

/// K-means convergence tolerance on centroid movement.
const KMEANS_TOLERANCE: f64 = 0.01;
/// K-means iteration cap.
const KMEANS_MAX_ITERATIONS: usize = 10;

/// Threshold multipliers tried by coherence optimization.
const COHERENCE_TRIALS: [f64; 3] = [0.9, 1.0, 1.1];
/// Threshold multipliers for multi-resolution (fine/medium/coarse).
const RESOLUTION_TRIALS: [f64; 3] = [0.8, 1.0, 1.2];

/// Clustering options.
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    pub method: ClusterMethod,
    pub linkage: Linkage,
    /// Auto-tuned from feature variance when `None`.
    pub visual_weight: Option<f64>,
    /// Auto-tuned from feature variance when `None`.
    pub audio_weight: Option<f64>,
    /// Auto-tuned from similarity statistics when `None`.
    pub similarity_threshold: Option<f64>,
    /// Retry nearby thresholds and keep the most coherent clustering.
    pub optimize_coherence: bool,
    /// Try fine/medium/coarse thresholds and select by blended score.
    pub multi_resolution: bool,
    /// Nudge scene boundaries onto nearby audio change maxima.
    pub refine_boundaries: bool,
    /// Assign a scene type to each final scene.
    pub classify_types: bool,
    /// Seed for k-means centroid initialization.
    pub kmeans_seed: u64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            method: ClusterMethod::Similarity,
            linkage: Linkage::Average,
            visual_weight: None,
            audio_weight: None,
            similarity_threshold: None,
            optimize_coherence: true,
            multi_resolution: false,
            refine_boundaries: true,
            classify_types: true,
            kmeans_seed: 0,
        }
    }
}

impl ClusterOptions {
    /// Build options from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            method: config.method,
            linkage: config.linkage,
            visual_weight: config.visual_weight,
            audio_weight: config.audio_weight,
            similarity_threshold: config.similarity_threshold,
            optimize_coherence: config.optimize_coherence,
            multi_resolution: config.multi_resolution,
            refine_boundaries: config.refine_boundaries,
            classify_types: true,
            kmeans_seed: config.kmeans_seed,
        }
    }
}

/// Per-shot combined feature vector.
#[derive(Debug, Clone)]
pub struct ShotFeatures {
    pub index: usize,
    pub shot: Shot,
    /// Visual sub-vector: change magnitude, color, composition, camera.
    pub visual: [f64; 4],
    pub audio: ShotAudioProfile,
    /// Normalized combined vector used by k-means.
    pub combined: Vec<f64>,
}

/// Clustering statistics for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    pub scene_count: usize,
    pub cluster_count: usize,
    pub average_scene_length: f64,
    pub average_shots_per_scene: f64,
    /// Mean intra-cluster pairwise similarity.
    pub coherence: f64,
    pub visual_weight: f64,
    pub audio_weight: f64,
    pub similarity_threshold: f64,
}

/// Result of one clustering run.
#[derive(Debug, Clone, Default)]
pub struct ClusterAnalysis {
    pub scenes: Vec<Scene>,
    pub statistics: ClusterStats,
}

/// Shot-to-scene clusterer.
#[derive(Debug, Clone, Default)]
pub struct ShotClusterer {
    options: ClusterOptions,
}

impl ShotClusterer {
    pub fn new(options: ClusterOptions) -> Self {
        Self { options }
    }

    /// Group shots into scenes.
    ///
    /// Fewer than two shots is not an error: the result is exactly one scene
    /// spanning the clip.
    pub fn cluster(&self, shots: &[Shot], windows: &[AudioWindow]) -> ClusterAnalysis {
        if shots.is_empty() {
            return ClusterAnalysis::default();
        }
        if shots.len() < 2 {
            let shot = &shots[0];
            let scene = Scene::new(shot.start, shot.end, shot.confidence.max(0.5), 1);
            return ClusterAnalysis {
                scenes: vec![scene],
                statistics: ClusterStats {
                    scene_count: 1,
                    cluster_count: 1,
                    average_scene_length: shot.duration(),
                    average_shots_per_scene: 1.0,
                    coherence: 1.0,
                    ..Default::default()
                },
            };
        }

        let features = build_shot_features(shots, windows);
        let (visual_weight, audio_weight, tuned_threshold) = self.tuned_parameters(&features);
        let threshold = self.options.similarity_threshold.unwrap_or(tuned_threshold);

        debug!(
            shots = shots.len(),
            method = ?self.options.method,
            visual_weight,
            audio_weight,
            threshold,
            "Clustering shots into scenes"
        );

        let (clusters, selected_threshold) = if self.options.multi_resolution {
            self.cluster_multi_resolution(&features, threshold, visual_weight, audio_weight)
        } else if self.options.optimize_coherence {
            self.cluster_optimizing_coherence(&features, threshold, visual_weight, audio_weight)
        } else {
            (
                self.run_method(&features, threshold, visual_weight, audio_weight),
                threshold,
            )
        };

        let coherence = clustering_coherence(&clusters, &features, visual_weight, audio_weight);
        let mut scenes = clusters_to_scenes(&clusters, &features);

        if self.options.refine_boundaries {
            refine_boundaries_with_audio(&mut scenes, windows);
        }
        if self.options.classify_types {
            for scene in scenes.iter_mut() {
                let profile = aggregate_span(windows, scene.start, scene.end);
                let visual_change = mean_visual_change(&clusters, &features, scene);
                scene.scene_type = classify_scene_type(&profile, visual_change);
            }
        }

        let statistics = ClusterStats {
            scene_count: scenes.len(),
            cluster_count: clusters.len(),
            average_scene_length: if scenes.is_empty() {
                0.0
            } else {
                scenes.iter().map(|s| s.duration).sum::<f64>() / scenes.len() as f64
            },
            average_shots_per_scene: if scenes.is_empty() {
                0.0
            } else {
                scenes.iter().map(|s| s.shot_count).sum::<usize>() as f64 / scenes.len() as f64
            },
            coherence,
            visual_weight,
            audio_weight,
            similarity_threshold: selected_threshold,
        };

        info!(
            scenes = statistics.scene_count,
            coherence = statistics.coherence,
            threshold = statistics.similarity_threshold,
            "Shot clustering completed"
        );

        ClusterAnalysis { scenes, statistics }
    }

    /// Resolve weights/threshold, auto-tuning whatever is unset.
    fn tuned_parameters(&self, features: &[ShotFeatures]) -> (f64, f64, f64) {
        let (tuned_visual, tuned_threshold) = auto_tune_parameters(features);
        let visual_weight = self.options.visual_weight.unwrap_or(tuned_visual);
        let audio_weight = self.options.audio_weight.unwrap_or(1.0 - visual_weight);
        (visual_weight, audio_weight, tuned_threshold)
    }

    fn run_method(
        &self,
        features: &[ShotFeatures],
        threshold: f64,
        visual_weight: f64,
        audio_weight: f64,
    ) -> Vec<Vec<usize>> {
        match self.options.method {
            ClusterMethod::Similarity => {
                cluster_greedy(features, threshold, visual_weight, audio_weight)
            }
            ClusterMethod::Hierarchical => cluster_hierarchical(
                features,
                threshold,
                self.options.linkage,
                visual_weight,
                audio_weight,
            ),
            ClusterMethod::Kmeans => cluster_kmeans(features, threshold, self.options.kmeans_seed),
        }
    }

    /// Retry clustering at nearby thresholds; keep the most coherent run.
    ///
    /// Trials are pure and independent, so they run in parallel.
    fn cluster_optimizing_coherence(
        &self,
        features: &[ShotFeatures],
        threshold: f64,
        visual_weight: f64,
        audio_weight: f64,
    ) -> (Vec<Vec<usize>>, f64) {
        let trials: Vec<(Vec<Vec<usize>>, f64)> = COHERENCE_TRIALS
            .par_iter()
            .map(|factor| {
                let trial_threshold = threshold * factor;
                let clusters =
                    self.run_method(features, trial_threshold, visual_weight, audio_weight);
                (clusters, trial_threshold)
            })
            .collect();

        trials
            .into_iter()
            .max_by(|a, b| {
                let ca = clustering_coherence(&a.0, features, visual_weight, audio_weight);
                let cb = clustering_coherence(&b.0, features, visual_weight, audio_weight);
                ca.total_cmp(&cb)
            })
            .expect("at least one coherence trial")
    }

    /// Try fine/medium/coarse thresholds; select by a blended score of
    /// coherence, scene-count reasonableness, and shots-per-scene.
    fn cluster_multi_resolution(
        &self,
        features: &[ShotFeatures],
        threshold: f64,
        visual_weight: f64,
        audio_weight: f64,
    ) -> (Vec<Vec<usize>>, f64) {
        let trials: Vec<(Vec<Vec<usize>>, f64)> = RESOLUTION_TRIALS
            .par_iter()
            .map(|factor| {
                let trial_threshold = threshold * factor;
                let clusters =
                    self.run_method(features, trial_threshold, visual_weight, audio_weight);
                (clusters, trial_threshold)
            })
            .collect();

        trials
            .into_iter()
            .max_by(|a, b| {
                let sa = resolution_score(&a.0, features, visual_weight, audio_weight);
                let sb = resolution_score(&b.0, features, visual_weight, audio_weight);
                sa.total_cmp(&sb)
            })
            .expect("at least one resolution trial")
    }
}

/// Blended multi-resolution score: coherence, scene count 3-20, shots/scene 2-8.
fn resolution_score(
    clusters: &[Vec<usize>],
    features: &[ShotFeatures],
    visual_weight: f64,
    audio_weight: f64,
) -> f64 {
    let coherence = clustering_coherence(clusters, features, visual_weight, audio_weight);
    let scene_count = clusters.len();
    let shots_per_scene = if scene_count == 0 {
        0.0
    } else {
        features.len() as f64 / scene_count as f64
    };

    let count_score = if (3..=20).contains(&scene_count) { 1.0 } else { 0.5 };
    let shots_score = if (2.0..=8.0).contains(&shots_per_scene) {
        1.0
    } else {
        0.5
    };
    coherence * 0.5 + count_score * 0.25 + shots_score * 0.25
}

/// Build per-shot combined feature vectors.
pub fn build_shot_features(shots: &[Shot], windows: &[AudioWindow]) -> Vec<ShotFeatures> {
    shots
        .iter()
        .enumerate()
        .map(|(index, shot)| {
            let audio = aggregate_span(windows, shot.start, shot.end);
            let visual = [
                shot.confidence,
                shot.cues.color,
                shot.cues.composition,
                shot.cues.camera,
            ];
            let mut combined = Vec::with_capacity(16);
            combined.extend_from_slice(&visual);
            combined.push(audio.energy);
            combined.push(audio.centroid / 8000.0);
            combined.push(audio.bandwidth / 4000.0);
            combined.push(audio.zcr * 10.0);
            combined.push(audio.classification.voice);
            combined.push(audio.classification.music);
            combined.push(audio.classification.silence);
            combined.extend(audio.mfccs.iter().take(5).map(|m| m / MFCC_SIM_SCALE));

            ShotFeatures {
                index,
                shot: shot.clone(),
                visual,
                audio,
                combined,
            }
        })
        .collect()
}

/// Combined similarity between two shots: weighted visual cosine plus a
/// composite audio similarity.
pub fn shot_similarity(
    a: &ShotFeatures,
    b: &ShotFeatures,
    visual_weight: f64,
    audio_weight: f64,
) -> f64 {
    let visual = cosine_similarity(&a.visual, &b.visual);

    let energy_sim = 1.0 - (a.audio.energy - b.audio.energy).abs().min(1.0);
    let centroid_sim =
        1.0 - ((a.audio.centroid - b.audio.centroid).abs() / CENTROID_SIM_SCALE).min(1.0);
    let class_sim = 1.0 - a.audio.classification.difference(&b.audio.classification);
    let mfcc_sim = mfcc_similarity(&a.audio.mfccs, &b.audio.mfccs);
    let audio = energy_sim * ENERGY_SIM_WEIGHT
        + centroid_sim * CENTROID_SIM_WEIGHT
        + class_sim * CLASS_SIM_WEIGHT
        + mfcc_sim * MFCC_SIM_WEIGHT;

    visual * visual_weight + audio * audio_weight
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn mfcc_similarity(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.5;
    }
    let sum_sq: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    let distance = (sum_sq / len as f64).sqrt();
    (1.0 - distance / MFCC_SIM_SCALE).max(0.0)
}

/// Auto-tune (visual weight, similarity threshold) from feature statistics.
///
/// The modality with more variance is more discriminative and gets more
/// weight (clamped to `[0.3, 0.7]`); the threshold sits half a standard
/// deviation under the mean consecutive similarity (clamped to `[0.2, 0.5]`).
fn auto_tune_parameters(features: &[ShotFeatures]) -> (f64, f64) {
    if features.len() < 2 {
        return (0.5, 0.3);
    }

    let visual_variance: f64 = (0..4)
        .map(|dim| variance(features.iter().map(|f| f.visual[dim])))
        .sum();
    let audio_dims = features[0].combined.len();
    let audio_variance: f64 = (4..audio_dims)
        .map(|dim| variance(features.iter().map(|f| f.combined[dim])))
        .sum();

    let total = visual_variance + audio_variance;
    let visual_weight = if total > 0.0 {
        (visual_variance / total).clamp(0.3, 0.7)
    } else {
        0.5
    };

    let similarities: Vec<f64> = features
        .windows(2)
        .map(|pair| shot_similarity(&pair[0], &pair[1], 0.5, 0.5))
        .collect();
    let mean = similarities.iter().sum::<f64>() / similarities.len() as f64;
    let std = variance(similarities.iter().copied()).sqrt();
    let threshold = (mean - 0.5 * std).clamp(0.2, 0.5);

    (visual_weight, threshold)
}

fn variance(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

/// Greedy grouping: extend the current cluster while the similarity to its
/// last member stays at or above `1 - threshold`.
fn cluster_greedy(
    features: &[ShotFeatures],
    threshold: f64,
    visual_weight: f64,
    audio_weight: f64,
) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = vec![vec![0]];
    for i in 1..features.len() {
        let last_index = clusters
            .last()
            .and_then(|cluster| cluster.last())
            .copied()
            .expect("non-empty cluster list");
        let similarity =
            shot_similarity(&features[last_index], &features[i], visual_weight, audio_weight);
        if similarity >= 1.0 - threshold {
            clusters
                .last_mut()
                .expect("non-empty cluster list")
                .push(i);
        } else {
            clusters.push(vec![i]);
        }
    }
    clusters
}

/// Agglomerative merging over a precomputed similarity matrix, stopping when
/// the minimum inter-cluster distance exceeds `threshold`.
fn cluster_hierarchical(
    features: &[ShotFeatures],
    threshold: f64,
    linkage: Linkage,
    visual_weight: f64,
    audio_weight: f64,
) -> Vec<Vec<usize>> {
    let n = features.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let similarity =
                shot_similarity(&features[i], &features[j], visual_weight, audio_weight);
            matrix[i][j] = similarity;
            matrix[j][i] = similarity;
        }
        matrix[i][i] = 1.0;
    }

    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    while clusters.len() > 1 {
        let mut best = (f64::INFINITY, 0, 0);
        for i in 0..clusters.len() {
            for j in i + 1..clusters.len() {
                let distance = cluster_distance(&clusters[i], &clusters[j], linkage, &matrix);
                if distance < best.0 {
                    best = (distance, i, j);
                }
            }
        }
        if best.0 > threshold {
            break;
        }
        let merged = clusters.remove(best.2);
        clusters[best.1].extend(merged);
    }
    clusters
}

/// Inter-cluster distance under the chosen linkage rule.
fn cluster_distance(
    a: &[usize],
    b: &[usize],
    linkage: Linkage,
    matrix: &[Vec<f64>],
) -> f64 {
    let distances = a
        .iter()
        .flat_map(|&i| b.iter().map(move |&j| 1.0 - matrix[i][j]));
    match linkage {
        Linkage::Single => distances.fold(f64::INFINITY, f64::min),
        Linkage::Complete => distances.fold(f64::NEG_INFINITY, f64::max),
        Linkage::Average => {
            let all: Vec<f64> = distances.collect();
            all.iter().sum::<f64>() / all.len() as f64
        }
    }
}

/// K-means over the combined feature vector with seeded initialization.
fn cluster_kmeans(features: &[ShotFeatures], threshold: f64, seed: u64) -> Vec<Vec<usize>> {
    let n = features.len();
    let k = ((n as f64 * (1.0 - threshold)).floor() as usize).clamp(1, n);
    if k == n {
        return (0..n).map(|i| vec![i]).collect();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let mut centroids: Vec<Vec<f64>> = indices[..k]
        .iter()
        .map(|&i| features[i].combined.clone())
        .collect();

    let mut assignments = vec![0usize; n];
    for _ in 0..KMEANS_MAX_ITERATIONS {
        for (i, feature) in features.iter().enumerate() {
            assignments[i] = centroids
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    euclidean(&feature.combined, a.1).total_cmp(&euclidean(&feature.combined, b.1))
                })
                .map(|(idx, _)| idx)
                .unwrap_or(0);
        }

        let mut converged = true;
        for (cluster_idx, centroid) in centroids.iter_mut().enumerate() {
            let members: Vec<&ShotFeatures> = features
                .iter()
                .enumerate()
                .filter(|(i, _)| assignments[*i] == cluster_idx)
                .map(|(_, f)| f)
                .collect();
            if members.is_empty() {
                continue;
            }
            let mut updated = vec![0.0; centroid.len()];
            for member in &members {
                for (dim, value) in member.combined.iter().enumerate() {
                    updated[dim] += value;
                }
            }
            for value in updated.iter_mut() {
                *value /= members.len() as f64;
            }
            if euclidean(centroid, &updated) > KMEANS_TOLERANCE {
                converged = false;
            }
            *centroid = updated;
        }
        if converged {
            break;
        }
    }

    let mut clusters: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &assignment) in assignments.iter().enumerate() {
        clusters[assignment].push(i);
    }
    clusters.retain(|cluster| !cluster.is_empty());
    clusters
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Mean intra-cluster pairwise similarity; singletons count as 1.
pub fn clustering_coherence(
    clusters: &[Vec<usize>],
    features: &[ShotFeatures],
    visual_weight: f64,
    audio_weight: f64,
) -> f64 {
    if clusters.is_empty() {
        return 0.0;
    }
    let total: f64 = clusters
        .iter()
        .map(|cluster| {
            if cluster.len() <= 1 {
                return 1.0;
            }
            let mut sum = 0.0;
            let mut pairs = 0usize;
            for (a, &i) in cluster.iter().enumerate() {
                for &j in &cluster[a + 1..] {
                    sum += shot_similarity(&features[i], &features[j], visual_weight, audio_weight);
                    pairs += 1;
                }
            }
            sum / pairs as f64
        })
        .sum();
    total / clusters.len() as f64
}

/// Convert clusters to raw scenes spanning first-to-last member shots.
fn clusters_to_scenes(clusters: &[Vec<usize>], features: &[ShotFeatures]) -> Vec<Scene> {
    let mut scenes: Vec<Scene> = clusters
        .iter()
        .filter(|cluster| !cluster.is_empty())
        .map(|cluster| {
            let mut sorted = cluster.clone();
            sorted.sort_unstable();
            let first = &features[sorted[0]].shot;
            let last = &features[*sorted.last().expect("non-empty cluster")].shot;
            let confidence = sorted
                .iter()
                .map(|&i| features[i].shot.confidence)
                .sum::<f64>()
                / sorted.len() as f64;
            Scene::new(first.start, last.end, confidence, sorted.len())
        })
        .collect();
    scenes.sort_by(|a, b| a.start.total_cmp(&b.start));
    scenes
}

/// Mean visual change magnitude of the shots inside a scene's span.
fn mean_visual_change(
    _clusters: &[Vec<usize>],
    features: &[ShotFeatures],
    scene: &Scene,
) -> f64 {
    let members: Vec<&ShotFeatures> = features
        .iter()
        .filter(|f| f.shot.start >= scene.start && f.shot.end <= scene.end)
        .collect();
    if members.is_empty() {
        return 0.0;
    }
    members.iter().map(|f| f.visual[0]).sum::<f64>() / members.len() as f64
}

/// Window the fusion stage looks at around each boundary, in seconds.
const REFINE_WINDOW: f64 = 2.0;
/// Minimum change magnitude that justifies moving a boundary.
const REFINE_MIN_CHANGE: f64 = 0.3;

/// Nudge each scene boundary onto the strongest audio change within ±2s.
fn refine_boundaries_with_audio(scenes: &mut [Scene], windows: &[AudioWindow]) {
    if windows.is_empty() {
        return;
    }
    for i in 0..scenes.len().saturating_sub(1) {
        let boundary = scenes[i].end;
        let nearby: Vec<&AudioWindow> = windows
            .iter()
            .filter(|w| w.start >= boundary - REFINE_WINDOW && w.end <= boundary + REFINE_WINDOW)
            .collect();
        if nearby.len() < 2 {
            continue;
        }

        let mut best_change = 0.0;
        let mut best_time = boundary;
        for pair in nearby.windows(2) {
            let energy_change = (pair[0].energy.value - pair[1].energy.value).abs();
            let class_change = pair[0]
                .classification
                .difference(&pair[1].classification);
            let change = energy_change + class_change;
            if change > best_change {
                best_change = change;
                best_time = pair[1].start;
            }
        }

        if best_change > REFINE_MIN_CHANGE
            && (best_time - boundary).abs() < REFINE_WINDOW
            && best_time > scenes[i].start
            && best_time < scenes[i + 1].end
        {
            scenes[i].end = best_time;
            scenes[i].duration = scenes[i].end - scenes[i].start;
            scenes[i + 1].start = best_time;
            scenes[i + 1].duration = scenes[i + 1].end - scenes[i + 1].start;
        }
    }
}

/// Classify a scene from its dominant audio class and visual change.
pub fn classify_scene_type(profile: &ShotAudioProfile, visual_change: f64) -> SceneType {
    let classification = &profile.classification;
    match profile.dominant {
        AudioClass::Voice if classification.voice > 0.6 => SceneType::TalkingHead,
        AudioClass::Music if classification.music > 0.6 => SceneType::BRoll,
        AudioClass::Silence if classification.silence > 0.7 => SceneType::Silent,
        _ if classification.voice > 0.4 && classification.music > 0.3 => SceneType::Mixed,
        _ if visual_change > 0.7 => SceneType::Transition,
        _ => SceneType::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliprank_models::{
        Classification, EnergyFeatures, SpectralFeatures, SpeakerChange, VisualCues, MFCC_COUNT,
    };

    fn shot(start: f64, end: f64, confidence: f64) -> Shot {
        Shot {
            start,
            end,
            confidence,
            cues: VisualCues {
                color: confidence,
                composition: confidence * 0.5,
                camera: confidence * 0.25,
            },
        }
    }

    fn silent_window(start: f64) -> AudioWindow {
        AudioWindow {
            start,
            end: start + 0.5,
            energy: EnergyFeatures {
                rms: -55.0,
                peak: -50.0,
                mean_volume: -55.0,
                value: 0.05,
                is_silence: true,
            },
            spectral: SpectralFeatures {
                centroid: 200.0,
                bandwidth: 100.0,
                rolloff: 500.0,
                zcr: 0.01,
                flux: 0.0,
                mfccs: [0.0; MFCC_COUNT],
            },
            classification: Classification {
                voice: 0.05,
                music: 0.05,
                silence: 0.9,
            },
            speaker_change: SpeakerChange::none(),
        }
    }

    fn silent_windows(duration: f64) -> Vec<AudioWindow> {
        let mut windows = Vec::new();
        let mut start = 0.0;
        while start + 0.5 <= duration {
            windows.push(silent_window(start));
            start += 0.5;
        }
        windows
    }

    #[test]
    fn test_uniform_shots_collapse_to_one_scene() {
        // Ten identical shots over silent audio must produce exactly one
        // scene spanning the full duration.
        let shots: Vec<Shot> = (0..10)
            .map(|i| shot(i as f64, (i + 1) as f64, 0.6))
            .collect();
        let windows = silent_windows(10.0);
        let clusterer = ShotClusterer::new(ClusterOptions {
            optimize_coherence: false,
            refine_boundaries: false,
            ..Default::default()
        });
        let analysis = clusterer.cluster(&shots, &windows);

        assert_eq!(analysis.scenes.len(), 1, "scenes: {:?}", analysis.scenes);
        let scene = &analysis.scenes[0];
        assert!(scene.start.abs() < 1e-9);
        assert!((scene.end - 10.0).abs() < 1e-9);
        assert_eq!(scene.shot_count, 10);
        assert!((analysis.statistics.coherence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_shot_yields_single_scene() {
        let shots = vec![shot(0.0, 0.8, 0.4)];
        let analysis = ShotClusterer::default().cluster(&shots, &[]);
        assert_eq!(analysis.scenes.len(), 1);
        assert!((analysis.scenes[0].end - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_identical_shots_have_similarity_one() {
        let shots = vec![shot(0.0, 1.0, 0.6), shot(1.0, 2.0, 0.6)];
        let features = build_shot_features(&shots, &silent_windows(2.0));
        let similarity = shot_similarity(&features[0], &features[1], 0.5, 0.5);
        assert!((similarity - 1.0).abs() < 1e-6, "similarity {similarity}");
    }

    #[test]
    fn test_hierarchical_matches_dissimilar_groups() {
        // Two visually distinct halves; hierarchical clustering should not
        // merge across the divide.
        let mut shots: Vec<Shot> = (0..4).map(|i| shot(i as f64, (i + 1) as f64, 0.2)).collect();
        shots.extend((4..8).map(|i| {
            let mut s = shot(i as f64, (i + 1) as f64, 0.9);
            s.cues.color = 0.0;
            s.cues.composition = 0.9;
            s.cues.camera = 0.9;
            s
        }));
        let windows = silent_windows(8.0);
        let clusterer = ShotClusterer::new(ClusterOptions {
            method: ClusterMethod::Hierarchical,
            similarity_threshold: Some(0.2),
            optimize_coherence: false,
            refine_boundaries: false,
            ..Default::default()
        });
        let analysis = clusterer.cluster(&shots, &windows);
        assert!(analysis.scenes.len() >= 2);
    }

    #[test]
    fn test_kmeans_is_deterministic_for_fixed_seed() {
        let shots: Vec<Shot> = (0..12)
            .map(|i| shot(i as f64, (i + 1) as f64, 0.1 + 0.07 * i as f64))
            .collect();
        let windows = silent_windows(12.0);
        let options = ClusterOptions {
            method: ClusterMethod::Kmeans,
            similarity_threshold: Some(0.5),
            optimize_coherence: false,
            refine_boundaries: false,
            kmeans_seed: 7,
            ..Default::default()
        };
        let a = ShotClusterer::new(options.clone()).cluster(&shots, &windows);
        let b = ShotClusterer::new(options).cluster(&shots, &windows);
        let spans_a: Vec<(f64, f64)> = a.scenes.iter().map(|s| (s.start, s.end)).collect();
        let spans_b: Vec<(f64, f64)> = b.scenes.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans_a, spans_b);
    }

    #[test]
    fn test_auto_tuned_weights_clamped() {
        let shots: Vec<Shot> = (0..6)
            .map(|i| shot(i as f64, (i + 1) as f64, (i % 2) as f64))
            .collect();
        let features = build_shot_features(&shots, &silent_windows(6.0));
        let (visual_weight, threshold) = auto_tune_parameters(&features);
        assert!((0.3..=0.7).contains(&visual_weight));
        assert!((0.2..=0.5).contains(&threshold));
    }

    #[test]
    fn test_scene_type_rules() {
        let mut profile = ShotAudioProfile::neutral();
        profile.classification = Classification {
            voice: 0.8,
            music: 0.1,
            silence: 0.1,
        };
        profile.dominant = AudioClass::Voice;
        assert_eq!(classify_scene_type(&profile, 0.2), SceneType::TalkingHead);

        profile.classification = Classification {
            voice: 0.1,
            music: 0.8,
            silence: 0.1,
        };
        profile.dominant = AudioClass::Music;
        assert_eq!(classify_scene_type(&profile, 0.2), SceneType::BRoll);

        profile.classification = Classification {
            voice: 0.05,
            music: 0.05,
            silence: 0.9,
        };
        profile.dominant = AudioClass::Silence;
        assert_eq!(classify_scene_type(&profile, 0.2), SceneType::Silent);

        profile.classification = Classification {
            voice: 0.45,
            music: 0.35,
            silence: 0.2,
        };
        profile.dominant = AudioClass::Voice;
        assert_eq!(classify_scene_type(&profile, 0.2), SceneType::Mixed);

        profile.classification = Classification::neutral();
        profile.dominant = AudioClass::Silence;
        assert_eq!(classify_scene_type(&profile, 0.9), SceneType::Transition);
        assert_eq!(classify_scene_type(&profile, 0.1), SceneType::General);
    }
}
