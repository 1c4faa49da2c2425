//! Scene post-processing and quality ranking.
//!
//! Enforces min/max scene length (merge-short into the shorter neighbor,
//! split-long into equal sub-spans), then scores finished scenes on metadata
//! richness, duration fit, detection confidence, audio cleanliness, and
//! visual cleanliness, and ranks them best-first.

use tracing::debug;

use cliprank_audio::ShotAudioProfile;
use cliprank_models::{
    LengthConstraints, QualityFactors, QualityGrade, Scene, SceneQuality, SceneType,
};

/// Quality factor weights: metadata, duration fit, detection confidence,
/// audio cleanliness, visual cleanliness.
const QUALITY_WEIGHTS: [f64; 5] = [0.3, 0.2, 0.2, 0.15, 0.15];

/// Enforce scene length constraints.
///
/// Scenes shorter than the minimum merge into their shorter-duration
/// neighbor (balancing scene lengths); scenes over the maximum split into
/// equal sub-spans. A single scene spanning the whole clip is left alone even
/// when shorter than the minimum, so degenerate inputs still yield one scene.
pub fn enforce_length_constraints(
    scenes: Vec<Scene>,
    constraints: &LengthConstraints,
) -> Vec<Scene> {
    let mut scenes = scenes;

    // Merge passes run until stable: merging two short scenes can still
    // leave a short result.
    loop {
        let before = scenes.len();
        scenes = merge_short_scenes(scenes, constraints.min_length);
        if scenes.len() == before {
            break;
        }
    }

    if let Some(max) = constraints.max_length {
        scenes = split_long_scenes(scenes, max);
    }

    scenes
}

fn merge_short_scenes(scenes: Vec<Scene>, min_length: f64) -> Vec<Scene> {
    if scenes.len() <= 1 {
        return scenes;
    }

    let mut source = scenes;
    let mut merged: Vec<Scene> = Vec::with_capacity(source.len());
    let mut i = 0;
    while i < source.len() {
        let scene = source[i].clone();
        if scene.duration >= min_length {
            merged.push(scene);
            i += 1;
            continue;
        }

        let prev_duration = merged.last().map(|s| s.duration);
        let next_duration = source.get(i + 1).map(|s| s.duration);
        match (prev_duration, next_duration) {
            (Some(prev), Some(next)) if prev <= next => merge_into_previous(&mut merged, &scene),
            (Some(_), Some(_)) | (None, Some(_)) => merge_into_next(&mut source, i, &scene),
            (Some(_), None) => merge_into_previous(&mut merged, &scene),
            (None, None) => merged.push(scene),
        }
        i += 1;
    }
    merged
}

fn merge_into_previous(merged: &mut [Scene], scene: &Scene) {
    let last = merged.last_mut().expect("previous scene exists");
    last.end = scene.end;
    last.duration = last.end - last.start;
    last.shot_count += scene.shot_count;
    last.confidence = last.confidence.max(scene.confidence);
}

fn merge_into_next(source: &mut [Scene], index: usize, scene: &Scene) {
    let next = &mut source[index + 1];
    next.start = scene.start;
    next.duration = next.end - next.start;
    next.shot_count += scene.shot_count;
    next.confidence = next.confidence.max(scene.confidence);
}

fn split_long_scenes(scenes: Vec<Scene>, max_length: f64) -> Vec<Scene> {
    let mut split = Vec::with_capacity(scenes.len());
    for scene in scenes {
        if scene.duration <= max_length {
            split.push(scene);
            continue;
        }

        let pieces = (scene.duration / max_length).ceil() as usize;
        let piece_duration = scene.duration / pieces as f64;
        let shots_per_piece = (scene.shot_count / pieces).max(1);
        for piece in 0..pieces {
            let start = scene.start + piece as f64 * piece_duration;
            let mut part = Scene::new(start, start + piece_duration, scene.confidence, shots_per_piece);
            part.scene_type = scene.scene_type;
            split.push(part);
        }
    }
    split
}

/// Quality scorer for finished scenes.
pub struct QualityScorer {
    constraints: LengthConstraints,
}

impl QualityScorer {
    pub fn new(constraints: LengthConstraints) -> Self {
        Self { constraints }
    }

    /// Score one scene. `visual_change` is the mean shot-transition magnitude
    /// inside the scene (steadier footage scores cleaner).
    pub fn score(&self, scene: &Scene, audio: &ShotAudioProfile, visual_change: f64) -> SceneQuality {
        let factors = QualityFactors {
            metadata: metadata_richness(scene),
            duration_fit: self.duration_fit(scene.duration),
            detection_confidence: scene.confidence.clamp(0.0, 1.0),
            audio_cleanliness: audio_cleanliness(audio),
            visual_cleanliness: (1.0 - 0.5 * visual_change.min(1.0)).max(0.0),
        };

        let overall = factors.metadata * QUALITY_WEIGHTS[0]
            + factors.duration_fit * QUALITY_WEIGHTS[1]
            + factors.detection_confidence * QUALITY_WEIGHTS[2]
            + factors.audio_cleanliness * QUALITY_WEIGHTS[3]
            + factors.visual_cleanliness * QUALITY_WEIGHTS[4];

        SceneQuality {
            overall: overall.clamp(0.0, 1.0),
            factors,
            grade: QualityGrade::from_score(overall),
        }
    }

    /// Duration fit: a Gaussian-like falloff around the workflow's preferred
    /// length, or the fixed "prefer 5-60s" curve when no preference exists.
    fn duration_fit(&self, duration: f64) -> f64 {
        match self.constraints.preferred_length {
            Some(preferred) => {
                let sigma = preferred / 2.0;
                let delta = duration - preferred;
                (-(delta * delta) / (2.0 * sigma * sigma)).exp()
            }
            None => {
                if (5.0..=60.0).contains(&duration) {
                    1.0
                } else if duration < 5.0 {
                    (duration / 5.0).max(0.0)
                } else {
                    (60.0 / duration).max(0.2)
                }
            }
        }
    }
}

/// Richer metadata (a concrete type, multiple shots) scores higher.
fn metadata_richness(scene: &Scene) -> f64 {
    let mut score = 0.4;
    if scene.scene_type != SceneType::General {
        score += 0.3;
    }
    if scene.shot_count > 1 {
        score += 0.3;
    }
    score
}

/// Dominant-class certainty, discounted by in-scene silence.
fn audio_cleanliness(audio: &ShotAudioProfile) -> f64 {
    let class_certainty = audio.classification.confidence();
    (class_certainty * (1.0 - 0.5 * audio.silence_ratio)).clamp(0.0, 1.0)
}

/// Sort scenes best-first by overall quality (ties break on start time).
pub fn rank_scenes(scenes: &mut [Scene]) {
    scenes.sort_by(|a, b| {
        b.quality_score()
            .total_cmp(&a.quality_score())
            .then(a.start.total_cmp(&b.start))
    });
    debug!(scenes = scenes.len(), "Ranked scenes by quality");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(min: f64, max: Option<f64>, preferred: Option<f64>) -> LengthConstraints {
        LengthConstraints {
            min_length: min,
            max_length: max,
            preferred_length: preferred,
        }
    }

    fn scene(start: f64, end: f64) -> Scene {
        Scene::new(start, end, 0.7, 1)
    }

    #[test]
    fn test_short_scene_merges_into_shorter_neighbor() {
        let scenes = vec![scene(0.0, 8.0), scene(8.0, 9.0), scene(9.0, 12.0)];
        let result = enforce_length_constraints(scenes, &constraints(2.0, None, None));
        assert_eq!(result.len(), 2);
        // The 1s scene merges into the 3s follower, not the 8s leader.
        assert!((result[0].end - 8.0).abs() < 1e-9);
        assert!((result[1].start - 8.0).abs() < 1e-9);
        assert!((result[1].duration - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_short_scene_is_preserved() {
        let scenes = vec![scene(0.0, 0.8)];
        let result = enforce_length_constraints(scenes, &constraints(2.0, None, None));
        assert_eq!(result.len(), 1);
        assert!((result[0].duration - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_long_scene_split_into_equal_parts() {
        let scenes = vec![scene(0.0, 90.0)];
        let result = enforce_length_constraints(scenes, &constraints(2.0, Some(60.0), None));
        assert_eq!(result.len(), 2);
        assert!((result[0].duration - 45.0).abs() < 1e-9);
        assert!((result[1].duration - 45.0).abs() < 1e-9);
        assert!((result[1].end - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_scenes_respect_min_after_merging() {
        let scenes = vec![
            scene(0.0, 1.0),
            scene(1.0, 1.5),
            scene(1.5, 6.0),
            scene(6.0, 7.0),
            scene(7.0, 20.0),
        ];
        let result = enforce_length_constraints(scenes, &constraints(2.0, None, None));
        assert!(result.len() > 1);
        for s in &result {
            assert!(s.duration >= 2.0, "scene {s:?} under minimum");
        }
    }

    #[test]
    fn test_duration_fit_fixed_curve() {
        let scorer = QualityScorer::new(constraints(1.0, None, None));
        assert!((scorer.duration_fit(30.0) - 1.0).abs() < 1e-9);
        assert!((scorer.duration_fit(2.5) - 0.5).abs() < 1e-9);
        assert!(scorer.duration_fit(120.0) < 1.0);
        assert!(scorer.duration_fit(1000.0) >= 0.2);
    }

    #[test]
    fn test_duration_fit_prefers_workflow_length() {
        let scorer = QualityScorer::new(constraints(1.0, Some(60.0), Some(15.0)));
        let at_preferred = scorer.duration_fit(15.0);
        let off_preferred = scorer.duration_fit(45.0);
        assert!((at_preferred - 1.0).abs() < 1e-9);
        assert!(off_preferred < at_preferred);
    }

    #[test]
    fn test_scoring_and_grading() {
        let scorer = QualityScorer::new(constraints(1.0, None, None));
        let mut s = scene(0.0, 30.0);
        s.scene_type = SceneType::TalkingHead;
        s.shot_count = 4;
        s.confidence = 0.9;
        let mut profile = ShotAudioProfile::neutral();
        profile.classification = cliprank_models::Classification {
            voice: 0.85,
            music: 0.1,
            silence: 0.05,
        };
        profile.silence_ratio = 0.0;

        let quality = scorer.score(&s, &profile, 0.2);
        assert!(quality.overall > 0.8, "overall {}", quality.overall);
        assert_eq!(quality.grade, QualityGrade::A);
        assert!((quality.factors.metadata - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ranking_orders_by_quality() {
        let scorer = QualityScorer::new(constraints(1.0, None, None));
        let profile = ShotAudioProfile::neutral();

        let mut good = scene(0.0, 30.0);
        good.scene_type = SceneType::TalkingHead;
        good.shot_count = 3;
        good.quality = Some(scorer.score(&good, &profile, 0.1));

        let mut poor = scene(30.0, 32.0);
        poor.confidence = 0.3;
        poor.quality = Some(scorer.score(&poor, &profile, 0.9));

        let mut scenes = vec![poor.clone(), good.clone()];
        rank_scenes(&mut scenes);
        assert!((scenes[0].start - good.start).abs() < 1e-9);
    }
}
