//! Scene boundary, scene, and quality models.

use serde::{Deserialize, Serialize};

/// Signal source that contributed to a scene boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    Visual,
    Audio,
    Transcript,
}

/// A fused scene boundary.
///
/// Boundary sequences are strictly increasing in time; consecutive pairs
/// define scene spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneBoundary {
    /// Boundary time in seconds.
    pub timestamp: f64,
    /// Calibrated confidence in `[0, 1]`.
    pub confidence: f64,
    /// Sources that contributed to this boundary.
    pub sources: Vec<BoundarySource>,
    /// Visual change magnitude at the boundary.
    pub visual_change: f64,
    /// Audio feature distance across the boundary.
    pub audio_distance: f64,
    /// Audio classification change magnitude across the boundary.
    pub audio_class_change: f64,
    /// Rule-model score in `[0, 1]`.
    pub score: f64,
    /// Whether the boundary agreed with its temporal neighborhood.
    pub temporally_consistent: bool,
}

impl SceneBoundary {
    /// Whether both the visual and audio modalities contributed.
    pub fn is_multi_source(&self) -> bool {
        self.sources.contains(&BoundarySource::Visual)
            && self.sources.contains(&BoundarySource::Audio)
    }
}

/// Content type assigned to a finished scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    TalkingHead,
    BRoll,
    Silent,
    Mixed,
    Transition,
    General,
}

impl Default for SceneType {
    fn default() -> Self {
        SceneType::General
    }
}

/// Letter grade bands for scene quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
    F,
}

impl QualityGrade {
    /// Map an overall score to its grade band.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            QualityGrade::A
        } else if score >= 0.7 {
            QualityGrade::B
        } else if score >= 0.6 {
            QualityGrade::C
        } else if score >= 0.5 {
            QualityGrade::D
        } else {
            QualityGrade::F
        }
    }
}

/// Per-factor quality sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFactors {
    /// Richness of detection metadata (sources, cues, typing).
    pub metadata: f64,
    /// How well the duration fits the target workflow.
    pub duration_fit: f64,
    /// Detection confidence carried from the boundary/cluster stage.
    pub detection_confidence: f64,
    /// Audio cleanliness (dominant class, low silence ratio).
    pub audio_cleanliness: f64,
    /// Visual cleanliness (stable composition, moderate change).
    pub visual_cleanliness: f64,
}

/// Weighted quality score for a finished scene.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneQuality {
    /// Weighted overall score in `[0, 1]`.
    pub overall: f64,
    pub factors: QualityFactors,
    pub grade: QualityGrade,
}

/// A final, length-constrained scene returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Scene start time in seconds.
    pub start: f64,
    /// Scene end time in seconds.
    pub end: f64,
    /// Scene duration in seconds; the post-processor guarantees it respects
    /// the configured minimum and (when set) maximum.
    pub duration: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    /// Number of shots merged into this scene.
    pub shot_count: usize,
    #[serde(default)]
    pub scene_type: SceneType,
    /// Quality score, populated by the ranking stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<SceneQuality>,
}

impl Scene {
    /// Create a scene span with recomputed duration.
    pub fn new(start: f64, end: f64, confidence: f64, shot_count: usize) -> Self {
        Self {
            start,
            end,
            duration: end - start,
            confidence,
            shot_count,
            scene_type: SceneType::General,
            quality: None,
        }
    }

    /// Overall quality score, or the detection confidence when unscored.
    pub fn quality_score(&self) -> f64 {
        self.quality.map(|q| q.overall).unwrap_or(self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_bands() {
        assert_eq!(QualityGrade::from_score(0.85), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(0.8), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(0.74), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(0.61), QualityGrade::C);
        assert_eq!(QualityGrade::from_score(0.5), QualityGrade::D);
        assert_eq!(QualityGrade::from_score(0.49), QualityGrade::F);
    }

    #[test]
    fn test_multi_source_boundary() {
        let boundary = SceneBoundary {
            timestamp: 5.0,
            confidence: 0.8,
            sources: vec![BoundarySource::Visual, BoundarySource::Audio],
            visual_change: 0.7,
            audio_distance: 0.4,
            audio_class_change: 0.0,
            score: 0.6,
            temporally_consistent: true,
        };
        assert!(boundary.is_multi_source());
    }

    #[test]
    fn test_scene_duration() {
        let scene = Scene::new(2.0, 9.5, 0.8, 3);
        assert!((scene.duration - 7.5).abs() < 1e-9);
        assert!((scene.quality_score() - 0.8).abs() < 1e-9);
    }
}
