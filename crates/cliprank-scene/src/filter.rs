//! Audio-criteria scene filtering.
//!
//! Callers preparing clips often want only scenes with speech, enough
//! energy, or little silence. Filtering works over each scene's aggregated
//! audio profile and never mutates the scenes themselves.

use serde::{Deserialize, Serialize};

use cliprank_audio::ShotAudioProfile;
use cliprank_models::Scene;

/// Tags derived from a scene's audio profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioTag {
    Speech,
    Music,
    Silence,
    HighEnergy,
    LowEnergy,
}

/// Criteria for selecting scenes by audio characteristics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioCriteria {
    /// Require voice content above `min_speech_confidence`.
    pub require_speech: bool,
    pub min_speech_confidence: f64,
    /// Require mean energy above `min_energy`.
    pub require_high_energy: bool,
    pub min_energy: f64,
    /// Reject scenes whose silent-window fraction exceeds the cap.
    pub skip_silence: bool,
    pub max_silence_ratio: f64,
    /// Reject scenes with no dominant class or near-zero energy.
    pub skip_noise: bool,
    /// Tags that must all be present.
    pub required_tags: Vec<AudioTag>,
    /// Tags that must all be absent.
    pub excluded_tags: Vec<AudioTag>,
}

impl AudioCriteria {
    /// Criteria tuned for speech-driven clips.
    pub fn speech_only() -> Self {
        Self {
            require_speech: true,
            min_speech_confidence: 0.5,
            skip_silence: true,
            max_silence_ratio: 0.3,
            skip_noise: true,
            ..Default::default()
        }
    }
}

/// Extract audio tags from a scene profile.
pub fn extract_tags(profile: &ShotAudioProfile) -> Vec<AudioTag> {
    let mut tags = Vec::new();
    let classification = &profile.classification;
    if classification.voice > 0.5 {
        tags.push(AudioTag::Speech);
    }
    if classification.music > 0.5 {
        tags.push(AudioTag::Music);
    }
    if classification.silence > 0.5 || profile.silence_ratio > 0.5 {
        tags.push(AudioTag::Silence);
    }
    if profile.energy > 0.7 {
        tags.push(AudioTag::HighEnergy);
    }
    if profile.energy < 0.3 {
        tags.push(AudioTag::LowEnergy);
    }
    tags
}

/// True when the profile looks like noise: near-zero energy or no dominant
/// class.
pub fn is_noise(profile: &ShotAudioProfile) -> bool {
    if profile.energy < 0.1 {
        return true;
    }
    profile.classification.confidence() < 0.5
}

/// Filter scenes by audio criteria. `profiles` must parallel `scenes`.
pub fn filter_scenes(
    scenes: &[Scene],
    profiles: &[ShotAudioProfile],
    criteria: &AudioCriteria,
) -> Vec<Scene> {
    scenes
        .iter()
        .zip(profiles.iter())
        .filter(|(_, profile)| matches_criteria(profile, criteria))
        .map(|(scene, _)| scene.clone())
        .collect()
}

fn matches_criteria(profile: &ShotAudioProfile, criteria: &AudioCriteria) -> bool {
    if criteria.require_speech {
        let threshold = if criteria.min_speech_confidence > 0.0 {
            criteria.min_speech_confidence
        } else {
            0.5
        };
        if profile.classification.voice <= threshold {
            return false;
        }
    }

    if criteria.require_high_energy {
        let threshold = if criteria.min_energy > 0.0 {
            criteria.min_energy
        } else {
            0.6
        };
        if profile.energy < threshold {
            return false;
        }
    }

    if criteria.skip_silence {
        let cap = if criteria.max_silence_ratio > 0.0 {
            criteria.max_silence_ratio
        } else {
            0.3
        };
        if profile.silence_ratio > cap {
            return false;
        }
    }

    if criteria.skip_noise && is_noise(profile) {
        return false;
    }

    let tags = extract_tags(profile);
    if !criteria.required_tags.iter().all(|tag| tags.contains(tag)) {
        return false;
    }
    if criteria.excluded_tags.iter().any(|tag| tags.contains(tag)) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliprank_models::Classification;

    fn speech_profile() -> ShotAudioProfile {
        let mut profile = ShotAudioProfile::neutral();
        profile.energy = 0.6;
        profile.classification = Classification {
            voice: 0.8,
            music: 0.1,
            silence: 0.1,
        };
        profile.silence_ratio = 0.05;
        profile
    }

    fn silent_profile() -> ShotAudioProfile {
        let mut profile = ShotAudioProfile::neutral();
        profile.energy = 0.05;
        profile.classification = Classification {
            voice: 0.05,
            music: 0.05,
            silence: 0.9,
        };
        profile.silence_ratio = 0.9;
        profile
    }

    fn scenes(count: usize) -> Vec<Scene> {
        (0..count)
            .map(|i| Scene::new(i as f64 * 10.0, (i + 1) as f64 * 10.0, 0.7, 2))
            .collect()
    }

    #[test]
    fn test_speech_only_keeps_speech_scenes() {
        let profiles = vec![speech_profile(), silent_profile()];
        let filtered = filter_scenes(&scenes(2), &profiles, &AudioCriteria::speech_only());
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].start.abs() < 1e-9);
    }

    #[test]
    fn test_tags_extracted_from_profile() {
        let tags = extract_tags(&speech_profile());
        assert!(tags.contains(&AudioTag::Speech));
        assert!(!tags.contains(&AudioTag::Silence));

        let tags = extract_tags(&silent_profile());
        assert!(tags.contains(&AudioTag::Silence));
        assert!(tags.contains(&AudioTag::LowEnergy));
    }

    #[test]
    fn test_noise_detection() {
        let mut noisy = ShotAudioProfile::neutral();
        noisy.energy = 0.5;
        noisy.classification = Classification {
            voice: 0.34,
            music: 0.33,
            silence: 0.33,
        };
        assert!(is_noise(&noisy));
        assert!(!is_noise(&speech_profile()));
        assert!(is_noise(&silent_profile()));
    }

    #[test]
    fn test_excluded_tags_reject() {
        let criteria = AudioCriteria {
            excluded_tags: vec![AudioTag::Silence],
            ..Default::default()
        };
        let profiles = vec![speech_profile(), silent_profile()];
        let filtered = filter_scenes(&scenes(2), &profiles, &criteria);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_default_criteria_keep_everything() {
        let profiles = vec![speech_profile(), silent_profile()];
        let filtered = filter_scenes(&scenes(2), &profiles, &AudioCriteria::default());
        assert_eq!(filtered.len(), 2);
    }
}
