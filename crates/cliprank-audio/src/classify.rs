//! Voice/music/silence classification and speaker-change detection.
//!
//! The default classifier is hand-written rule logic behind the
//! [`AudioClassifier`] trait so a trained model can be substituted later
//! without changing the pipeline contract.

use cliprank_models::{Classification, EnergyFeatures, SpectralFeatures, SpeakerChange};

/// Pluggable voice/music/silence scorer.
pub trait AudioClassifier: Send + Sync {
    /// Classify one window's features. Implementations must return scores
    /// that sum to 1 (use [`Classification::normalized`]).
    fn classify(&self, energy: &EnergyFeatures, spectral: &SpectralFeatures) -> Classification;
}

/// Default rule-based classifier.
///
/// Scores each class from ZCR, centroid, bandwidth, energy range, and MFCC
/// shape, then normalizes. The per-rule increments are tuned heuristics, not
/// protocol invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl AudioClassifier for RuleBasedClassifier {
    fn classify(&self, energy: &EnergyFeatures, spectral: &SpectralFeatures) -> Classification {
        let derived = DerivedFeatures::from(spectral);
        Classification {
            voice: voice_score(energy, spectral, &derived),
            music: music_score(energy, spectral, &derived),
            silence: silence_score(energy, spectral),
        }
        .normalized()
    }
}

/// Features derived from the raw spectral descriptors.
struct DerivedFeatures {
    /// Bandwidth relative to centroid.
    spectral_spread: f64,
    /// MFCC-shape proxy for harmonic structure.
    harmonicity: f64,
}

impl From<&SpectralFeatures> for DerivedFeatures {
    fn from(spectral: &SpectralFeatures) -> Self {
        let spectral_spread = spectral.bandwidth / (spectral.centroid + 1.0);
        let mfcc_variance = variance(&spectral.mfccs[..5]);
        let harmonicity = (1.0 - mfcc_variance / 10.0).max(0.0);
        Self {
            spectral_spread,
            harmonicity,
        }
    }
}

/// Voice: mid-range ZCR and centroid, moderate energy, structured MFCCs.
fn voice_score(
    energy: &EnergyFeatures,
    spectral: &SpectralFeatures,
    derived: &DerivedFeatures,
) -> f64 {
    let mut score = 0.0;

    if spectral.zcr > 0.05 && spectral.zcr < 0.15 {
        score += 0.3;
    } else if spectral.zcr > 0.03 && spectral.zcr < 0.2 {
        score += 0.15;
    }

    if spectral.centroid > 1000.0 && spectral.centroid < 4000.0 {
        score += 0.3;
    } else if spectral.centroid > 500.0 && spectral.centroid < 5000.0 {
        score += 0.15;
    }

    if energy.value > 0.3 && energy.value < 0.8 {
        score += 0.2;
    }

    if spectral.mfccs[0] > -5.0 && spectral.mfccs[0] < 5.0 {
        score += 0.1;
    }

    if derived.harmonicity > 0.3 {
        score += 0.1;
    }

    score
}

/// Music: low ZCR, wide bandwidth and spread, consistent energy.
fn music_score(
    energy: &EnergyFeatures,
    spectral: &SpectralFeatures,
    derived: &DerivedFeatures,
) -> f64 {
    let mut score = 0.0;

    if spectral.zcr < 0.05 {
        score += 0.3;
    } else if spectral.zcr < 0.08 {
        score += 0.15;
    }

    if spectral.centroid > 500.0 {
        score += 0.2;
    }

    if spectral.bandwidth > 1000.0 {
        score += 0.2;
    }

    // Sustained content keeps flux low relative to its energy.
    if spectral.flux < energy.value * 10.0 + 1.0 {
        score += 0.15;
    }

    if derived.spectral_spread > 0.5 {
        score += 0.15;
    }

    score
}

/// Silence: very low energy and spectral content.
fn silence_score(energy: &EnergyFeatures, spectral: &SpectralFeatures) -> f64 {
    let mut score = 0.0;

    if energy.value < 0.1 {
        score += 0.5;
    } else if energy.value < 0.2 {
        score += 0.25;
    }

    if energy.rms < -40.0 {
        score += 0.3;
    }

    if spectral.centroid < 500.0 {
        score += 0.2;
    }

    score
}

/// Normalizer for the MFCC Euclidean distance term.
const MFCC_DISTANCE_SCALE: f64 = 5.0;
/// Normalizer for the centroid/bandwidth distance term, in Hz.
const SPECTRAL_DISTANCE_SCALE: f64 = 2000.0;
/// Normalizer for the energy delta term.
const ENERGY_DELTA_SCALE: f64 = 0.5;

const MFCC_WEIGHT: f64 = 0.5;
const SPECTRAL_WEIGHT: f64 = 0.3;
const ENERGY_WEIGHT: f64 = 0.2;

/// Speaker-change probability versus the immediately preceding window.
///
/// Combines MFCC Euclidean distance, centroid/bandwidth distance, and energy
/// delta with weights 0.5/0.3/0.2; `has_change` fires above 0.5.
pub fn detect_speaker_change(
    current_energy: &EnergyFeatures,
    current_spectral: &SpectralFeatures,
    previous: Option<(&EnergyFeatures, &SpectralFeatures)>,
) -> SpeakerChange {
    let Some((prev_energy, prev_spectral)) = previous else {
        return SpeakerChange::none();
    };

    let mfcc_distance: f64 = current_spectral
        .mfccs
        .iter()
        .zip(prev_spectral.mfccs.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();

    let centroid_diff = current_spectral.centroid - prev_spectral.centroid;
    let bandwidth_diff = current_spectral.bandwidth - prev_spectral.bandwidth;
    let spectral_distance = (centroid_diff * centroid_diff + bandwidth_diff * bandwidth_diff).sqrt();

    let energy_delta = (current_energy.value - prev_energy.value).abs();

    let mfcc_score = (mfcc_distance / MFCC_DISTANCE_SCALE).min(1.0);
    let spectral_score = (spectral_distance / SPECTRAL_DISTANCE_SCALE).min(1.0);
    let energy_score = (energy_delta / ENERGY_DELTA_SCALE).min(1.0);

    let probability = (mfcc_score * MFCC_WEIGHT
        + spectral_score * SPECTRAL_WEIGHT
        + energy_score * ENERGY_WEIGHT)
        .min(1.0);

    SpeakerChange {
        has_change: probability > 0.5,
        probability,
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}
