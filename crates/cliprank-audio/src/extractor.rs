//! Audio feature extraction over windowed PCM.
//!
//! Per-window features (energy, spectrum, classification) are independent and
//! computed across a rayon pool. Spectral flux and speaker-change detection
//! need the previous window's results, so they run as an ordered second pass.
//!
//! A window whose computation fails is replaced by the neutral default window
//! and logged; only a completely empty signal is fatal.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use cliprank_models::{
    AudioClass, AudioWindow, Classification, EnergyFeatures, PipelineConfig, SpectralFeatures,
    MFCC_COUNT,
};

use crate::classify::{detect_speaker_change, AudioClassifier, RuleBasedClassifier};
use crate::error::{AudioError, AudioResult};
use crate::mel;
use crate::spectrum::{
    self, magnitude_spectrum, spectral_bandwidth, spectral_centroid, spectral_rolloff, Spectrum,
};

/// Windows shorter than this are dropped at the tail of the signal.
const MIN_WINDOW_SECONDS: f64 = 0.1;

/// Rolloff energy percentile.
const ROLLOFF_PERCENTILE: f64 = 0.85;

/// Windowed audio feature extractor.
pub struct AudioFeatureExtractor {
    window_size: f64,
    hop_size: f64,
    sample_rate: u32,
    classifier: Arc<dyn AudioClassifier>,
}

impl AudioFeatureExtractor {
    /// Create an extractor with the default rule-based classifier.
    pub fn new(window_size: f64, hop_size: f64, sample_rate: u32) -> Self {
        Self {
            window_size,
            hop_size,
            sample_rate,
            classifier: Arc::new(RuleBasedClassifier),
        }
    }

    /// Create an extractor from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.window_size, config.hop_size, config.sample_rate)
    }

    /// Substitute a custom classifier implementation.
    pub fn with_classifier(mut self, classifier: Arc<dyn AudioClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Extract the full window sequence from mono PCM samples.
    ///
    /// The sequence covers `[0, duration)` with overlap determined by
    /// `hop_size < window_size`. Returns [`AudioError::NoSignal`] when the
    /// input is empty or too short for a single window.
    pub fn extract(&self, samples: &[f32]) -> AudioResult<Vec<AudioWindow>> {
        if samples.is_empty() {
            return Err(AudioError::NoSignal);
        }

        let duration = samples.len() as f64 / self.sample_rate as f64;
        let spans = self.window_spans(duration);
        if spans.is_empty() {
            return Err(AudioError::NoSignal);
        }

        debug!(
            windows = spans.len(),
            duration_s = duration,
            window_size = self.window_size,
            hop_size = self.hop_size,
            "Extracting audio feature windows"
        );

        // Parallel batch: everything that only needs this window's samples.
        let staged: Vec<StagedWindow> = spans
            .par_iter()
            .map(|&(start, end)| self.analyze_span(samples, start, end))
            .collect();

        // Ordered pass: flux and speaker change depend on the previous window.
        let mut windows = Vec::with_capacity(staged.len());
        let mut previous: Option<(EnergyFeatures, SpectralFeatures, Spectrum)> = None;

        for stage in staged {
            let window = match stage.analysis {
                Ok(analysis) => {
                    let flux = spectrum::spectral_flux(
                        previous.as_ref().map(|(_, _, spectrum)| spectrum),
                        &analysis.spectrum,
                    );
                    let spectral = SpectralFeatures {
                        flux,
                        ..analysis.spectral
                    };
                    let classification = self.classifier.classify(&analysis.energy, &spectral);
                    let speaker_change = detect_speaker_change(
                        &analysis.energy,
                        &spectral,
                        previous
                            .as_ref()
                            .map(|(energy, spectral, _)| (energy, spectral)),
                    );
                    previous = Some((analysis.energy, spectral.clone(), analysis.spectrum));
                    AudioWindow {
                        start: stage.start,
                        end: stage.end,
                        energy: analysis.energy,
                        spectral,
                        classification,
                        speaker_change,
                    }
                }
                Err(reason) => {
                    warn!(
                        start = stage.start,
                        end = stage.end,
                        reason = %reason,
                        "Window feature extraction failed, substituting neutral defaults"
                    );
                    let neutral = AudioWindow::neutral(stage.start, stage.end);
                    previous = Some((
                        neutral.energy,
                        neutral.spectral.clone(),
                        magnitude_spectrum(&[0.0], self.sample_rate),
                    ));
                    neutral
                }
            };
            windows.push(window);
        }

        Ok(windows)
    }

    /// Window start/end times covering `[0, duration)`.
    fn window_spans(&self, duration: f64) -> Vec<(f64, f64)> {
        let mut spans = Vec::new();
        let mut start = 0.0;
        while start < duration {
            let end = (start + self.window_size).min(duration);
            if end - start < MIN_WINDOW_SECONDS {
                break;
            }
            spans.push((start, end));
            start += self.hop_size;
        }
        spans
    }

    fn analyze_span(&self, samples: &[f32], start: f64, end: f64) -> StagedWindow {
        let start_idx = (start * self.sample_rate as f64) as usize;
        let end_idx = ((end * self.sample_rate as f64) as usize).min(samples.len());
        let analysis = self.analyze_samples(&samples[start_idx..end_idx], start);
        StagedWindow {
            start,
            end,
            analysis,
        }
    }

    fn analyze_samples(&self, slice: &[f32], start: f64) -> Result<WindowAnalysis, AudioError> {
        if slice.is_empty() {
            return Err(AudioError::window_extraction(start, "empty sample slice"));
        }
        if slice.iter().any(|s| !s.is_finite()) {
            return Err(AudioError::window_extraction(
                start,
                "non-finite sample values",
            ));
        }

        let samples: Vec<f64> = slice.iter().map(|&s| s as f64).collect();
        let energy = energy_features(&samples);

        let spectrum = magnitude_spectrum(&samples, self.sample_rate);
        let centroid = spectral_centroid(&spectrum);
        let spectral = SpectralFeatures {
            centroid,
            bandwidth: spectral_bandwidth(&spectrum, centroid),
            rolloff: spectral_rolloff(&spectrum, ROLLOFF_PERCENTILE),
            zcr: spectrum::zero_crossing_rate(&samples),
            // Filled in by the ordered pass once the previous spectrum is known.
            flux: 0.0,
            mfccs: mel::mfccs(&spectrum, self.sample_rate),
        };

        Ok(WindowAnalysis {
            energy,
            spectral,
            spectrum,
        })
    }
}

struct StagedWindow {
    start: f64,
    end: f64,
    analysis: Result<WindowAnalysis, AudioError>,
}

struct WindowAnalysis {
    energy: EnergyFeatures,
    spectral: SpectralFeatures,
    spectrum: Spectrum,
}

/// Energy/loudness features from time-domain samples.
fn energy_features(samples: &[f64]) -> EnergyFeatures {
    let len = samples.len() as f64;
    let peak = samples.iter().fold(0.0f64, |max, s| max.max(s.abs()));
    let rms = (samples.iter().map(|s| s * s).sum::<f64>() / len).sqrt();

    let rms_db = 20.0 * rms.max(1e-10).log10();
    let peak_db = 20.0 * peak.max(1e-10).log10();
    let value = ((rms_db + 60.0) / 60.0).clamp(0.0, 1.0);

    EnergyFeatures {
        rms: rms_db,
        peak: peak_db,
        mean_volume: rms_db,
        value,
        is_silence: rms_db < -40.0,
    }
}

/// Aggregated audio profile for one shot's time span.
#[derive(Debug, Clone)]
pub struct ShotAudioProfile {
    /// Mean normalized energy.
    pub energy: f64,
    /// Mean spectral centroid in Hz.
    pub centroid: f64,
    /// Mean spectral bandwidth in Hz.
    pub bandwidth: f64,
    /// Mean zero-crossing rate.
    pub zcr: f64,
    /// Mean class probabilities.
    pub classification: Classification,
    /// Mean MFCC vector.
    pub mfccs: [f64; MFCC_COUNT],
    /// Dominant class of the mean classification.
    pub dominant: AudioClass,
    /// Fraction of windows flagged silent.
    pub silence_ratio: f64,
    /// Fraction of windows with a detected speaker change.
    pub speaker_change_ratio: f64,
    /// Number of windows that fell inside the span.
    pub window_count: usize,
}

impl ShotAudioProfile {
    /// Neutral profile for spans with no overlapping windows.
    pub fn neutral() -> Self {
        Self {
            energy: 0.5,
            centroid: 2000.0,
            bandwidth: 1000.0,
            zcr: 0.05,
            classification: Classification::neutral(),
            mfccs: [0.0; MFCC_COUNT],
            dominant: AudioClass::Silence,
            silence_ratio: 0.0,
            speaker_change_ratio: 0.0,
            window_count: 0,
        }
    }
}

/// Aggregate the windows fully contained in `[start, end]` into one profile.
pub fn aggregate_span(windows: &[AudioWindow], start: f64, end: f64) -> ShotAudioProfile {
    let contained: Vec<&AudioWindow> = windows
        .iter()
        .filter(|w| w.start >= start && w.end <= end)
        .collect();

    if contained.is_empty() {
        return ShotAudioProfile::neutral();
    }

    let count = contained.len() as f64;
    let mut profile = ShotAudioProfile::neutral();
    profile.window_count = contained.len();
    profile.energy = contained.iter().map(|w| w.energy.value).sum::<f64>() / count;
    profile.centroid = contained.iter().map(|w| w.spectral.centroid).sum::<f64>() / count;
    profile.bandwidth = contained.iter().map(|w| w.spectral.bandwidth).sum::<f64>() / count;
    profile.zcr = contained.iter().map(|w| w.spectral.zcr).sum::<f64>() / count;

    profile.classification = Classification {
        voice: contained.iter().map(|w| w.classification.voice).sum::<f64>() / count,
        music: contained.iter().map(|w| w.classification.music).sum::<f64>() / count,
        silence: contained
            .iter()
            .map(|w| w.classification.silence)
            .sum::<f64>()
            / count,
    };
    profile.dominant = profile.classification.dominant().0;

    for (i, coeff) in profile.mfccs.iter_mut().enumerate() {
        *coeff = contained.iter().map(|w| w.spectral.mfccs[i]).sum::<f64>() / count;
    }

    profile.silence_ratio =
        contained.iter().filter(|w| w.energy.is_silence).count() as f64 / count;
    profile.speaker_change_ratio = contained
        .iter()
        .filter(|w| w.speaker_change.has_change)
        .count() as f64
        / count;

    profile
}
