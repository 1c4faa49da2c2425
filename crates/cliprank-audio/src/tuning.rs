//! Heuristic auto-tuning of change-point parameters from data statistics.
//!
//! The constants here are empirical defaults carried over from production
//! tuning; they are starting points, not protocol invariants.

use tracing::debug;

use cliprank_models::AudioWindow;

use crate::changepoint::mean_std;

/// Parameters derived from the observed distance signal.
#[derive(Debug, Clone, Copy)]
pub struct TunedParameters {
    /// Peak threshold (`k` for adaptive detection).
    pub threshold: f64,
    /// Minimum time between change points, in seconds.
    pub min_distance: f64,
    /// Whether the signal's variability warrants multi-scale detection.
    pub multi_scale: bool,
    /// Whether the signal is noisy enough to smooth.
    pub smoothing: bool,
    /// Moving-average width in samples.
    pub smoothing_window: usize,
}

/// Auto-tune detection parameters from the raw distance signal.
pub fn auto_tune(distances: &[f64], windows: &[AudioWindow]) -> TunedParameters {
    if distances.is_empty() {
        return TunedParameters {
            threshold: 0.3,
            min_distance: 0.5,
            multi_scale: false,
            smoothing: true,
            smoothing_window: 3,
        };
    }

    let (mean, std) = mean_std(distances);
    let threshold = mean + std;

    let duration = match (windows.first(), windows.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 1.0,
    };
    let min_distance = (duration / 100.0).clamp(0.3, 1.0);

    let variation = if mean > 0.0 { std / mean } else { 0.0 };
    let tuned = TunedParameters {
        threshold,
        min_distance,
        multi_scale: variation > 0.5,
        smoothing: variation > 0.3,
        smoothing_window: ((std * 10.0).ceil() as usize).clamp(3, 7),
    };

    debug!(
        threshold = tuned.threshold,
        min_distance = tuned.min_distance,
        multi_scale = tuned.multi_scale,
        smoothing = tuned.smoothing,
        "Auto-tuned change-point parameters"
    );

    tuned
}
