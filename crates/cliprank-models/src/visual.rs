//! Visual boundary and shot models.

use serde::{Deserialize, Serialize};

/// Per-cue change magnitudes contributing to a visual boundary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VisualCues {
    /// Color-histogram change magnitude.
    pub color: f64,
    /// Spatial-composition change magnitude.
    pub composition: f64,
    /// Camera/edge-orientation change magnitude.
    pub camera: f64,
}

/// A detected visual shot transition.
///
/// Timestamps within one detection run are strictly increasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualBoundary {
    /// Transition time in seconds.
    pub timestamp: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    pub cues: VisualCues,
}

/// The atomic visual unit between two consecutive boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shot {
    /// Shot start time in seconds.
    pub start: f64,
    /// Shot end time in seconds.
    pub end: f64,
    /// Confidence of the boundary that opened this shot.
    pub confidence: f64,
    pub cues: VisualCues,
}

impl Shot {
    /// Shot duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Convert a boundary list into contiguous shots covering `[0, duration)`.
    ///
    /// With no boundaries the whole clip is one shot; this keeps the
    /// degenerate single-shot case valid downstream.
    pub fn from_boundaries(boundaries: &[VisualBoundary], duration: f64) -> Vec<Shot> {
        if boundaries.is_empty() {
            return vec![Shot {
                start: 0.0,
                end: duration,
                confidence: 0.5,
                cues: VisualCues::default(),
            }];
        }

        let mut shots = Vec::with_capacity(boundaries.len() + 1);
        let mut start = 0.0;
        for boundary in boundaries {
            if boundary.timestamp > start {
                shots.push(Shot {
                    start,
                    end: boundary.timestamp,
                    confidence: boundary.confidence,
                    cues: boundary.cues,
                });
                start = boundary.timestamp;
            }
        }
        if duration > start {
            shots.push(Shot {
                start,
                end: duration,
                confidence: 0.5,
                cues: VisualCues::default(),
            });
        }
        shots
    }
}
