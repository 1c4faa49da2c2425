//! Visual shot boundary detection over sampled RGB frames.
//!
//! Each frame gets three descriptors: a per-channel color histogram, a
//! center/edge composition ratio, and a gradient-based edge-orientation
//! estimate. Consecutive-frame dissimilarity blends the three cues
//! (0.4/0.3/0.3) and a boundary fires where it exceeds the sensitivity.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use cliprank_models::{VisualBoundary, VisualCues};

use crate::error::{SceneError, SceneResult};

/// Histogram bins per color channel.
const HISTOGRAM_BINS: usize = 32;

/// Cue weights: color, composition, camera.
const COLOR_WEIGHT: f64 = 0.4;
const COMPOSITION_WEIGHT: f64 = 0.3;
const CAMERA_WEIGHT: f64 = 0.3;

/// Decoded RGB frames sampled at a fixed rate.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    /// Raw RGB24 pixel data, one buffer per frame.
    pub frames: Vec<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Sampling rate the frames were taken at.
    pub fps: f64,
}

impl FrameSequence {
    /// Create a sequence, sanity-checking nothing; buffers shorter than
    /// `width * height * 3` degrade to neutral descriptors during analysis.
    pub fn new(frames: Vec<Vec<u8>>, width: u32, height: u32, fps: f64) -> Self {
        Self {
            frames,
            width,
            height,
            fps,
        }
    }
}

/// Per-frame analysis summary used for boundary decisions.
#[derive(Debug, Clone)]
struct FrameDescriptor {
    /// Normalized per-channel histograms.
    histogram: [[f64; HISTOGRAM_BINS]; 3],
    /// Center-to-edge brightness ratio.
    composition_ratio: f64,
    /// Edge-orientation angle in degrees.
    edge_angle: f64,
    /// Set when the frame buffer was unusable.
    degraded: bool,
}

impl FrameDescriptor {
    fn neutral() -> Self {
        Self {
            histogram: [[1.0 / HISTOGRAM_BINS as f64; HISTOGRAM_BINS]; 3],
            composition_ratio: 1.0,
            edge_angle: 45.0,
            degraded: true,
        }
    }
}

/// Detection statistics for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualStats {
    pub frames_analyzed: usize,
    pub frames_degraded: usize,
    pub boundaries: usize,
    pub mean_dissimilarity: f64,
}

/// Result of one visual detection run.
#[derive(Debug, Clone, Default)]
pub struct VisualAnalysis {
    pub boundaries: Vec<VisualBoundary>,
    pub statistics: VisualStats,
}

/// Visual shot boundary detector.
pub struct VisualBoundaryDetector {
    /// Dissimilarity above this marks a boundary.
    sensitivity: f64,
    /// Minimum frames between accepted boundaries.
    min_gap_frames: usize,
}

impl Default for VisualBoundaryDetector {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl VisualBoundaryDetector {
    /// Create a detector with the given sensitivity.
    pub fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            min_gap_frames: 2,
        }
    }

    /// Builder-style setter for the boundary gap in frames.
    pub fn with_min_gap_frames(mut self, frames: usize) -> Self {
        self.min_gap_frames = frames.max(1);
        self
    }

    /// Detect shot boundaries over a frame sequence.
    ///
    /// Returns [`SceneError::NoVisualSignal`] when the sequence is empty;
    /// individual bad frames degrade to neutral descriptors instead.
    pub fn detect(&self, frames: &FrameSequence, duration: f64) -> SceneResult<VisualAnalysis> {
        if frames.frames.is_empty() {
            return Err(SceneError::NoVisualSignal);
        }

        let descriptors: Vec<FrameDescriptor> = frames
            .frames
            .par_iter()
            .enumerate()
            .map(|(index, rgb)| {
                analyze_frame(rgb, frames.width, frames.height).unwrap_or_else(|| {
                    warn!(
                        frame = index,
                        "Frame analysis failed, substituting neutral descriptor"
                    );
                    FrameDescriptor::neutral()
                })
            })
            .collect();

        let mut boundaries = Vec::new();
        let mut dissimilarities = Vec::new();
        let mut last_boundary_frame: Option<usize> = None;

        for i in 1..descriptors.len() {
            let (dissimilarity, cues) = compare_frames(&descriptors[i - 1], &descriptors[i]);
            dissimilarities.push(dissimilarity);

            if dissimilarity <= self.sensitivity {
                continue;
            }
            if let Some(last) = last_boundary_frame {
                if i - last < self.min_gap_frames {
                    continue;
                }
            }
            let timestamp = i as f64 / frames.fps;
            if timestamp >= duration {
                break;
            }
            boundaries.push(VisualBoundary {
                timestamp,
                confidence: dissimilarity.min(1.0),
                cues,
            });
            last_boundary_frame = Some(i);
        }

        let statistics = VisualStats {
            frames_analyzed: descriptors.len(),
            frames_degraded: descriptors.iter().filter(|d| d.degraded).count(),
            boundaries: boundaries.len(),
            mean_dissimilarity: if dissimilarities.is_empty() {
                0.0
            } else {
                dissimilarities.iter().sum::<f64>() / dissimilarities.len() as f64
            },
        };

        debug!(
            frames = statistics.frames_analyzed,
            boundaries = statistics.boundaries,
            degraded = statistics.frames_degraded,
            "Visual boundary detection completed"
        );

        Ok(VisualAnalysis {
            boundaries,
            statistics,
        })
    }
}

/// Analyze one RGB frame; `None` when the buffer is too short.
fn analyze_frame(rgb: &[u8], width: u32, height: u32) -> Option<FrameDescriptor> {
    let pixel_count = (width as usize) * (height as usize);
    if pixel_count == 0 || rgb.len() < pixel_count * 3 {
        return None;
    }

    let mut histogram = [[0.0; HISTOGRAM_BINS]; 3];
    for pixel in 0..pixel_count {
        for channel in 0..3 {
            let bin = (rgb[pixel * 3 + channel] as usize * HISTOGRAM_BINS) / 256;
            histogram[channel][bin] += 1.0;
        }
    }
    for channel in histogram.iter_mut() {
        for bin in channel.iter_mut() {
            *bin /= pixel_count as f64;
        }
    }

    Some(FrameDescriptor {
        histogram,
        composition_ratio: composition_ratio(rgb, width, height),
        edge_angle: edge_angle(rgb, width, height),
        degraded: false,
    })
}

/// Center-region brightness relative to edge-region brightness.
fn composition_ratio(rgb: &[u8], width: u32, height: u32) -> f64 {
    let width = width as usize;
    let height = height as usize;
    let center_x = width / 2;
    let center_y = height / 2;
    let region = width.min(height) / 4;

    let mut center_sum = 0.0;
    let mut center_count = 0usize;
    let mut edge_sum = 0.0;
    let mut edge_count = 0usize;

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) * 3;
            let brightness =
                (rgb[idx] as f64 + rgb[idx + 1] as f64 + rgb[idx + 2] as f64) / 3.0;
            let is_center =
                x.abs_diff(center_x) < region && y.abs_diff(center_y) < region;
            if is_center {
                center_sum += brightness;
                center_count += 1;
            } else {
                edge_sum += brightness;
                edge_count += 1;
            }
        }
    }

    if center_count == 0 || edge_count == 0 || edge_sum <= 0.0 {
        return 1.0;
    }
    (center_sum / center_count as f64) / (edge_sum / edge_count as f64).max(1e-6)
}

/// Dominant edge orientation estimated from horizontal/vertical gradients.
fn edge_angle(rgb: &[u8], width: u32, height: u32) -> f64 {
    let width = width as usize;
    let height = height as usize;
    if width < 3 || height < 3 {
        return 45.0;
    }

    let mut horizontal = 0.0;
    let mut vertical = 0.0;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let above = rgb[((y - 1) * width + x) * 3] as f64;
            let below = rgb[((y + 1) * width + x) * 3] as f64;
            horizontal += (above - below).abs();

            let left = rgb[(y * width + x - 1) * 3] as f64;
            let right = rgb[(y * width + x + 1) * 3] as f64;
            vertical += (left - right).abs();
        }
    }

    vertical.atan2(horizontal).to_degrees()
}

/// Blend per-cue differences into one dissimilarity score.
fn compare_frames(a: &FrameDescriptor, b: &FrameDescriptor) -> (f64, VisualCues) {
    let color = histogram_distance(&a.histogram, &b.histogram);
    let composition = (a.composition_ratio - b.composition_ratio).abs().min(1.0);
    let camera = ((a.edge_angle - b.edge_angle).abs() / 180.0).min(1.0);

    let total = color * COLOR_WEIGHT + composition * COMPOSITION_WEIGHT + camera * CAMERA_WEIGHT;
    (
        total,
        VisualCues {
            color,
            composition,
            camera,
        },
    )
}

/// Chi-squared distance over the flattened per-channel histograms, halved
/// and capped into `[0, 1]`.
fn histogram_distance(
    a: &[[f64; HISTOGRAM_BINS]; 3],
    b: &[[f64; HISTOGRAM_BINS]; 3],
) -> f64 {
    const EPSILON: f64 = 1e-10;
    let mut total = 0.0;
    for channel in 0..3 {
        for bin in 0..HISTOGRAM_BINS {
            let diff = a[channel][bin] - b[channel][bin];
            let sum = a[channel][bin] + b[channel][bin] + EPSILON;
            total += (diff * diff) / sum;
        }
    }
    (total / 2.0).min(1.0)
}
