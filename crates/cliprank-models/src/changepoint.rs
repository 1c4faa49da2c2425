//! Audio change-point models.
//!
//! Change points are ephemeral: they are consumed during fusion or clustering
//! and never persisted.

use serde::{Deserialize, Serialize};

use crate::audio::AudioClass;

/// How a change point was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePointKind {
    /// Local maximum in the inter-window feature-distance signal.
    DistancePeak,
    /// Transition between dominant audio classes.
    ClassTransition,
}

/// Hierarchy level assigned when tiered classification is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    Major,
    Minor,
}

/// A scored audio change point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePoint {
    /// Index into the window sequence where the change occurs.
    pub index: usize,
    /// Change time in seconds (start of the window at `index`).
    pub time: f64,
    /// Feature distance at the change point.
    pub distance: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
    pub kind: ChangePointKind,
    /// Source class for class transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_class: Option<AudioClass>,
    /// Target class for class transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_class: Option<AudioClass>,
    /// Five-factor validation score, set when validation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<f64>,
    /// Major/minor tier, set when hierarchical classification is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<ChangeLevel>,
}

impl ChangePoint {
    /// True for class-transition points.
    pub fn is_class_transition(&self) -> bool {
        self.kind == ChangePointKind::ClassTransition
    }
}
