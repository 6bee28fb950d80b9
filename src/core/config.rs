//! Engine configuration.
//!
//! Games and hosts tune the engine at startup through `EngineConfig`.
//! Everything has a sensible default, so `EngineConfig::default()` is enough
//! for most games.

use serde::{Deserialize, Serialize};

/// Tuning knobs shared by the setup resolver, the action engine and the
/// replication layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Angle added by one rotate gesture, in radians.
    pub rotation_step: f32,

    /// Planar distance a drag must cover before it commits a move.
    pub move_commit_threshold: f32,

    /// Actions buffered while waiting for a join snapshot.
    pub max_buffered_messages: usize,

    /// Pairwise swaps used when shuffling bags. `None` is a full shuffle,
    /// `Some(0)` keeps declaration order.
    pub shuffle_iterations: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rotation_step: std::f32::consts::FRAC_PI_2,
            move_commit_threshold: 0.5,
            max_buffered_messages: 1024,
            shuffle_iterations: None,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rotate gesture step.
    #[must_use]
    pub fn with_rotation_step(mut self, step: f32) -> Self {
        self.rotation_step = step;
        self
    }

    /// Set the drag commit threshold.
    #[must_use]
    pub fn with_move_commit_threshold(mut self, threshold: f32) -> Self {
        self.move_commit_threshold = threshold;
        self
    }

    /// Set the join buffer bound.
    #[must_use]
    pub fn with_max_buffered_messages(mut self, max: usize) -> Self {
        self.max_buffered_messages = max;
        self
    }

    /// Keep bags in declaration order (deterministic setups in tests).
    #[must_use]
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle_iterations = Some(0);
        self
    }
}
