//! Drag tracking: gesture-level cancellation of moves.
//!
//! A drag only mutates state once released past the commit threshold.
//! Anything shorter is cancelled: no history record, no network message,
//! the piece is shown back at its origin.

use crate::core::{EngineConfig, Gesture, PieceId, Vec3};

/// What a released drag amounts to.
#[derive(Clone, Debug, PartialEq)]
pub enum DragOutcome {
    /// Below threshold: restore the piece at `restore`.
    Cancelled { restore: Vec3 },
    /// Past threshold: apply this gesture on `piece`.
    Committed { piece: PieceId, gesture: Gesture },
}

/// Follows one drag from pointer down to pointer up.
#[derive(Clone, Debug)]
pub struct DragTracker {
    piece: PieceId,
    origin: Vec3,
    current: Vec3,
    threshold: f32,
}

impl DragTracker {
    /// Start dragging `piece` from `origin`.
    #[must_use]
    pub fn begin(piece: PieceId, origin: Vec3, config: &EngineConfig) -> Self {
        Self {
            piece,
            origin,
            current: origin,
            threshold: config.move_commit_threshold,
        }
    }

    #[must_use]
    pub fn piece(&self) -> &PieceId {
        &self.piece
    }

    /// Where the piece is shown right now.
    #[must_use]
    pub fn current(&self) -> Vec3 {
        self.current
    }

    pub fn update(&mut self, position: Vec3) {
        self.current = position;
    }

    /// Whether releasing now would commit.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.origin.planar_distance(self.current) >= self.threshold
    }

    /// End the drag.
    #[must_use]
    pub fn release(self) -> DragOutcome {
        if self.is_committed() {
            DragOutcome::Committed {
                piece: self.piece,
                gesture: Gesture::Move { pos: self.current },
            }
        } else {
            tracing::trace!(piece = %self.piece, "drag cancelled below threshold");
            DragOutcome::Cancelled {
                restore: self.origin,
            }
        }
    }
}
