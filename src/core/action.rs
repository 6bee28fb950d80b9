//! Action representation: gestures, operations and history records.
//!
//! Actions come in two layers:
//! - A `Gesture` is what the input layer asks for ("rotate this", "roll that").
//!   It may depend on current state.
//! - An `Operation` is the resolved form with fully explicit arguments
//!   (absolute angle, rolled face, spawned id, played piece content). Only
//!   operations are recorded and replicated, so applying the same operation
//!   on the same prior state always yields the same result.
//!
//! ## Example
//!
//! ```
//! use rust_tabletop::core::{Change, Operation, Vec3};
//!
//! let roll = Change::Call(Operation::Random { face: 4 });
//! assert_eq!(roll.name(), "random");
//!
//! let drag = Change::Move { pos: Vec3::new(2.0, 0.0, 1.0), prev: Vec3::default() };
//! assert_eq!(drag.name(), "move");
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::{AnchorId, PieceId};
use super::piece::{Piece, Vec3};
use super::player::PlayerId;

/// A request from the input layer, before resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Gesture {
    /// Drop the piece at `pos` (stack and snapped pieces follow).
    Move { pos: Vec3 },
    Flip,
    /// Rotate by the configured step.
    Rotate,
    /// Snap `mover` into `anchor` of the target piece.
    Snap { mover: PieceId, anchor: AnchorId },
    /// Release `snapped` from the target's anchors.
    Unsnap { snapped: PieceId },
    UnsnapAll,
    /// Put `pushed` (and its own stack) on top of the target's stack.
    Push { pushed: PieceId },
    /// Take `count` pieces off the top of the target's stack.
    Pop { count: usize },
    Reorder { ids: Vec<PieceId> },
    /// Merge `donor` into the target.
    Increment { donor: PieceId },
    /// Split `amount` off the target into a new piece.
    Decrement { amount: u32 },
    ToggleLock,
    Random,
    SetFace { face: u32 },
    Draw,
    Play { pos: Vec3 },
}

/// A resolved, replayable mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Flip,
    Rotate { angle: f32 },
    Snap { snapped: PieceId, anchor: AnchorId },
    Unsnap { snapped: PieceId },
    UnsnapAll,
    Push { pushed: PieceId },
    Pop { count: usize },
    Reorder { ids: Vec<PieceId> },
    Increment { donor: PieceId },
    Decrement { amount: u32, spawned: PieceId },
    ToggleLock,
    Random { face: u32 },
    SetFace { face: u32 },
    Draw,
    /// Full content of the played piece, position included.
    Play { piece: Box<Piece> },
}

impl Operation {
    /// Operation name, as used in logs and by score computation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Flip => "flip",
            Operation::Rotate { .. } => "rotate",
            Operation::Snap { .. } => "snap",
            Operation::Unsnap { .. } => "unsnap",
            Operation::UnsnapAll => "unsnapAll",
            Operation::Push { .. } => "push",
            Operation::Pop { .. } => "pop",
            Operation::Reorder { .. } => "reorder",
            Operation::Increment { .. } => "increment",
            Operation::Decrement { .. } => "decrement",
            Operation::ToggleLock => "toggleLock",
            Operation::Random { .. } => "random",
            Operation::SetFace { .. } => "setFace",
            Operation::Draw => "draw",
            Operation::Play { .. } => "play",
        }
    }
}

/// What happened to a piece: a discrete operation or a continuous move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Change {
    Call(Operation),
    Move { pos: Vec3, prev: Vec3 },
}

impl Change {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Change::Call(op) => op.name(),
            Change::Move { .. } => "move",
        }
    }

    #[must_use]
    pub fn operation(&self) -> Option<&Operation> {
        match self {
            Change::Call(op) => Some(op),
            Change::Move { .. } => None,
        }
    }
}

/// A change aimed at a piece, without authorship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub piece: PieceId,
    pub from_hand: bool,
    pub change: Change,
}

impl Invocation {
    #[must_use]
    pub fn call(piece: PieceId, from_hand: bool, op: Operation) -> Self {
        Self {
            piece,
            from_hand,
            change: Change::Call(op),
        }
    }
}

/// Inverse invocations of a record. Most operations invert in one step.
pub type Revert = SmallVec<[Invocation; 1]>;

/// Immutable log entry for one applied mutation.
///
/// Used for:
/// - Undo (via `revert`)
/// - Replay from the initial graph
/// - Score computation and audit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Milliseconds since the Unix epoch, stamped by the applying participant.
    pub time: u64,

    /// Who initiated the change.
    pub player: PlayerId,

    /// Position in the author's own sequence of changes, starting at 1.
    pub seq: u64,

    /// Target piece.
    pub piece: PieceId,

    /// Whether the target was in the player's hand.
    pub from_hand: bool,

    pub change: Change,

    /// Invocations undoing this change, in order.
    #[serde(default)]
    pub revert: Revert,
}

impl HistoryRecord {
    /// Pieces this record names: its target, plus pieces a split created
    /// or a merge consumed.
    pub fn referenced(&self) -> impl Iterator<Item = &PieceId> {
        let extra = match &self.change {
            Change::Call(Operation::Decrement { spawned, .. }) => Some(spawned),
            Change::Call(Operation::Increment { donor }) => Some(donor),
            _ => None,
        };
        std::iter::once(&self.piece).chain(extra)
    }

    /// The invocation this record captured.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            piece: self.piece.clone(),
            from_hand: self.from_hand,
            change: self.change.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Operation::Flip.name(), "flip");
        assert_eq!(
            Operation::Decrement {
                amount: 2,
                spawned: "chips-1".into()
            }
            .name(),
            "decrement"
        );
        assert_eq!(
            Change::Move {
                pos: Vec3::default(),
                prev: Vec3::default()
            }
            .name(),
            "move"
        );
    }

    #[test]
    fn test_record_serialization() {
        let mut revert = Revert::new();
        revert.push(Invocation::call("die".into(), false, Operation::Random { face: 2 }));
        let record = HistoryRecord {
            time: 1_700_000_000_000,
            player: PlayerId::new("alice"),
            seq: 3,
            piece: "die".into(),
            from_hand: false,
            change: Change::Call(Operation::Random { face: 5 }),
            revert,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.invocation().change, record.change);
    }

    #[test]
    fn test_referenced_includes_split_pieces() {
        let record = HistoryRecord {
            time: 0,
            player: PlayerId::new("alice"),
            seq: 1,
            piece: "chips".into(),
            from_hand: false,
            change: Change::Call(Operation::Decrement {
                amount: 2,
                spawned: "chips-1".into(),
            }),
            revert: Revert::new(),
        };
        let ids: Vec<&PieceId> = record.referenced().collect();
        assert_eq!(ids, [&PieceId::from("chips"), &PieceId::from("chips-1")]);
    }
}
