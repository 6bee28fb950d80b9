//! Error types.
//!
//! - `Rejection`: an operation whose precondition does not hold. Expected
//!   during concurrent play; reported to the caller, never replicated.
//! - `SetupError`: a game description the setup resolver refuses.
//! - `ReplicationError`: wire or peer bookkeeping failures.

use super::entity::{AnchorId, PieceId};
use super::player::PlayerId;

/// Why an operation was not applied.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),

    #[error("piece {piece} is not {capability}")]
    MissingCapability {
        piece: PieceId,
        capability: &'static str,
    },

    #[error("piece {0} is locked")]
    Locked(PieceId),

    #[error("piece {piece} has no anchor {anchor}")]
    UnknownAnchor { piece: PieceId, anchor: AnchorId },

    #[error("anchor {anchor} on {piece} is full")]
    AnchorFull { piece: PieceId, anchor: AnchorId },

    #[error("{mover} does not match the kinds accepted by {target}")]
    KindMismatch { mover: PieceId, target: PieceId },

    #[error("piece {0} is not snapped anywhere")]
    NotSnapped(PieceId),

    #[error("piece {0} cannot target itself")]
    SelfTarget(PieceId),

    #[error("stack of {piece} holds {available} pieces, {requested} requested")]
    StackTooSmall {
        piece: PieceId,
        requested: usize,
        available: usize,
    },

    #[error("piece {piece} is already stacked on {base}")]
    AlreadyStacked { piece: PieceId, base: PieceId },

    #[error("reorder of {0} does not list the same pieces")]
    ReorderMismatch(PieceId),

    #[error("piece {piece} holds {available}, cannot split {requested}")]
    QuantityTooLow {
        piece: PieceId,
        requested: u32,
        available: u32,
    },

    #[error("face {face} out of range for {piece}")]
    FaceOutOfRange { piece: PieceId, face: u32 },

    #[error("faces of {0} cannot be set")]
    FaceNotSettable(PieceId),

    #[error("piece id {0} is already taken")]
    DuplicateId(PieceId),

    #[error("piece {piece} is not in {player}'s hand")]
    NotInHand { piece: PieceId, player: PlayerId },

    #[error("operation {op} cannot run on a piece in hand")]
    NotAllowedInHand { op: &'static str },
}

/// Invalid game descriptions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("bag {bag} has more than one catch-all slot")]
    MultipleCatchAll { bag: String },

    #[error("catch-all slot for bag {bag} must be the last slot using it")]
    CatchAllNotLast { bag: String },

    #[error("no free color left in a palette of {palette_size}")]
    PaletteExhausted { palette_size: usize },
}

/// Replication failures.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode message from {from}: {source}")]
    Decode {
        from: PlayerId,
        #[source]
        source: bincode::Error,
    },

    #[error("no connection with {0}")]
    UnknownPeer(PlayerId),
}
