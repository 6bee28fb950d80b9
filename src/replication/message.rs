//! Peer-to-peer messages.

use serde::{Deserialize, Serialize};

use crate::core::{Change, EngineState, HistoryRecord, Invocation, Operation, PieceId, PlayerId};

/// One applied change, as sent to peers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Author of the change.
    pub player: PlayerId,

    /// The author's sequence number for this change.
    pub seq: u64,
    pub piece: PieceId,
    pub from_hand: bool,
    pub payload: Change,

    /// Animation length hint, in milliseconds. Cosmetic only.
    #[serde(default)]
    pub duration: Option<u32>,
}

impl ActionMessage {
    #[must_use]
    pub fn from_record(record: &HistoryRecord, duration: Option<u32>) -> Self {
        Self {
            player: record.player.clone(),
            seq: record.seq,
            piece: record.piece.clone(),
            from_hand: record.from_hand,
            payload: record.change.clone(),
            duration,
        }
    }

    /// The invocation to apply on the receiving side.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            piece: self.piece.clone(),
            from_hand: self.from_hand,
            change: self.payload.clone(),
        }
    }
}

/// Everything that travels over a data channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PeerMessage {
    Action(ActionMessage),
    SnapshotRequest,
    Snapshot(EngineState),
}

/// Whether a record may leave this participant.
///
/// Changes to pieces inside a hand stay private, except playing the piece
/// back onto the table.
#[must_use]
pub fn is_shared(record: &HistoryRecord) -> bool {
    !record.from_hand || matches!(record.change, Change::Call(Operation::Play { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Piece, Shape};

    fn record(from_hand: bool, change: Change) -> HistoryRecord {
        HistoryRecord {
            time: 0,
            player: PlayerId::new("alice"),
            seq: 1,
            piece: "c1".into(),
            from_hand,
            change,
            revert: Default::default(),
        }
    }

    #[test]
    fn test_private_hand_changes_stay_local() {
        assert!(is_shared(&record(false, Change::Call(Operation::Flip))));
        assert!(!is_shared(&record(true, Change::Call(Operation::Flip))));

        let played = Piece::new("c1", Shape::new("card", 1.0, 0.1, 1.0));
        assert!(is_shared(&record(
            true,
            Change::Call(Operation::Play {
                piece: Box::new(played)
            })
        )));
    }

    #[test]
    fn test_message_carries_invocation() {
        let record = record(false, Change::Call(Operation::Random { face: 3 }));
        let message = ActionMessage::from_record(&record, Some(200));

        assert_eq!(message.invocation(), record.invocation());
        assert_eq!(message.player, record.player);
        assert_eq!(message.seq, record.seq);
    }
}
