//! Table state: shared graph, private hands and history.
//!
//! ## Table
//!
//! Live state of one participant:
//! - The shared piece graph
//! - Hands (own content, hidden counts for remote players)
//! - History, in receipt order
//!
//! ## EngineState
//!
//! Plain structural snapshot exchanged on join and on save:
//! `{ meshes, hand_meshes, hand_counts, history }`.
//!
//! `hand_counts` covers hands whose content is not in `hand_meshes`, so a
//! participant loading the snapshot still knows who holds what amount.

use im::Vector;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::action::HistoryRecord;
use super::entity::PieceId;
use super::graph::PieceGraph;
use super::piece::Piece;
use super::player::PlayerId;
use crate::hands::{Hand, HandManager};

/// Serializable snapshot of a table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub meshes: Vec<Piece>,

    #[serde(default)]
    pub hand_meshes: Vec<Hand>,

    /// Size of every hand not listed in `hand_meshes`.
    #[serde(default)]
    pub hand_counts: Vec<(PlayerId, usize)>,

    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

impl EngineState {
    /// Highest sequence number recorded for each author.
    #[must_use]
    pub fn high_water_marks(&self) -> FxHashMap<PlayerId, u64> {
        let mut marks = FxHashMap::default();
        for record in &self.history {
            raise_mark(&mut marks, record);
        }
        marks
    }
}

/// Live state of a participant.
///
/// History uses an `im` vector so snapshots and replays clone it cheaply.
/// Append through `record` so the per-author marks and the set of ids
/// named in history stay in sync.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub pieces: PieceGraph,
    pub hands: HandManager,
    pub history: Vector<HistoryRecord>,
    marks: FxHashMap<PlayerId, u64>,
    referenced: FxHashSet<PieceId>,
}

impl Table {
    /// Table holding `pieces`, empty hands and no history.
    #[must_use]
    pub fn new(pieces: Vec<Piece>) -> Self {
        Self {
            pieces: PieceGraph::from_pieces(pieces),
            ..Self::default()
        }
    }

    /// Rebuild a table from a snapshot, replacing everything.
    #[must_use]
    pub fn from_snapshot(state: EngineState) -> Self {
        let mut table = Self::new(state.meshes);
        table.hands.load(state.hand_meshes, state.hand_counts);
        for record in state.history {
            table.record(record);
        }
        table
    }

    /// Replace this table's content with a snapshot.
    pub fn load(&mut self, state: EngineState) {
        *self = Self::from_snapshot(state);
    }

    /// Full snapshot, every known hand included (save games).
    #[must_use]
    pub fn snapshot(&self) -> EngineState {
        EngineState {
            meshes: self.pieces.pieces().to_vec(),
            hand_meshes: self.hands.hands(),
            hand_counts: self.hands.hidden_counts(),
            history: self.history.iter().cloned().collect(),
        }
    }

    /// Snapshot sent to `player`: their own hand with content, every other
    /// hand as a count.
    #[must_use]
    pub fn snapshot_for(&self, player: &PlayerId) -> EngineState {
        EngineState {
            meshes: self.pieces.pieces().to_vec(),
            hand_meshes: self.hands.hand_of(player).into_iter().collect(),
            hand_counts: self
                .hands
                .sizes()
                .into_iter()
                .filter(|(holder, _)| holder != player)
                .collect(),
            history: self.history.iter().cloned().collect(),
        }
    }

    /// Append a record.
    pub fn record(&mut self, record: HistoryRecord) {
        raise_mark(&mut self.marks, &record);
        self.referenced.extend(record.referenced().cloned());
        self.history.push_back(record);
    }

    /// Sequence number for `player`'s next change.
    #[must_use]
    pub fn next_seq(&self, player: &PlayerId) -> u64 {
        self.marks.get(player).copied().unwrap_or(0) + 1
    }

    /// Whether any record in history names `id`.
    #[must_use]
    pub fn is_referenced(&self, id: &PieceId) -> bool {
        self.referenced.contains(id)
    }

    /// Most recent record authored by `player`.
    #[must_use]
    pub fn last_record_of(&self, player: &PlayerId) -> Option<&HistoryRecord> {
        self.history.iter().rev().find(|r| &r.player == player)
    }
}

fn raise_mark(marks: &mut FxHashMap<PlayerId, u64>, record: &HistoryRecord) {
    let mark = marks.entry(record.player.clone()).or_default();
    *mark = (*mark).max(record.seq);
}
