//! The shared piece graph.
//!
//! Pieces are kept in insertion order, which is also their serialization
//! order. Relations between pieces (stacks, anchors) are id lists stored on
//! the pieces themselves; the graph only provides lookup and the bookkeeping
//! that keeps those lists consistent when a piece leaves.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::entity::{AnchorId, PieceId};
use super::piece::{Piece, Vec3};

/// Ordered collection of the pieces on the shared table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceGraph {
    pieces: Vec<Piece>,
}

impl PieceGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph from an ordered piece list.
    #[must_use]
    pub fn from_pieces(pieces: Vec<Piece>) -> Self {
        Self { pieces }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    #[must_use]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.iter()
    }

    #[must_use]
    pub fn into_pieces(self) -> Vec<Piece> {
        self.pieces
    }

    #[must_use]
    pub fn contains(&self, id: &PieceId) -> bool {
        self.pieces.iter().any(|p| &p.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, id: &PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| &p.id == id)
    }

    /// Append a piece. Returns `false` if the id is already taken.
    pub fn insert(&mut self, piece: Piece) -> bool {
        if self.contains(&piece.id) {
            return false;
        }
        self.pieces.push(piece);
        true
    }

    /// Remove a piece and every reference to it (anchors, stacks).
    pub fn remove(&mut self, id: &PieceId) -> Option<Piece> {
        let index = self.pieces.iter().position(|p| &p.id == id)?;
        let piece = self.pieces.remove(index);
        self.detach(id);
        Some(piece)
    }

    /// Drop every reference to `id` held by other pieces.
    pub fn detach(&mut self, id: &PieceId) {
        for piece in &mut self.pieces {
            if let Some(stackable) = piece.stackable.as_mut() {
                stackable.stack_ids.retain(|s| s != id);
            }
            if let Some(anchorable) = piece.anchorable.as_mut() {
                for anchor in &mut anchorable.anchors {
                    anchor.snapped_ids.retain(|s| s != id);
                }
            }
        }
    }

    /// Id of the piece whose stack contains `id`.
    #[must_use]
    pub fn stack_base_of(&self, id: &PieceId) -> Option<&PieceId> {
        self.pieces
            .iter()
            .find(|p| p.stack_ids().contains(id))
            .map(|p| &p.id)
    }

    /// Owner piece and anchor currently holding `id`.
    #[must_use]
    pub fn anchor_holding(&self, id: &PieceId) -> Option<(&PieceId, &AnchorId)> {
        self.pieces.iter().find_map(|p| {
            p.anchors()
                .iter()
                .find(|a| a.snapped_ids.contains(id))
                .map(|a| (&p.id, &a.id))
        })
    }

    /// Move a piece to `position`, carrying snapped and stacked pieces along.
    ///
    /// Returns `false` if the piece is unknown.
    pub fn translate(&mut self, id: &PieceId, position: Vec3) -> bool {
        let Some(origin) = self.get(id).map(|p| p.position) else {
            return false;
        };
        let delta = position - origin;

        let mut visited = FxHashSet::default();
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(piece) = self.get_mut(&current) {
                piece.position = piece.position + delta;
                pending.extend(piece.stack_ids().iter().cloned());
                pending.extend(piece.snapped_ids().cloned());
            }
        }
        true
    }

    /// Set a piece's position without moving anything else.
    pub fn place(&mut self, id: &PieceId, position: Vec3) -> bool {
        match self.get_mut(id) {
            Some(piece) => {
                piece.position = position;
                true
            }
            None => false,
        }
    }

    /// Replace the whole graph.
    pub fn replace(&mut self, pieces: Vec<Piece>) {
        self.pieces = pieces;
    }
}
