//! Hand manager: per-player private piece lists.
//!
//! A piece in a hand is out of the shared graph. Its content is only known
//! to the participant holding it: other participants learn that a piece
//! *left* the table (the draw is replicated) and only track how many pieces
//! each remote hand holds. When the piece is played back, the play carries
//! its full content.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::anchors;
use crate::core::{Piece, PieceGraph, PieceId, PlayerId, Rejection};

/// A player's private piece list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub player: PlayerId,
    pub meshes: Vec<Piece>,
}

/// Tracks the hands of every player this participant knows about.
///
/// - Known hands: full content (this participant's own hand, or hands
///   loaded from a saved game).
/// - Hidden counts: pieces drawn by remote players, content unknown.
#[derive(Clone, Debug, Default)]
pub struct HandManager {
    hands: FxHashMap<PlayerId, Vec<Piece>>,
    hidden: FxHashMap<PlayerId, usize>,
}

impl HandManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load known hands and hidden counts (snapshot or saved game),
    /// replacing everything.
    pub fn load(&mut self, hands: Vec<Hand>, hidden: Vec<(PlayerId, usize)>) {
        self.hands.clear();
        self.hidden.clear();
        for hand in hands {
            self.hands.insert(hand.player, hand.meshes);
        }
        self.hidden
            .extend(hidden.into_iter().filter(|(_, count)| *count > 0));
    }

    /// Pieces known to be in `player`'s hand.
    #[must_use]
    pub fn hand(&self, player: &PlayerId) -> &[Piece] {
        self.hands.get(player).map_or(&[], |h| h.as_slice())
    }

    /// Total pieces held by `player`, known or not.
    #[must_use]
    pub fn size(&self, player: &PlayerId) -> usize {
        self.hand(player).len() + self.hidden.get(player).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn get(&self, player: &PlayerId, id: &PieceId) -> Option<&Piece> {
        self.hand(player).iter().find(|p| &p.id == id)
    }

    pub fn get_mut(&mut self, player: &PlayerId, id: &PieceId) -> Option<&mut Piece> {
        self.hands.get_mut(player)?.iter_mut().find(|p| &p.id == id)
    }

    /// Player whose known hand holds `id`.
    #[must_use]
    pub fn owner_of(&self, id: &PieceId) -> Option<&PlayerId> {
        self.hands
            .iter()
            .find(|(_, meshes)| meshes.iter().any(|p| &p.id == id))
            .map(|(player, _)| player)
    }

    /// Whether any known hand holds `id`.
    #[must_use]
    pub fn contains(&self, id: &PieceId) -> bool {
        self.owner_of(id).is_some()
    }

    /// Append a piece to `player`'s hand.
    pub fn add(&mut self, player: &PlayerId, piece: Piece) {
        self.hands.entry(player.clone()).or_default().push(piece);
    }

    /// Remove a piece from `player`'s hand.
    pub fn remove(&mut self, player: &PlayerId, id: &PieceId) -> Option<Piece> {
        let meshes = self.hands.get_mut(player)?;
        let index = meshes.iter().position(|p| &p.id == id)?;
        Some(meshes.remove(index))
    }

    /// Move a piece from the shared graph into `player`'s hand.
    ///
    /// The piece leaves any stack or anchor first. When `reveal` is false
    /// (a remote player drew it), only the hand size is tracked. Drawable
    /// pick settings are applied to the stored content.
    ///
    /// Returns the piece as it was on the table.
    pub fn draw(
        &mut self,
        graph: &mut PieceGraph,
        player: &PlayerId,
        id: &PieceId,
        reveal: bool,
    ) -> Result<Piece, Rejection> {
        let piece = graph.get(id).ok_or_else(|| Rejection::UnknownPiece(id.clone()))?;
        let Some(drawable) = piece.drawable else {
            return Err(Rejection::MissingCapability {
                piece: id.clone(),
                capability: "drawable",
            });
        };

        anchors::unsnap(graph, id);
        let on_table = graph
            .remove(id)
            .ok_or_else(|| Rejection::UnknownPiece(id.clone()))?;

        if reveal {
            let mut held = on_table.clone();
            if let (true, Some(flippable)) = (drawable.unflip_on_pick, held.flippable.as_mut()) {
                flippable.is_flipped = false;
            }
            if let (Some(angle), Some(rotable)) = (drawable.angle_on_pick, held.rotable.as_mut()) {
                rotable.angle = angle;
            }
            if let Some(stackable) = held.stackable.as_mut() {
                stackable.stack_ids.clear();
            }
            self.add(player, held);
        } else {
            *self.hidden.entry(player.clone()).or_default() += 1;
        }
        tracing::debug!(%player, piece = %id, reveal, "piece drawn into hand");
        Ok(on_table)
    }

    /// Move `piece` from `player`'s hand back onto the shared graph.
    ///
    /// The content is taken as given (it comes from the play operation);
    /// the hand entry, known or hidden, is released.
    pub fn play(
        &mut self,
        graph: &mut PieceGraph,
        player: &PlayerId,
        piece: Piece,
    ) -> Result<(), Rejection> {
        if graph.contains(&piece.id) {
            return Err(Rejection::DuplicateId(piece.id));
        }
        if self.remove(player, &piece.id).is_none() {
            match self.hidden.get_mut(player) {
                Some(count) if *count > 0 => *count -= 1,
                _ => {
                    return Err(Rejection::NotInHand {
                        piece: piece.id,
                        player: player.clone(),
                    })
                }
            }
        }
        tracing::debug!(%player, piece = %piece.id, "piece played from hand");
        graph.insert(piece);
        Ok(())
    }

    /// Every known hand, ordered by player id.
    #[must_use]
    pub fn hands(&self) -> Vec<Hand> {
        let mut hands: Vec<Hand> = self
            .hands
            .iter()
            .map(|(player, meshes)| Hand {
                player: player.clone(),
                meshes: meshes.clone(),
            })
            .collect();
        hands.sort_by(|a, b| a.player.cmp(&b.player));
        hands
    }

    /// Pieces held by remote players, content unknown, ordered by player id.
    #[must_use]
    pub fn hidden_counts(&self) -> Vec<(PlayerId, usize)> {
        sorted(
            self.hidden
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(player, count)| (player.clone(), *count)),
        )
    }

    /// Total size of every non-empty hand, ordered by player id.
    #[must_use]
    pub fn sizes(&self) -> Vec<(PlayerId, usize)> {
        let players: FxHashSet<&PlayerId> =
            self.hands.keys().chain(self.hidden.keys()).collect();
        sorted(
            players
                .into_iter()
                .map(|player| (player.clone(), self.size(player)))
                .filter(|(_, size)| *size > 0),
        )
    }

    /// `player`'s known hand, if any.
    #[must_use]
    pub fn hand_of(&self, player: &PlayerId) -> Option<Hand> {
        self.hands.get(player).map(|meshes| Hand {
            player: player.clone(),
            meshes: meshes.clone(),
        })
    }
}

fn sorted(counts: impl Iterator<Item = (PlayerId, usize)>) -> Vec<(PlayerId, usize)> {
    let mut counts: Vec<_> = counts.collect();
    counts.sort();
    counts
}
