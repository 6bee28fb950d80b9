//! Declarative game setup: pieces, bags and slots.
//!
//! A game descriptor builds a `GameSetup`. Bags and slots are ephemeral:
//! the setup resolver consumes them in one pass and only the resulting piece
//! list survives.

use serde::{Deserialize, Serialize};

use crate::anchors::AnchorPath;
use crate::core::{Piece, PiecePatch, PieceId, SetupError};

/// A named, ordered pool of piece ids available for random draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bag {
    pub id: String,
    pub piece_ids: Vec<PieceId>,
}

impl Bag {
    pub fn new(id: impl Into<String>, piece_ids: Vec<PieceId>) -> Self {
        Self {
            id: id.into(),
            piece_ids,
        }
    }
}

/// A placement rule drawing pieces from a bag.
///
/// - `count` absent: exhaust what remains in the bag.
/// - `anchor` present: snap the first drawn piece there, stack the rest on it.
/// - `anchor` absent: stack the drawn pieces together where `overrides` says.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub bag_id: String,

    #[serde(default)]
    pub anchor: Option<AnchorPath>,

    #[serde(default)]
    pub count: Option<usize>,

    /// Applied to the first drawn piece.
    #[serde(default)]
    pub overrides: PiecePatch,
}

impl Slot {
    /// Slot exhausting `bag_id`.
    pub fn new(bag_id: impl Into<String>) -> Self {
        Self {
            bag_id: bag_id.into(),
            anchor: None,
            count: None,
            overrides: PiecePatch::default(),
        }
    }

    #[must_use]
    pub fn on_anchor(mut self, anchor: AnchorPath) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: PiecePatch) -> Self {
        self.overrides = overrides;
        self
    }

    /// Whether this slot exhausts its bag wherever it is.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.count.is_none() && self.anchor.is_none()
    }
}

/// Everything a descriptor's `build` returns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSetup {
    pub meshes: Vec<Piece>,

    #[serde(default)]
    pub bags: Vec<Bag>,

    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl GameSetup {
    /// Check slot declarations.
    ///
    /// Per bag, at most one catch-all slot may exist and it must be the last
    /// slot referencing that bag.
    pub fn validate(&self) -> Result<(), SetupError> {
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_catch_all() {
                continue;
            }
            let later = self.slots[index + 1..]
                .iter()
                .filter(|s| s.bag_id == slot.bag_id);
            let mut later_catch_all = false;
            let mut later_any = false;
            for s in later {
                later_any = true;
                later_catch_all |= s.is_catch_all();
            }
            if later_catch_all {
                return Err(SetupError::MultipleCatchAll {
                    bag: slot.bag_id.clone(),
                });
            }
            if later_any {
                return Err(SetupError::CatchAllNotLast {
                    bag: slot.bag_id.clone(),
                });
            }
        }
        Ok(())
    }
}
