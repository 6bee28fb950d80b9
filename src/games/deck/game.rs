//! Deck game implementation.

use serde_json::{json, Value};

use crate::anchors::AnchorPath;
use crate::core::{
    Anchor, Drawable, HistoryRecord, Piece, PiecePatch, PieceId, Player, PlayerPreference, Shape,
    Table, Vec3,
};
use crate::rules::{GameDescriptor, Scores};
use crate::setup::{Bag, GameSetup, Slot};

/// Board piece id.
pub const BOARD: &str = "board";

/// Anchor receiving one card at setup.
pub const RESERVE: &str = "reserve";

/// Anchor where played cards pile up.
pub const DISCARD: &str = "discard";

/// Score anchor of `player`.
#[must_use]
pub fn score_anchor(player: &Player) -> String {
    format!("score-{}", player.id.as_str())
}

/// Chip stick of `player`.
#[must_use]
pub fn chips_id(player: &Player) -> PieceId {
    PieceId::new(format!("chips-{}", player.id.as_str()))
}

/// Die of `player`.
#[must_use]
pub fn die_id(player: &Player) -> PieceId {
    PieceId::new(format!("die-{}", player.id.as_str()))
}

/// A deck of cards, a chip stick and a die per player.
///
/// Scores are the chips snapped on each player's score anchor.
#[derive(Clone, Debug)]
pub struct DeckGame {
    card_count: usize,
    starting_chips: u32,
}

/// Builder for creating a DeckGame.
pub struct DeckGameBuilder {
    card_count: usize,
    starting_chips: u32,
}

impl Default for DeckGameBuilder {
    fn default() -> Self {
        Self {
            card_count: 52,
            starting_chips: 10,
        }
    }
}

impl DeckGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card_count(mut self, count: usize) -> Self {
        self.card_count = count.max(1);
        self
    }

    pub fn starting_chips(mut self, chips: u32) -> Self {
        self.starting_chips = chips.max(1);
        self
    }

    pub fn build(self) -> DeckGame {
        DeckGame {
            card_count: self.card_count,
            starting_chips: self.starting_chips,
        }
    }
}

impl Default for DeckGame {
    fn default() -> Self {
        DeckGameBuilder::default().build()
    }
}

impl DeckGame {
    pub fn builder() -> DeckGameBuilder {
        DeckGameBuilder::new()
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.card_count
    }

    fn card(&self, n: usize) -> Piece {
        Piece::new(
            PieceId::new(format!("c{n}")),
            Shape::new("card", 6.3, 0.01, 8.8).with_texture(format!("cards/{n}.png")),
        )
        .movable(Some("card"))
        .stackable()
        .flippable(true)
        .rotable(0.0)
        .drawable(Drawable {
            unflip_on_pick: true,
            flip_on_play: false,
            angle_on_pick: Some(0.0),
        })
    }

    fn board(&self) -> Piece {
        Piece::new(BOARD, Shape::new("board", 80.0, 0.5, 50.0)).with_anchors(vec![
            Anchor::new(RESERVE, Vec3::new(-12.0, 0.0, 0.0)).with_kinds(&["card"]),
            Anchor::new(DISCARD, Vec3::new(12.0, 0.0, 0.0))
                .with_kinds(&["card"])
                .with_max(self.card_count),
        ])
    }
}

impl GameDescriptor for DeckGame {
    fn name(&self) -> &str {
        "deck"
    }

    fn build(&self) -> GameSetup {
        let mut meshes = vec![self.board()];
        meshes.extend((1..=self.card_count).map(|n| self.card(n)));

        let ids = (1..=self.card_count)
            .map(|n| PieceId::new(format!("c{n}")))
            .collect();
        GameSetup {
            meshes,
            bags: vec![Bag::new("cards", ids)],
            slots: vec![
                Slot::new("cards")
                    .on_anchor(AnchorPath::single(RESERVE))
                    .count(1),
                Slot::new("cards").with_overrides(PiecePatch::at(Vec3::new(0.0, 0.5, 0.0))),
            ],
        }
    }

    fn add_player(&self, mut setup: GameSetup, player: &Player, parameters: &Value) -> GameSetup {
        let chips = chips_id(player);
        if setup.meshes.iter().any(|p| p.id == chips) {
            return setup;
        }
        let starting = parameters
            .get("chips")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .filter(|c| *c > 0)
            .unwrap_or(self.starting_chips);

        let Some(board) = setup.meshes.iter_mut().find(|p| p.id.as_str() == BOARD) else {
            tracing::warn!(player = %player.id, "no board to seat player at");
            return setup;
        };
        let seat = board
            .anchors()
            .iter()
            .filter(|a| a.id.as_str().starts_with("score-"))
            .count();
        let seat_x = -30.0 + 12.0 * seat as f32;
        if let Some(anchorable) = board.anchorable.as_mut() {
            anchorable.anchors.push(
                Anchor::new(score_anchor(player), Vec3::new(seat_x, 0.0, 18.0))
                    .with_kinds(&["chips"])
                    .with_max(4),
            );
        }

        let mut stick = Piece::new(chips, Shape::new("chips", 2.0, 0.3, 2.0))
            .at(Vec3::new(seat_x, 0.0, 24.0))
            .movable(Some("chips"))
            .quantifiable(starting)
            .lockable(false);
        if let Some(quantifiable) = stick.quantifiable.as_mut() {
            quantifiable.kinds = vec!["chips".to_string()];
        }
        let die = Piece::new(die_id(player), Shape::new("die", 1.0, 1.0, 1.0))
            .at(Vec3::new(seat_x + 4.0, 0.0, 24.0))
            .movable(Some("die"))
            .rotable(0.0)
            .randomizable(6, false);

        setup.meshes.push(stick);
        setup.meshes.push(die);
        setup
    }

    fn ask_for_parameters(&self, setup: &GameSetup, player: &Player) -> Option<Value> {
        let seated = setup.meshes.iter().any(|p| p.id == chips_id(player));
        (!seated).then(|| {
            json!({
                "type": "object",
                "properties": {
                    "chips": {
                        "type": "integer",
                        "minimum": 1,
                        "default": self.starting_chips,
                    }
                }
            })
        })
    }

    fn compute_score(
        &self,
        last: &HistoryRecord,
        table: &Table,
        players: &[Player],
        _preferences: &[PlayerPreference],
    ) -> Option<Scores> {
        let relevant = matches!(
            last.change.name(),
            "move" | "snap" | "unsnap" | "unsnapAll" | "increment" | "decrement" | "draw"
                | "play"
        );
        if !relevant {
            return None;
        }

        let board = table.pieces.get(&PieceId::new(BOARD))?;
        let mut scores = Scores::new();
        for player in players {
            let total: u32 = board
                .anchor(&score_anchor(player).into())
                .map(|anchor| {
                    anchor
                        .snapped_ids
                        .iter()
                        .filter_map(|id| table.pieces.get(id))
                        .filter_map(Piece::quantity)
                        .sum()
                })
                .unwrap_or(0);
            scores.set(player.id.clone(), i64::from(total));
        }
        Some(scores)
    }
}
